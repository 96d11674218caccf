//! Name accumulators
//!
//! A node's identity is a one-way fold of random per-segment secrets, one
//! secret per ancestry step. The fold is order-sensitive, so `a/b` and `b/a`
//! accumulate to different states even with the same secrets. Saturating an
//! accumulator yields the [`ForestLabel`] the node's encrypted blocks are
//! filed under; the label reveals nothing about the ancestry, and siblings
//! or prefixes cannot be correlated from labels alone.

use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

const EMPTY_DOMAIN: &str = "thicket/name-accumulator/empty/v1";
const SATURATE_DOMAIN: &str = "thicket/name-accumulator/saturate/v1";

pub const SEGMENT_SECRET_SIZE: usize = 32;

/// A random 256-bit secret identifying one ancestry step of a node.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSecret([u8; SEGMENT_SECRET_SIZE]);

impl SegmentSecret {
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut bytes = [0u8; SEGMENT_SECRET_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; SEGMENT_SECRET_SIZE] {
        &self.0
    }
}

impl From<[u8; SEGMENT_SECRET_SIZE]> for SegmentSecret {
    fn from(bytes: [u8; SEGMENT_SECRET_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SegmentSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentSecret(..)")
    }
}

/// An order-sensitive, one-way fold of segment secrets.
///
/// Equality is byte comparison of the folded state; there is no way to
/// unfold or to test whether one accumulator extends another.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAccumulator {
    state: [u8; 32],
}

impl NameAccumulator {
    /// The accumulator with no segments folded in.
    pub fn empty() -> Self {
        Self {
            state: blake3::derive_key(EMPTY_DOMAIN, &[]),
        }
    }

    /// Fold one more segment into the accumulator.
    pub fn add_segment(&self, secret: &SegmentSecret) -> Self {
        Self {
            state: *blake3::keyed_hash(&self.state, secret.bytes()).as_bytes(),
        }
    }

    /// Derive the forest lookup label for this accumulator.
    pub fn saturate(&self) -> ForestLabel {
        ForestLabel(blake3::derive_key(SATURATE_DOMAIN, &self.state))
    }
}

impl fmt::Debug for NameAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameAccumulator({}..)", hex::encode(&self.state[..4]))
    }
}

/// The 32-byte key a node's encrypted blocks are filed under in the forest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForestLabel([u8; 32]);

impl ForestLabel {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ForestLabel {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ForestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ForestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForestLabel({}..)", hex::encode(&self.0[..4]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_same_segments_same_accumulator() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = SegmentSecret::generate(&mut rng);
        let b = SegmentSecret::generate(&mut rng);

        let one = NameAccumulator::empty().add_segment(&a).add_segment(&b);
        let two = NameAccumulator::empty().add_segment(&a).add_segment(&b);

        assert_eq!(one, two);
        assert_eq!(one.saturate(), two.saturate());
    }

    #[test]
    fn test_fold_is_order_sensitive() {
        let mut rng = StdRng::seed_from_u64(2);
        let a = SegmentSecret::generate(&mut rng);
        let b = SegmentSecret::generate(&mut rng);

        let ab = NameAccumulator::empty().add_segment(&a).add_segment(&b);
        let ba = NameAccumulator::empty().add_segment(&b).add_segment(&a);

        assert_ne!(ab, ba);
        assert_ne!(ab.saturate(), ba.saturate());
    }

    #[test]
    fn test_distinct_secrets_distinct_labels() {
        let mut rng = StdRng::seed_from_u64(3);
        let base = NameAccumulator::empty();

        let mut labels = std::collections::BTreeSet::new();
        for _ in 0..64 {
            let secret = SegmentSecret::generate(&mut rng);
            labels.insert(base.add_segment(&secret).saturate());
        }

        assert_eq!(labels.len(), 64);
    }

    #[test]
    fn test_prefix_label_differs_from_child_label() {
        let mut rng = StdRng::seed_from_u64(4);
        let secret = SegmentSecret::generate(&mut rng);

        let parent = NameAccumulator::empty();
        let child = parent.add_segment(&secret);

        assert_ne!(parent.saturate(), child.saturate());
    }
}
