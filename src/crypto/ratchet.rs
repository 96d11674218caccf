//! Revision ratchets
//!
//! A [`RatchetChain`] names one revision of a node. Advancing is a one-way
//! hash step, so a holder of revision `r` can derive keys for `r`, `r+1`,
//! `r+2`, ... but never for `r-1`. The chain keeps three levels (large,
//! medium, small) with 256 steps per level, which lets [`jump`] skip whole
//! epochs instead of hashing once per revision.
//!
//! [`jump`]: RatchetChain::jump

use serde::{Deserialize, Serialize};

use super::key::ContentKey;

const LARGE_DOMAIN: &str = "thicket/ratchet/large/v1";
const MEDIUM_DOMAIN: &str = "thicket/ratchet/medium/v1";
const SMALL_DOMAIN: &str = "thicket/ratchet/small/v1";
const STEP_DOMAIN: &str = "thicket/ratchet/step/v1";
const KEY_DOMAIN: &str = "thicket/ratchet/content-key/v1";

const EPOCH: u64 = 256;
const LARGE_EPOCH: u64 = EPOCH * EPOCH;

fn step(state: &[u8; 32]) -> [u8; 32] {
    blake3::derive_key(STEP_DOMAIN, state)
}

fn medium_zero(large: &[u8; 32]) -> [u8; 32] {
    blake3::derive_key(MEDIUM_DOMAIN, large)
}

fn small_zero(medium: &[u8; 32]) -> [u8; 32] {
    blake3::derive_key(SMALL_DOMAIN, medium)
}

/// A forward-only revision counter with epoch skipping.
///
/// Two chains compare equal exactly when they denote the same revision of
/// the same seed. There is no reverse operation; the only constructors are
/// [`initial`] and deserialization of a previously serialized state.
///
/// [`initial`]: RatchetChain::initial
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatchetChain {
    large: [u8; 32],
    medium: [u8; 32],
    medium_counter: u8,
    small: [u8; 32],
    small_counter: u8,
}

impl RatchetChain {
    /// The zeroth revision for a fresh seed.
    pub fn initial(seed: &[u8; 32]) -> Self {
        let large = blake3::derive_key(LARGE_DOMAIN, seed);
        let medium = medium_zero(&large);
        let small = small_zero(&medium);
        Self {
            large,
            medium,
            medium_counter: 0,
            small,
            small_counter: 0,
        }
    }

    /// The next revision.
    pub fn advance(&self) -> Self {
        if self.small_counter == u8::MAX {
            return self.next_medium_epoch();
        }
        Self {
            small: step(&self.small),
            small_counter: self.small_counter + 1,
            ..self.clone()
        }
    }

    fn next_medium_epoch(&self) -> Self {
        if self.medium_counter == u8::MAX {
            return self.next_large_epoch();
        }
        let medium = step(&self.medium);
        let small = small_zero(&medium);
        Self {
            large: self.large,
            medium,
            medium_counter: self.medium_counter + 1,
            small,
            small_counter: 0,
        }
    }

    fn next_large_epoch(&self) -> Self {
        let large = step(&self.large);
        let medium = medium_zero(&large);
        let small = small_zero(&medium);
        Self {
            large,
            medium,
            medium_counter: 0,
            small,
            small_counter: 0,
        }
    }

    /// Advance by `steps` revisions, skipping whole epochs where possible.
    ///
    /// Equivalent to `steps` calls to [`advance`] but costs O(steps / 256)
    /// hash operations plus a bounded tail, which is what makes searching
    /// far-ahead revisions practical.
    ///
    /// [`advance`]: RatchetChain::advance
    pub fn jump(&self, steps: u64) -> Self {
        let mut state = self.clone();
        let mut remaining = steps;

        loop {
            let into_large = state.medium_counter as u64 * EPOCH + state.small_counter as u64;
            let to_next_large = LARGE_EPOCH - into_large;
            if remaining < to_next_large {
                break;
            }
            remaining -= to_next_large;
            state = state.next_large_epoch();
        }

        loop {
            let to_next_medium = EPOCH - state.small_counter as u64;
            if remaining < to_next_medium {
                break;
            }
            remaining -= to_next_medium;
            state = state.next_medium_epoch();
        }

        for _ in 0..remaining {
            state = state.advance();
        }
        state
    }

    /// Derive the content key for this revision.
    pub fn derive_key(&self) -> ContentKey {
        let mut material = Vec::with_capacity(98);
        material.extend_from_slice(&self.large);
        material.extend_from_slice(&self.medium);
        material.push(self.medium_counter);
        material.extend_from_slice(&self.small);
        material.push(self.small_counter);
        ContentKey::from(blake3::derive_key(KEY_DOMAIN, &material))
    }
}

impl std::fmt::Debug for RatchetChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatchetChain")
            .field("medium_counter", &self.medium_counter)
            .field("small_counter", &self.small_counter)
            .finish_non_exhaustive()
    }
}
