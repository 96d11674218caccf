//! Content addressing and block encoding
//!
//! Everything that leaves this crate for the block store is an opaque byte
//! block addressed by a CIDv1 over its BLAKE3 digest. Node headers are
//! DAG-CBOR encoded before encryption; encrypted blocks and content chunks
//! are stored under the raw codec.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use cid::Cid;

/// Multicodec code for raw byte blocks.
pub const LD_RAW_CODEC: u64 = 0x55;
/// Multicodec code for DAG-CBOR blocks.
pub const LD_CBOR_CODEC: u64 = 0x71;

/// Multihash code for BLAKE3-256.
const BLAKE3_MH_CODE: u64 = 0x1e;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(#[from] serde_ipld_dagcbor::EncodeError<std::collections::TryReserveError>),
    #[error("decode error: {0}")]
    Decode(#[from] serde_ipld_dagcbor::DecodeError<std::convert::Infallible>),
}

/// A content address: a CIDv1 wrapping the BLAKE3 digest of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link(Cid);

impl Link {
    /// Build a link from a codec and a precomputed BLAKE3 digest.
    pub fn new(codec: u64, digest: [u8; 32]) -> Self {
        let mh = multihash::Multihash::<64>::wrap(BLAKE3_MH_CODE, &digest)
            .expect("a 32-byte digest always fits in a 64-byte multihash");
        Link(Cid::new_v1(codec, mh))
    }

    /// Compute the address of a block.
    pub fn of(codec: u64, block: &[u8]) -> Self {
        Self::new(codec, *blake3::hash(block).as_bytes())
    }

    pub fn cid(&self) -> &Cid {
        &self.0
    }

    pub fn codec(&self) -> u64 {
        self.0.codec()
    }
}

impl From<Cid> for Link {
    fn from(cid: Cid) -> Self {
        Link(cid)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Marker for the DAG-CBOR codec.
pub struct DagCborCodec;

/// Types that round-trip through a block codec.
///
/// Implementors get `encode`/`decode` for free; the codec parameter keeps
/// the door open for other block formats without touching call sites.
pub trait BlockEncoded<C>: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_ipld_dagcbor::to_vec(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_ipld_dagcbor::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u64,
    }

    impl BlockEncoded<DagCborCodec> for Sample {}

    #[test]
    fn test_encode_decode_roundtrip() {
        let sample = Sample {
            name: "example".to_string(),
            count: 42,
        };

        let encoded = sample.encode().unwrap();
        let decoded = Sample::decode(&encoded).unwrap();

        assert_eq!(sample, decoded);
    }

    #[test]
    fn test_link_deterministic() {
        let a = Link::of(LD_RAW_CODEC, b"hello");
        let b = Link::of(LD_RAW_CODEC, b"hello");
        let c = Link::of(LD_RAW_CODEC, b"world");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_link_codec_distinguishes() {
        let raw = Link::of(LD_RAW_CODEC, b"hello");
        let cbor = Link::of(LD_CBOR_CODEC, b"hello");

        assert_ne!(raw, cbor);
        assert_eq!(raw.codec(), LD_RAW_CODEC);
        assert_eq!(cbor.codec(), LD_CBOR_CODEC);
    }

    #[test]
    fn test_link_serde_roundtrip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Holder {
            link: Link,
        }
        impl BlockEncoded<DagCborCodec> for Holder {}

        let holder = Holder {
            link: Link::of(LD_RAW_CODEC, b"some block"),
        };
        let encoded = holder.encode().unwrap();
        let decoded = Holder::decode(&encoded).unwrap();

        assert_eq!(holder, decoded);
    }
}
