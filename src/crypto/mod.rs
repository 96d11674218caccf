//! Cryptographic building blocks: name accumulators for node identity,
//! revision ratchets for forward-only key evolution, and the content keys
//! derived from them.

mod accumulator;
mod key;
mod ratchet;

pub use accumulator::{ForestLabel, NameAccumulator, SegmentSecret, SEGMENT_SECRET_SIZE};
pub use key::{ContentKey, KeyError, KEY_SIZE, NONCE_SIZE};
pub use ratchet::RatchetChain;
