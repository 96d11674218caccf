//! Chunked content encryption
//!
//! File payloads too large to inline are split into fixed-size plaintext
//! chunks, each independently encrypted under the file's revision key and
//! stored as its own raw block. The manifest keeps the chunk addresses and
//! the declared total length so short reads are detectable.

use tracing::debug;

use crate::crypto::{ContentKey, KeyError};
use crate::linked_data::{Link, LD_RAW_CODEC};
use crate::store::{BlockStore, BlockStoreError};

use serde::{Deserialize, Serialize};

/// Plaintext bytes per encrypted chunk.
pub const MAX_BLOCK_SIZE: usize = 256 * 1024;

/// Payloads at or below this size live inside the encrypted node header
/// instead of separate blocks.
pub const INLINE_CONTENT_LIMIT: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content block missing from store: {0}")]
    BlockMissing(Link),
    #[error("content truncated: declared {expected} bytes, reassembled {got}")]
    Truncated { expected: u64, got: u64 },
    #[error("content decryption failed: wrong revision key or corrupted block")]
    DecryptionFailed,
    #[error("block store error: {0}")]
    Store(#[from] BlockStoreError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

/// Addresses and declared length of a chunked payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentManifest {
    chunks: Vec<Link>,
    total_len: u64,
}

impl ContentManifest {
    pub fn chunks(&self) -> &[Link] {
        &self.chunks
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    #[cfg(test)]
    pub(crate) fn doctored(chunks: Vec<Link>, total_len: u64) -> Self {
        Self { chunks, total_len }
    }
}

/// Chunk, encrypt, and store `content`, returning the manifest.
pub async fn encrypt_and_store(
    content: &[u8],
    key: &ContentKey,
    store: &impl BlockStore,
) -> Result<ContentManifest, ContentError> {
    let mut chunks = Vec::with_capacity(content.len().div_ceil(MAX_BLOCK_SIZE));
    for chunk in content.chunks(MAX_BLOCK_SIZE) {
        let block = key.encrypt(chunk)?;
        let link = store.put_block(block, LD_RAW_CODEC).await?;
        chunks.push(link);
    }
    debug!(
        chunks = chunks.len(),
        total_len = content.len(),
        "stored encrypted content"
    );
    Ok(ContentManifest {
        chunks,
        total_len: content.len() as u64,
    })
}

/// Fetch and decrypt every chunk of a manifest, reassembled in order.
pub async fn fetch_and_decrypt(
    manifest: &ContentManifest,
    key: &ContentKey,
    store: &impl BlockStore,
) -> Result<Vec<u8>, ContentError> {
    let mut out = Vec::with_capacity(manifest.total_len as usize);
    for link in &manifest.chunks {
        let block = match store.get_block(link).await {
            Ok(block) => block,
            Err(BlockStoreError::NotFound(_)) => return Err(ContentError::BlockMissing(*link)),
            Err(err) => return Err(err.into()),
        };
        let plaintext = key.decrypt(&block).map_err(|err| match err {
            KeyError::DecryptionFailed | KeyError::Malformed => ContentError::DecryptionFailed,
            other => ContentError::Key(other),
        })?;
        out.extend_from_slice(&plaintext);
    }
    if out.len() as u64 != manifest.total_len {
        return Err(ContentError::Truncated {
            expected: manifest.total_len,
            got: out.len() as u64,
        });
    }
    Ok(out)
}
