//! Block store collaborator
//!
//! The crate never persists anything itself; every encrypted block goes
//! through a [`BlockStore`]. Stores are content-addressed: a block's address
//! is a pure function of its bytes, so `put_block` is idempotent and blocks
//! written by an aborted operation are unreachable garbage, never corruption.
//!
//! [`MemoryBlockStore`] is the in-process reference implementation used by
//! the tests; production backends live outside this crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::linked_data::{Cid, Link};

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("block not found: {0}")]
    NotFound(Link),
    #[error("block store error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Content-addressed block storage.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block under its content address and return the address.
    async fn put_block(&self, bytes: Vec<u8>, codec: u64) -> Result<Link, BlockStoreError>;

    /// Fetch a block by address.
    async fn get_block(&self, link: &Link) -> Result<Bytes, BlockStoreError>;

    /// Whether a block is present without fetching it.
    async fn has_block(&self, link: &Link) -> Result<bool, BlockStoreError>;
}

/// In-memory block store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    blocks: Arc<Mutex<HashMap<Cid, Bytes>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn put_block(&self, bytes: Vec<u8>, codec: u64) -> Result<Link, BlockStoreError> {
        let link = Link::of(codec, &bytes);
        trace!(%link, len = bytes.len(), "put block");
        self.blocks
            .lock()
            .entry(*link.cid())
            .or_insert_with(|| Bytes::from(bytes));
        Ok(link)
    }

    async fn get_block(&self, link: &Link) -> Result<Bytes, BlockStoreError> {
        self.blocks
            .lock()
            .get(link.cid())
            .cloned()
            .ok_or(BlockStoreError::NotFound(*link))
    }

    async fn has_block(&self, link: &Link) -> Result<bool, BlockStoreError> {
        Ok(self.blocks.lock().contains_key(link.cid()))
    }
}
