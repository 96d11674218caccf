//! Private files.

use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::content::{
    encrypt_and_store, fetch_and_decrypt, ContentManifest, INLINE_CONTENT_LIMIT,
};
use super::node::{NodeHeader, PrivateNode};
use super::{FsError, Metadata};
use crate::crypto::NameAccumulator;
use crate::forest::PrivateForest;
use crate::store::BlockStore;

/// Where a file's bytes live: inside the encrypted header for small
/// payloads, or chunked into separate encrypted blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileContent {
    Inline { data: Vec<u8> },
    External(ContentManifest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateFile {
    pub(crate) header: NodeHeader,
    pub(crate) metadata: Metadata,
    pub(crate) content: FileContent,
}

impl PrivateFile {
    /// A fresh empty file under `parent_name`.
    pub fn new(
        parent_name: &NameAccumulator,
        time: DateTime<Utc>,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Self {
        Self {
            header: NodeHeader::new(parent_name, rng),
            metadata: Metadata::new(time),
            content: FileContent::Inline { data: Vec::new() },
        }
    }

    /// A fresh file holding `content`, already filed in the returned forest
    /// snapshot.
    pub async fn with_content(
        parent_name: &NameAccumulator,
        time: DateTime<Utc>,
        content: Vec<u8>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self, PrivateForest), FsError> {
        let mut file = Self::new(parent_name, time, rng);
        file.set_content(content, store).await?;
        let (_, forest) = PrivateNode::File(file.clone()).store(forest, store).await?;
        Ok((file, forest))
    }

    /// Replace the file's bytes. Chunks for external content are written to
    /// the store immediately, under the current revision key.
    pub(crate) async fn set_content(
        &mut self,
        content: Vec<u8>,
        store: &impl BlockStore,
    ) -> Result<(), FsError> {
        if content.len() <= INLINE_CONTENT_LIMIT {
            self.content = FileContent::Inline { data: content };
        } else {
            let key = self.header.ratchet.derive_key();
            let manifest = encrypt_and_store(&content, &key, store).await?;
            self.content = FileContent::External(manifest);
        }
        Ok(())
    }

    /// The file's entire content.
    pub async fn get_content(&self, store: &impl BlockStore) -> Result<Vec<u8>, FsError> {
        match &self.content {
            FileContent::Inline { data } => Ok(data.clone()),
            FileContent::External(manifest) => {
                let key = self.header.ratchet.derive_key();
                Ok(fetch_and_decrypt(manifest, &key, store).await?)
            }
        }
    }

    pub fn size(&self) -> u64 {
        match &self.content {
            FileContent::Inline { data } => data.len() as u64,
            FileContent::External(manifest) => manifest.total_len(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn get_id(&self) -> String {
        self.header.label().to_string()
    }

    /// Advance to the next revision and stamp the modification time.
    pub(crate) fn prepare_next_revision(&mut self, time: DateTime<Utc>) {
        self.header.advance();
        self.metadata.touch(time);
    }
}
