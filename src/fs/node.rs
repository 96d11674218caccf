//! Private nodes and the references that locate them.

use std::collections::BTreeSet;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::directory::PrivateDirectory;
use super::file::PrivateFile;
use super::{FsError, Metadata};
use crate::crypto::{ForestLabel, NameAccumulator, RatchetChain, SegmentSecret};
use crate::forest::PrivateForest;
use crate::linked_data::{BlockEncoded, DagCborCodec, Link, LD_RAW_CODEC};
use crate::store::{BlockStore, BlockStoreError};

/// Upper bound on how far ahead of a reference the latest revision is
/// searched for.
pub(crate) const REVISION_SEARCH_LIMIT: u64 = 1 << 16;

/// The encrypted-at-rest identity of a node: its accumulated name, the
/// segment secret that distinguishes it from its siblings, and the ratchet
/// naming the current revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct NodeHeader {
    pub(crate) name: NameAccumulator,
    pub(crate) segment: SegmentSecret,
    pub(crate) ratchet: RatchetChain,
}

impl NodeHeader {
    pub(crate) fn new(parent_name: &NameAccumulator, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let segment = SegmentSecret::generate(rng);
        let name = parent_name.add_segment(&segment);
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self {
            name,
            segment,
            ratchet: RatchetChain::initial(&seed),
        }
    }

    pub(crate) fn label(&self) -> ForestLabel {
        self.name.saturate()
    }

    pub(crate) fn advance(&mut self) {
        self.ratchet = self.ratchet.advance();
    }

    pub(crate) fn link(&self) -> PrivateLink {
        PrivateLink {
            label: self.label(),
            ratchet: self.ratchet.clone(),
        }
    }
}

/// A private reference: enough to find a node in the forest and decrypt it,
/// nothing more. Holding one grants access to the referenced revision and
/// everything after it, never before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLink {
    pub(crate) label: ForestLabel,
    pub(crate) ratchet: RatchetChain,
}

impl PrivateLink {
    pub fn label(&self) -> &ForestLabel {
        &self.label
    }

    /// Resolve the referenced node from the forest.
    ///
    /// With `search_latest` the resolution gallops forward with ratchet
    /// jumps and then binary-searches for the most advanced revision that
    /// still decrypts. Every revision of a node is filed under the same
    /// label, so decryptability is monotone in the step count and the
    /// search is sound.
    pub async fn resolve(
        &self,
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<Option<PrivateNode>, FsError> {
        let Some(candidates) = forest.get(&self.label) else {
            return Ok(None);
        };

        let Some(base) = self.probe(0, candidates, store).await? else {
            trace!(label = %self.label, "no resolvable block under label");
            return Ok(None);
        };
        if !search_latest {
            return Ok(Some(base));
        }

        // gallop to bracket the newest decryptable revision
        let mut best = base;
        let mut lo = 0u64;
        let mut hi = 1u64;
        while hi <= REVISION_SEARCH_LIMIT {
            match self.probe(hi, candidates, store).await? {
                Some(node) => {
                    best = node;
                    lo = hi;
                    hi *= 2;
                }
                None => break,
            }
        }

        let mut bad = hi.min(REVISION_SEARCH_LIMIT + 1);
        while lo + 1 < bad {
            let mid = lo + (bad - lo) / 2;
            match self.probe(mid, candidates, store).await? {
                Some(node) => {
                    best = node;
                    lo = mid;
                }
                None => bad = mid,
            }
        }

        trace!(label = %self.label, steps = lo, "resolved latest revision");
        Ok(Some(best))
    }

    /// Try to decrypt some candidate block with the key `steps` revisions
    /// ahead of this reference. Candidates from other revisions fail
    /// authentication and are skipped; ties break on the smallest link.
    async fn probe(
        &self,
        steps: u64,
        candidates: &BTreeSet<Link>,
        store: &impl BlockStore,
    ) -> Result<Option<PrivateNode>, FsError> {
        let key = self.ratchet.jump(steps).derive_key();
        for link in candidates {
            let block = match store.get_block(link).await {
                Ok(block) => block,
                Err(BlockStoreError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            let Ok(plaintext) = key.decrypt(&block) else {
                continue;
            };
            return Ok(Some(PrivateNode::decode(&plaintext)?));
        }
        Ok(None)
    }
}

/// A decrypted node: either a directory or a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrivateNode {
    Dir(PrivateDirectory),
    File(PrivateFile),
}

impl BlockEncoded<DagCborCodec> for PrivateNode {}

impl PrivateNode {
    pub fn is_dir(&self) -> bool {
        matches!(self, PrivateNode::Dir(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, PrivateNode::File(_))
    }

    pub fn as_dir(&self) -> Option<&PrivateDirectory> {
        match self {
            PrivateNode::Dir(dir) => Some(dir),
            PrivateNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&PrivateFile> {
        match self {
            PrivateNode::File(file) => Some(file),
            PrivateNode::Dir(_) => None,
        }
    }

    pub fn into_dir(self) -> Option<PrivateDirectory> {
        match self {
            PrivateNode::Dir(dir) => Some(dir),
            PrivateNode::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<PrivateFile> {
        match self {
            PrivateNode::File(file) => Some(file),
            PrivateNode::Dir(_) => None,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            PrivateNode::Dir(dir) => dir.metadata(),
            PrivateNode::File(file) => file.metadata(),
        }
    }

    /// Stable opaque identifier: the hex of the node's forest label.
    pub fn get_id(&self) -> String {
        self.header().label().to_string()
    }

    pub(crate) fn header(&self) -> &NodeHeader {
        match self {
            PrivateNode::Dir(dir) => &dir.header,
            PrivateNode::File(file) => &file.header,
        }
    }

    /// The private reference to this node at its current revision.
    pub fn link(&self) -> PrivateLink {
        self.header().link()
    }

    /// Encrypt this node under its revision key and file it in the forest.
    pub async fn store(
        &self,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<(PrivateLink, PrivateForest), FsError> {
        let key = self.header().ratchet.derive_key();
        let block = key.encrypt(&self.encode()?)?;
        let link = store.put_block(block, LD_RAW_CODEC).await?;
        let label = self.header().label();
        trace!(%label, %link, "stored node revision");
        Ok((self.link(), forest.put(label, link)))
    }

    /// The newest revision of this node reachable from its own reference,
    /// or the node itself if nothing newer is filed.
    pub async fn search_latest(
        &self,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<PrivateNode, FsError> {
        match self.link().resolve(true, forest, store).await? {
            Some(node) => Ok(node),
            None => Ok(self.clone()),
        }
    }
}
