//! Private directories and the path operations over them.
//!
//! Operations never mutate in place. A mutation descends the path collecting
//! working copies of every directory on the way, applies the change at the
//! bottom, then commits upward: store the child, splice its fresh reference
//! into the parent, advance the parent's ratchet, repeat until the root.
//! Only fully committed snapshots are ever returned, so an error at any
//! point leaves the caller's root and forest exactly as they were.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::file::PrivateFile;
use super::node::{NodeHeader, PrivateLink, PrivateNode};
use super::{join_path, FsError, Metadata};
use crate::crypto::NameAccumulator;
use crate::forest::PrivateForest;
use crate::store::BlockStore;

/// The outcome of a path operation: the new root, the new forest snapshot,
/// and the operation's own result.
#[derive(Debug)]
pub struct PrivateOpResult<T> {
    pub root_dir: PrivateDirectory,
    pub forest: PrivateForest,
    pub result: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateDirectory {
    pub(crate) header: NodeHeader,
    pub(crate) metadata: Metadata,
    pub(crate) entries: BTreeMap<String, PrivateLink>,
}

impl PrivateDirectory {
    /// A fresh empty directory under `parent_name`. Roots are created with
    /// [`NameAccumulator::empty`] as the parent.
    pub fn new(
        parent_name: &NameAccumulator,
        time: DateTime<Utc>,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Self {
        Self {
            header: NodeHeader::new(parent_name, rng),
            metadata: Metadata::new(time),
            entries: BTreeMap::new(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn get_id(&self) -> String {
        self.header.label().to_string()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Encrypt this directory under its revision key and file it in the
    /// forest, returning its private reference.
    pub async fn store(
        &self,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<(PrivateLink, PrivateForest), FsError> {
        PrivateNode::Dir(self.clone()).store(forest, store).await
    }

    /// Resolve the immediate child called `name`, if present.
    pub async fn lookup_node(
        &self,
        name: &str,
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<Option<PrivateNode>, FsError> {
        match self.entries.get(name) {
            Some(link) => link.resolve(search_latest, forest, store).await,
            None => Ok(None),
        }
    }

    /// Resolve the node at `path`. An empty path resolves to the receiver;
    /// a missing segment (or a file in directory position) yields `None`
    /// rather than an error.
    pub async fn get_node(
        &self,
        path: &[String],
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<PrivateOpResult<Option<PrivateNode>>, FsError> {
        let mut current = PrivateNode::Dir(self.clone());
        for segment in path {
            let next = match &current {
                PrivateNode::Dir(dir) => {
                    dir.lookup_node(segment, search_latest, forest, store).await?
                }
                PrivateNode::File(_) => None,
            };
            match next {
                Some(node) => current = node,
                None => {
                    return Ok(PrivateOpResult {
                        root_dir: self.clone(),
                        forest: forest.clone(),
                        result: None,
                    })
                }
            }
        }
        Ok(PrivateOpResult {
            root_dir: self.clone(),
            forest: forest.clone(),
            result: Some(current),
        })
    }

    /// Create the directory at `path`, along with any missing intermediate
    /// directories. A fully existing path is a no-op.
    pub async fn mkdir(
        &self,
        path: &[String],
        search_latest: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<PrivateOpResult<()>, FsError> {
        if path.is_empty() {
            return Err(FsError::InvalidPath);
        }
        debug!(path = %join_path(path), "mkdir");

        let (dirs, created) = self
            .open_or_create(path, search_latest, time, forest, store, rng)
            .await?;
        if created == 0 {
            return Ok(PrivateOpResult {
                root_dir: self.clone(),
                forest: forest.clone(),
                result: (),
            });
        }

        let (root_dir, forest) = Self::commit(dirs, path, forest, store).await?;
        Ok(PrivateOpResult {
            root_dir,
            forest,
            result: (),
        })
    }

    /// Write `content` to the file at `path`, creating the file and any
    /// missing intermediate directories. Writing to an existing file
    /// advances it to a new revision.
    pub async fn write(
        &self,
        path: &[String],
        search_latest: bool,
        content: Vec<u8>,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<PrivateOpResult<()>, FsError> {
        let Some((name, dir_path)) = path.split_last() else {
            return Err(FsError::InvalidPath);
        };
        debug!(path = %join_path(path), len = content.len(), "write");

        let (mut dirs, _) = self
            .open_or_create(dir_path, search_latest, time, forest, store, rng)
            .await?;
        let last = dirs.len() - 1;

        let mut file = match dirs[last]
            .lookup_node(name, search_latest, forest, store)
            .await?
        {
            Some(PrivateNode::File(mut file)) => {
                file.prepare_next_revision(time);
                file
            }
            Some(PrivateNode::Dir(_)) => return Err(FsError::NotAFile(join_path(path))),
            None => PrivateFile::new(&dirs[last].header.name, time, rng),
        };
        file.set_content(content, store).await?;

        let (file_link, forest_mid) = PrivateNode::File(file).store(forest, store).await?;
        let parent = &mut dirs[last];
        parent.entries.insert(name.clone(), file_link);
        parent.prepare_next_revision();

        let (root_dir, forest) = Self::commit(dirs, dir_path, &forest_mid, store).await?;
        Ok(PrivateOpResult {
            root_dir,
            forest,
            result: (),
        })
    }

    /// Read the entire content of the file at `path`.
    pub async fn read(
        &self,
        path: &[String],
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<PrivateOpResult<Vec<u8>>, FsError> {
        let resolved = self.get_node(path, search_latest, forest, store).await?;
        let Some(node) = resolved.result else {
            return Err(FsError::NotFound(join_path(path)));
        };
        let Some(file) = node.as_file() else {
            return Err(FsError::NotAFile(join_path(path)));
        };
        let content = file.get_content(store).await?;
        Ok(PrivateOpResult {
            root_dir: resolved.root_dir,
            forest: resolved.forest,
            result: content,
        })
    }

    /// List the directory at `path` as name-sorted `(name, metadata)` pairs.
    pub async fn ls(
        &self,
        path: &[String],
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<PrivateOpResult<Vec<(String, Metadata)>>, FsError> {
        let resolved = self.get_node(path, search_latest, forest, store).await?;
        let Some(node) = resolved.result else {
            return Err(FsError::NotFound(join_path(path)));
        };
        let Some(dir) = node.as_dir() else {
            return Err(FsError::NotADirectory(join_path(path)));
        };

        // BTreeMap iteration keeps the listing name-sorted
        let mut listing = Vec::with_capacity(dir.entries.len());
        for (name, link) in &dir.entries {
            let Some(child) = link.resolve(search_latest, forest, store).await? else {
                return Err(FsError::NotFound(format!(
                    "{}/{name}",
                    join_path(path)
                )));
            };
            listing.push((name.clone(), child.metadata().clone()));
        }
        Ok(PrivateOpResult {
            root_dir: resolved.root_dir,
            forest: resolved.forest,
            result: listing,
        })
    }

    /// Remove the entry at `path`. Ancestors advance a revision; the removed
    /// node's own blocks stay in the forest (references are never deleted),
    /// they just become unreachable from the new root.
    pub async fn rm(
        &self,
        path: &[String],
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<PrivateOpResult<()>, FsError> {
        let Some((name, dir_path)) = path.split_last() else {
            return Err(FsError::InvalidPath);
        };
        debug!(path = %join_path(path), "rm");

        let Some(mut dirs) = self
            .open_existing(dir_path, search_latest, forest, store)
            .await?
        else {
            return Err(FsError::NotFound(join_path(path)));
        };
        let last = dirs.len() - 1;
        let parent = &mut dirs[last];
        if parent.entries.remove(name).is_none() {
            return Err(FsError::NotFound(join_path(path)));
        }
        parent.prepare_next_revision();

        let (root_dir, forest) = Self::commit(dirs, dir_path, forest, store).await?;
        Ok(PrivateOpResult {
            root_dir,
            forest,
            result: (),
        })
    }

    /// Move the node at `from` to `to`. Only the locating reference moves;
    /// the node keeps its accumulated name and revision history, so holders
    /// of pre-move references can still follow it forward.
    pub async fn basic_mv(
        &self,
        from: &[String],
        to: &[String],
        search_latest: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<PrivateOpResult<()>, FsError> {
        if from.is_empty() || to.is_empty() {
            return Err(FsError::InvalidPath);
        }
        if to.starts_with(from) {
            return Err(FsError::MoveIntoSelf {
                from: join_path(from),
                to: join_path(to),
            });
        }
        debug!(from = %join_path(from), to = %join_path(to), "mv");

        let source = self.get_node(from, search_latest, forest, store).await?;
        let Some(node) = source.result else {
            return Err(FsError::NotFound(join_path(from)));
        };
        let link = node.link();

        let dest = self.get_node(to, search_latest, forest, store).await?;
        if dest.result.is_some() {
            return Err(FsError::AlreadyExists(join_path(to)));
        }

        let removed = self.rm(from, search_latest, forest, store).await?;
        removed
            .root_dir
            .attach(link, to, search_latest, time, &removed.forest, store, rng)
            .await
    }

    /// Copy the node at `from` to `to` by duplicating its reference. Both
    /// paths afterwards point at the same node and history; no content is
    /// re-encrypted or re-stored.
    pub async fn cp(
        &self,
        from: &[String],
        to: &[String],
        search_latest: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<PrivateOpResult<()>, FsError> {
        if from.is_empty() || to.is_empty() {
            return Err(FsError::InvalidPath);
        }
        debug!(from = %join_path(from), to = %join_path(to), "cp");

        let source = self.get_node(from, search_latest, forest, store).await?;
        let Some(node) = source.result else {
            return Err(FsError::NotFound(join_path(from)));
        };
        let link = node.link();

        let dest = self.get_node(to, search_latest, forest, store).await?;
        if dest.result.is_some() {
            return Err(FsError::AlreadyExists(join_path(to)));
        }

        self.attach(link, to, search_latest, time, forest, store, rng)
            .await
    }

    /// Splice an existing reference in at `path`, creating missing parent
    /// directories.
    async fn attach(
        &self,
        link: PrivateLink,
        path: &[String],
        search_latest: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<PrivateOpResult<()>, FsError> {
        let Some((name, dir_path)) = path.split_last() else {
            return Err(FsError::InvalidPath);
        };

        let (mut dirs, _) = self
            .open_or_create(dir_path, search_latest, time, forest, store, rng)
            .await?;
        let last = dirs.len() - 1;
        let parent = &mut dirs[last];
        if parent.entries.contains_key(name) {
            return Err(FsError::AlreadyExists(join_path(path)));
        }
        parent.entries.insert(name.clone(), link);
        parent.prepare_next_revision();

        let (root_dir, forest) = Self::commit(dirs, dir_path, forest, store).await?;
        Ok(PrivateOpResult {
            root_dir,
            forest,
            result: (),
        })
    }

    /// Descend `path` collecting working copies, creating missing
    /// directories along the way. Returns the chain root-first (one more
    /// entry than `path`) and how many directories were created.
    async fn open_or_create(
        &self,
        path: &[String],
        search_latest: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &impl BlockStore,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Vec<PrivateDirectory>, usize), FsError> {
        let mut dirs = vec![self.clone()];
        let mut created = 0;
        for (idx, segment) in path.iter().enumerate() {
            let parent = &dirs[dirs.len() - 1];
            let child = match parent
                .lookup_node(segment, search_latest, forest, store)
                .await?
            {
                Some(PrivateNode::Dir(dir)) => dir,
                Some(PrivateNode::File(_)) => {
                    return Err(FsError::NotADirectory(join_path(&path[..=idx])))
                }
                None => {
                    created += 1;
                    PrivateDirectory::new(&parent.header.name, time, rng)
                }
            };
            dirs.push(child);
        }
        Ok((dirs, created))
    }

    /// Like [`open_or_create`] but never creates: a missing segment yields
    /// `None`.
    ///
    /// [`open_or_create`]: PrivateDirectory::open_or_create
    async fn open_existing(
        &self,
        path: &[String],
        search_latest: bool,
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<Option<Vec<PrivateDirectory>>, FsError> {
        let mut dirs = vec![self.clone()];
        for (idx, segment) in path.iter().enumerate() {
            let parent = &dirs[dirs.len() - 1];
            let child = match parent
                .lookup_node(segment, search_latest, forest, store)
                .await?
            {
                Some(PrivateNode::Dir(dir)) => dir,
                Some(PrivateNode::File(_)) => {
                    return Err(FsError::NotADirectory(join_path(&path[..=idx])))
                }
                None => return Ok(None),
            };
            dirs.push(child);
        }
        Ok(Some(dirs))
    }

    /// Store a mutated chain bottom-up. Each stored child's fresh reference
    /// is spliced into its parent, which then advances its own ratchet
    /// before being stored in turn. `names` holds the entry names between
    /// consecutive chain levels.
    async fn commit(
        mut dirs: Vec<PrivateDirectory>,
        names: &[String],
        forest: &PrivateForest,
        store: &impl BlockStore,
    ) -> Result<(PrivateDirectory, PrivateForest), FsError> {
        debug_assert_eq!(dirs.len(), names.len() + 1);
        let mut forest = forest.clone();

        while dirs.len() > 1 {
            let Some(child) = dirs.pop() else { break };
            let (link, next) = PrivateNode::Dir(child).store(&forest, store).await?;
            forest = next;

            let depth = dirs.len() - 1;
            if let Some(parent) = dirs.last_mut() {
                parent.entries.insert(names[depth].clone(), link);
                parent.prepare_next_revision();
            }
        }

        let root = dirs
            .pop()
            .ok_or_else(|| anyhow::anyhow!("empty directory chain"))?;
        let (_, forest) = PrivateNode::Dir(root.clone()).store(&forest, store).await?;
        Ok((root, forest))
    }

    /// Advance to the next revision.
    pub(crate) fn prepare_next_revision(&mut self) {
        self.header.advance();
    }
}
