//! The private forest: an append-only multi-map from forest labels to
//! encrypted block links.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::hamt::HamtNode;
use crate::crypto::ForestLabel;
use crate::linked_data::Link;

/// All revisions of all nodes, keyed by saturated name label.
///
/// The forest is a persistent value: [`put`] and [`merge`] return new
/// snapshots sharing structure with their inputs, and nothing ever removes
/// a reference. Holding an old snapshot is free and always safe.
///
/// [`put`]: PrivateForest::put
/// [`merge`]: PrivateForest::merge
#[derive(Debug, Clone, Default)]
pub struct PrivateForest {
    root: Option<Arc<HamtNode>>,
}

impl PrivateForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot with `link` added under `label`. Existing references are
    /// untouched; inserting a link that is already present is a no-op in
    /// value terms.
    pub fn put(&self, label: ForestLabel, link: Link) -> Self {
        Self {
            root: Some(HamtNode::insert(self.root.as_ref(), 0, label, link)),
        }
    }

    /// Every block link filed under `label`, if any. A label with no links
    /// is indistinguishable from one never used.
    pub fn get(&self, label: &ForestLabel) -> Option<&BTreeSet<Link>> {
        HamtNode::get(self.root.as_ref(), 0, label)
    }

    pub fn has(&self, label: &ForestLabel) -> bool {
        self.get(label).is_some()
    }

    /// Union of two snapshots: per-label set union of links.
    ///
    /// Commutative, associative, and idempotent, so replicas that merge in
    /// any order converge. Merging never drops a reference from either side.
    pub fn merge(&self, other: &Self) -> Self {
        let merged = Self {
            root: HamtNode::union(self.root.as_ref(), other.root.as_ref(), 0),
        };
        debug!(
            ours = self.len(),
            theirs = other.len(),
            merged = merged.len(),
            "forest merge"
        );
        merged
    }

    /// Labels whose link sets differ between the two snapshots, with both
    /// sides' links (absent = empty).
    pub fn diff(&self, other: &Self) -> Vec<ForestDifference> {
        let ours = self.entries();
        let theirs = other.entries();
        let mut out = Vec::new();

        let (mut i, mut j) = (0, 0);
        while i < ours.len() || j < theirs.len() {
            match (ours.get(i), theirs.get(j)) {
                (Some((la, sa)), Some((lb, sb))) if la == lb => {
                    if sa != sb {
                        out.push(ForestDifference {
                            label: **la,
                            ours: (*sa).clone(),
                            theirs: (*sb).clone(),
                        });
                    }
                    i += 1;
                    j += 1;
                }
                (Some((la, sa)), Some((lb, _))) if la < lb => {
                    out.push(ForestDifference {
                        label: **la,
                        ours: (*sa).clone(),
                        theirs: BTreeSet::new(),
                    });
                    i += 1;
                }
                (Some(_), Some((lb, sb))) => {
                    out.push(ForestDifference {
                        label: **lb,
                        ours: BTreeSet::new(),
                        theirs: (*sb).clone(),
                    });
                    j += 1;
                }
                (Some((la, sa)), None) => {
                    out.push(ForestDifference {
                        label: **la,
                        ours: (*sa).clone(),
                        theirs: BTreeSet::new(),
                    });
                    i += 1;
                }
                (None, Some((lb, sb))) => {
                    out.push(ForestDifference {
                        label: **lb,
                        ours: BTreeSet::new(),
                        theirs: (*sb).clone(),
                    });
                    j += 1;
                }
                (None, None) => break,
            }
        }
        out
    }

    /// All entries in label order.
    pub fn entries(&self) -> Vec<(&ForestLabel, &BTreeSet<Link>)> {
        let mut out = Vec::new();
        HamtNode::for_each(self.root.as_ref(), &mut |label, links| {
            out.push((label, links));
        });
        out
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        let mut count = 0;
        HamtNode::for_each(self.root.as_ref(), &mut |_, _| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

impl PartialEq for PrivateForest {
    fn eq(&self, other: &Self) -> bool {
        self.entries() == other.entries()
    }
}

impl Eq for PrivateForest {}

/// One divergent label reported by [`PrivateForest::diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestDifference {
    pub label: ForestLabel,
    pub ours: BTreeSet<Link>,
    pub theirs: BTreeSet<Link>,
}
