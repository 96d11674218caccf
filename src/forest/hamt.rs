//! Persistent 16-way trie over forest labels.
//!
//! Nodes are shared behind `Arc`; every mutation copies only the path from
//! the root to the touched leaf, so older snapshots stay valid and cheap to
//! keep around. Branching consumes one nibble of the label per level, which
//! keeps the depth bounded by the label length.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::crypto::ForestLabel;
use crate::linked_data::Link;

pub(crate) const FANOUT: usize = 16;

fn nibble(label: &ForestLabel, depth: usize) -> usize {
    let byte = label.as_bytes()[depth / 2];
    if depth % 2 == 0 {
        (byte >> 4) as usize
    } else {
        (byte & 0x0f) as usize
    }
}

fn empty_children() -> [Option<Arc<HamtNode>>; FANOUT] {
    std::array::from_fn(|_| None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HamtNode {
    Leaf {
        label: ForestLabel,
        links: BTreeSet<Link>,
    },
    Branch {
        children: [Option<Arc<HamtNode>>; FANOUT],
    },
}

impl HamtNode {
    /// Copy-on-write insert of one link under one label.
    pub(crate) fn insert(
        node: Option<&Arc<HamtNode>>,
        depth: usize,
        label: ForestLabel,
        link: Link,
    ) -> Arc<HamtNode> {
        let Some(node) = node else {
            return Arc::new(HamtNode::Leaf {
                label,
                links: BTreeSet::from([link]),
            });
        };

        match node.as_ref() {
            HamtNode::Leaf {
                label: existing,
                links,
            } if *existing == label => {
                let mut links = links.clone();
                links.insert(link);
                Arc::new(HamtNode::Leaf { label, links })
            }
            HamtNode::Leaf { .. } => {
                // push the colliding leaf one level down, then retry
                let branch = Self::branchify(node, depth);
                Self::insert(Some(&branch), depth, label, link)
            }
            HamtNode::Branch { children } => {
                let idx = nibble(&label, depth);
                let mut children = children.clone();
                children[idx] = Some(Self::insert(children[idx].as_ref(), depth + 1, label, link));
                Arc::new(HamtNode::Branch { children })
            }
        }
    }

    pub(crate) fn get<'a>(
        node: Option<&'a Arc<HamtNode>>,
        depth: usize,
        label: &ForestLabel,
    ) -> Option<&'a BTreeSet<Link>> {
        let node = node?;
        match node.as_ref() {
            HamtNode::Leaf {
                label: existing,
                links,
            } => (existing == label).then_some(links),
            HamtNode::Branch { children } => {
                Self::get(children[nibble(label, depth)].as_ref(), depth + 1, label)
            }
        }
    }

    /// Union of two tries, sharing whole subtrees whenever the pointers
    /// already agree.
    pub(crate) fn union(
        a: Option<&Arc<HamtNode>>,
        b: Option<&Arc<HamtNode>>,
        depth: usize,
    ) -> Option<Arc<HamtNode>> {
        match (a, b) {
            (None, None) => None,
            (Some(x), None) => Some(x.clone()),
            (None, Some(y)) => Some(y.clone()),
            (Some(x), Some(y)) => {
                if Arc::ptr_eq(x, y) {
                    return Some(x.clone());
                }
                Some(match (x.as_ref(), y.as_ref()) {
                    (
                        HamtNode::Leaf {
                            label: la,
                            links: sa,
                        },
                        HamtNode::Leaf {
                            label: lb,
                            links: sb,
                        },
                    ) if la == lb => {
                        if sb.is_subset(sa) {
                            x.clone()
                        } else if sa.is_subset(sb) {
                            y.clone()
                        } else {
                            Arc::new(HamtNode::Leaf {
                                label: *la,
                                links: sa.union(sb).copied().collect(),
                            })
                        }
                    }
                    (HamtNode::Leaf { .. }, HamtNode::Leaf { .. }) => {
                        let xb = Self::branchify(x, depth);
                        let yb = Self::branchify(y, depth);
                        return Self::union(Some(&xb), Some(&yb), depth);
                    }
                    (HamtNode::Leaf { .. }, HamtNode::Branch { .. }) => {
                        let xb = Self::branchify(x, depth);
                        return Self::union(Some(&xb), Some(y), depth);
                    }
                    (HamtNode::Branch { .. }, HamtNode::Leaf { .. }) => {
                        let yb = Self::branchify(y, depth);
                        return Self::union(Some(x), Some(&yb), depth);
                    }
                    (HamtNode::Branch { children: ca }, HamtNode::Branch { children: cb }) => {
                        let mut children = empty_children();
                        for (idx, slot) in children.iter_mut().enumerate() {
                            *slot = Self::union(ca[idx].as_ref(), cb[idx].as_ref(), depth + 1);
                        }
                        Arc::new(HamtNode::Branch { children })
                    }
                })
            }
        }
    }

    fn branchify(leaf: &Arc<HamtNode>, depth: usize) -> Arc<HamtNode> {
        let mut children = empty_children();
        if let HamtNode::Leaf { label, .. } = leaf.as_ref() {
            children[nibble(label, depth)] = Some(leaf.clone());
        }
        Arc::new(HamtNode::Branch { children })
    }

    /// Visit every entry in label order.
    pub(crate) fn for_each<'a>(
        node: Option<&'a Arc<HamtNode>>,
        f: &mut impl FnMut(&'a ForestLabel, &'a BTreeSet<Link>),
    ) {
        let Some(node) = node else { return };
        match node.as_ref() {
            HamtNode::Leaf { label, links } => f(label, links),
            HamtNode::Branch { children } => {
                for child in children.iter() {
                    Self::for_each(child.as_ref(), f);
                }
            }
        }
    }
}
