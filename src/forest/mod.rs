//! The private forest index and the persistent trie backing it.

mod forest;
mod hamt;

pub use forest::{ForestDifference, PrivateForest};
