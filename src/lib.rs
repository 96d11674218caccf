/*!
Thicket is an end-to-end encrypted, content-addressed private file tree.

Directory structure, file names, and file content are all encrypted before
anything reaches storage. The storage backend only ever sees uniformly
random-looking blocks filed under opaque labels; it can serve the tree
without being able to read it, list it, or correlate siblings.

```text
  caller --> PrivateDirectory ops --> PrivateForest (label -> blocks)
                    |                        |
              ratchet-derived            BlockStore
               content keys           (opaque blocks)
```

Mutations are copy-on-write: every operation returns a fresh root directory
and a fresh forest snapshot, and each changed node advances its forward-only
key ratchet so earlier revision keys can never decrypt later revisions.
*/

/** Name accumulators, revision ratchets, and content keys. */
pub mod crypto;
/** Private files, directories, and the path operations over them. */
pub mod fs;
/** The append-only label-to-blocks index shared by all nodes. */
pub mod forest;
/** Content addressing (CIDv1 over BLAKE3) and DAG-CBOR block encoding. */
pub mod linked_data;
/** The block store collaborator trait and its in-memory implementation. */
pub mod store;

pub mod prelude {
    pub use crate::crypto::{ContentKey, ForestLabel, NameAccumulator, RatchetChain, SegmentSecret};
    pub use crate::forest::{ForestDifference, PrivateForest};
    pub use crate::fs::{
        FsError, Metadata, PrivateDirectory, PrivateFile, PrivateLink, PrivateNode,
        PrivateOpResult,
    };
    pub use crate::linked_data::{BlockEncoded, DagCborCodec, Link};
    pub use crate::store::{BlockStore, BlockStoreError, MemoryBlockStore};
}
