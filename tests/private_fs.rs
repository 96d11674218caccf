//! End-to-end tests over the public surface: a root directory, a forest,
//! an in-memory block store, and a deterministic RNG.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use thicket::prelude::*;

fn setup(seed: u64) -> (PrivateDirectory, PrivateForest, MemoryBlockStore, StdRng) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let mut rng = StdRng::seed_from_u64(seed);
    let root = PrivateDirectory::new(&NameAccumulator::empty(), Utc::now(), &mut rng);
    (root, PrivateForest::new(), MemoryBlockStore::new(), rng)
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn lookup_node_can_fetch_file_added_to_directory() {
    let (root, forest, store, mut rng) = setup(1);

    let written = root
        .write(
            &path(&["text.txt"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let node = written
        .root_dir
        .lookup_node("text.txt", true, &written.forest, &store)
        .await
        .unwrap();

    assert!(matches!(node, Some(PrivateNode::File(_))));
}

#[tokio::test]
async fn lookup_node_cannot_fetch_file_not_added_to_directory() {
    let (root, forest, store, _rng) = setup(2);

    let node = root
        .lookup_node("unknown", true, &forest, &store)
        .await
        .unwrap();

    assert!(node.is_none());
}

#[tokio::test]
async fn mkdir_creates_nested_directories() {
    let (root, forest, store, mut rng) = setup(3);

    let made = root
        .mkdir(
            &path(&["pictures", "cats"]),
            true,
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let written = made
        .root_dir
        .write(
            &path(&["pictures", "cats", "tabby.png"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &made.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let resolved = written
        .root_dir
        .get_node(
            &path(&["pictures", "cats", "tabby.png"]),
            true,
            &written.forest,
            &store,
        )
        .await
        .unwrap();

    assert!(matches!(resolved.result, Some(PrivateNode::File(_))));
}

#[tokio::test]
async fn get_node_returns_none_for_missing_paths() {
    let (root, forest, store, mut rng) = setup(4);

    let made = root
        .mkdir(
            &path(&["pictures"]),
            true,
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let resolved = made
        .root_dir
        .get_node(&path(&["pictures", "missing"]), true, &made.forest, &store)
        .await
        .unwrap();

    assert!(resolved.result.is_none());
}

#[tokio::test]
async fn ls_lists_children_sorted_by_name() {
    let (root, forest, store, mut rng) = setup(5);

    let made = root
        .mkdir(
            &path(&["pictures", "dogs"]),
            true,
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let written = made
        .root_dir
        .write(
            &path(&["pictures", "cats", "tabby.png"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &made.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let listing = written
        .root_dir
        .ls(&path(&["pictures"]), true, &written.forest, &store)
        .await
        .unwrap();

    let names: Vec<_> = listing.result.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["cats", "dogs"]);
}

#[tokio::test]
async fn rm_removes_children_from_directory() {
    let (root, forest, store, mut rng) = setup(6);

    let a = root
        .write(
            &path(&["pictures", "dogs", "billie.jpeg"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let b = a
        .root_dir
        .write(
            &path(&["pictures", "cats", "tabby.png"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &a.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let removed = b
        .root_dir
        .rm(&path(&["pictures", "cats"]), true, &b.forest, &store)
        .await
        .unwrap();

    let listing = removed
        .root_dir
        .ls(&path(&["pictures"]), true, &removed.forest, &store)
        .await
        .unwrap();

    let names: Vec<_> = listing.result.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["dogs"]);

    let err = removed
        .root_dir
        .rm(&path(&["pictures", "cats"]), true, &removed.forest, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
}

#[tokio::test]
async fn basic_mv_moves_content_between_directories() {
    let (root, forest, store, mut rng) = setup(7);

    let a = root
        .write(
            &path(&["pictures", "cats", "luna.jpeg"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let b = a
        .root_dir
        .mkdir(&path(&["images"]), true, Utc::now(), &a.forest, &store, &mut rng)
        .await
        .unwrap();

    let moved = b
        .root_dir
        .basic_mv(
            &path(&["pictures", "cats"]),
            &path(&["images", "cats"]),
            true,
            Utc::now(),
            &b.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let images = moved
        .root_dir
        .ls(&path(&["images"]), true, &moved.forest, &store)
        .await
        .unwrap();
    let pictures = moved
        .root_dir
        .ls(&path(&["pictures"]), true, &moved.forest, &store)
        .await
        .unwrap();

    assert_eq!(images.result.len(), 1);
    assert_eq!(images.result[0].0, "cats");
    assert!(pictures.result.is_empty());

    // content is byte-identical through the new path
    let content = moved
        .root_dir
        .read(
            &path(&["images", "cats", "luna.jpeg"]),
            true,
            &moved.forest,
            &store,
        )
        .await
        .unwrap();
    assert_eq!(content.result, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn basic_mv_rejects_occupied_destination() {
    let (root, forest, store, mut rng) = setup(8);

    let a = root
        .write(
            &path(&["a.txt"]),
            true,
            b"a".to_vec(),
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let b = a
        .root_dir
        .write(
            &path(&["b.txt"]),
            true,
            b"b".to_vec(),
            Utc::now(),
            &a.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let err = b
        .root_dir
        .basic_mv(
            &path(&["a.txt"]),
            &path(&["b.txt"]),
            true,
            Utc::now(),
            &b.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FsError::AlreadyExists(_)));
}

#[tokio::test]
async fn cp_copies_content_between_directories() {
    let (root, forest, store, mut rng) = setup(9);

    let a = root
        .write(
            &path(&["pictures", "cats", "luna.jpeg"]),
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let b = a
        .root_dir
        .mkdir(&path(&["images"]), true, Utc::now(), &a.forest, &store, &mut rng)
        .await
        .unwrap();

    let copied = b
        .root_dir
        .cp(
            &path(&["pictures", "cats"]),
            &path(&["images", "cats"]),
            true,
            Utc::now(),
            &b.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let images = copied
        .root_dir
        .ls(&path(&["images"]), true, &copied.forest, &store)
        .await
        .unwrap();
    let pictures = copied
        .root_dir
        .ls(&path(&["pictures"]), true, &copied.forest, &store)
        .await
        .unwrap();

    assert_eq!(images.result.len(), 1);
    assert_eq!(images.result[0].0, "cats");
    assert_eq!(pictures.result.len(), 1);
    assert_eq!(pictures.result[0].0, "cats");
}

#[tokio::test]
async fn cp_pinned_reads_keep_the_copied_snapshot() {
    let (root, forest, store, mut rng) = setup(10);

    let a = root
        .write(
            &path(&["pictures", "cats", "luna.jpeg"]),
            true,
            vec![1, 2, 3],
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let copied = a
        .root_dir
        .cp(
            &path(&["pictures", "cats"]),
            &path(&["backup"]),
            true,
            Utc::now(),
            &a.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    // mutate through the original path
    let mutated = copied
        .root_dir
        .write(
            &path(&["pictures", "cats", "new.txt"]),
            true,
            b"later".to_vec(),
            Utc::now(),
            &copied.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    // pinned resolution through the copy still sees the snapshot
    let pinned = mutated
        .root_dir
        .ls(&path(&["backup"]), false, &mutated.forest, &store)
        .await
        .unwrap();
    let names: Vec<_> = pinned.result.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["luna.jpeg"]);

    // latest-search through the copy converges on the shared history
    let latest = mutated
        .root_dir
        .ls(&path(&["backup"]), true, &mutated.forest, &store)
        .await
        .unwrap();
    let names: Vec<_> = latest.result.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["luna.jpeg", "new.txt"]);
}

#[tokio::test]
async fn search_latest_follows_a_node_forward() {
    let (root, forest, store, mut rng) = setup(11);
    let file_path = path(&["doc.txt"]);

    let first = root
        .write(
            &file_path,
            true,
            b"v1".to_vec(),
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let old_node = first
        .root_dir
        .lookup_node("doc.txt", false, &first.forest, &store)
        .await
        .unwrap()
        .unwrap();

    let second = first
        .root_dir
        .write(
            &file_path,
            true,
            b"v2".to_vec(),
            Utc::now(),
            &first.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let latest = old_node.search_latest(&second.forest, &store).await.unwrap();
    let file = latest.as_file().unwrap().clone();
    assert_eq!(file.get_content(&store).await.unwrap(), b"v2");

    // the stale node still reads its own pinned revision
    let stale = old_node.as_file().unwrap().clone();
    assert_eq!(stale.get_content(&store).await.unwrap(), b"v1");
}

#[tokio::test]
async fn concurrent_revisions_merge_and_resolve_deterministically() {
    let (root, forest, store, mut rng) = setup(12);
    let file_path = path(&["shared.txt"]);

    let base = root
        .write(
            &file_path,
            true,
            b"base".to_vec(),
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    // two writers advance the same file from the same base
    let alice = base
        .root_dir
        .write(
            &file_path,
            true,
            b"alice".to_vec(),
            Utc::now(),
            &base.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();
    let bob = base
        .root_dir
        .write(
            &file_path,
            true,
            b"bob".to_vec(),
            Utc::now(),
            &base.forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let merged = alice.forest.merge(&bob.forest);

    // merge laws hold
    assert_eq!(merged, bob.forest.merge(&alice.forest));
    assert_eq!(merged.merge(&merged), merged);

    // resolution through the merged forest is deterministic
    let once = base
        .root_dir
        .read(&file_path, true, &merged, &store)
        .await
        .unwrap();
    let twice = base
        .root_dir
        .read(&file_path, true, &merged, &store)
        .await
        .unwrap();

    assert_eq!(once.result, twice.result);
    assert!(once.result == b"alice" || once.result == b"bob");
}

#[tokio::test]
async fn private_file_with_content_roundtrip() {
    let mut rng = StdRng::seed_from_u64(13);
    let store = MemoryBlockStore::new();
    let forest = PrivateForest::new();

    let (file, forest) = PrivateFile::with_content(
        &NameAccumulator::empty(),
        Utc::now(),
        vec![1, 2, 3, 4, 5],
        &forest,
        &store,
        &mut rng,
    )
    .await
    .unwrap();

    assert!(!file.get_id().is_empty());
    assert!(!forest.is_empty());
    assert_eq!(file.get_content(&store).await.unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn nodes_carry_creation_metadata() {
    let mut rng = StdRng::seed_from_u64(14);
    let time = Utc::now();

    let dir = PrivateDirectory::new(&NameAccumulator::empty(), time, &mut rng);
    let file = PrivateFile::new(&NameAccumulator::empty(), time, &mut rng);

    assert_eq!(dir.metadata().created(), time);
    assert_eq!(file.metadata().created(), time);
}

#[tokio::test]
async fn independently_created_roots_do_not_collide() {
    let mut rng = StdRng::seed_from_u64(15);
    let time = Utc::now();

    let mut ids = std::collections::BTreeSet::new();
    for _ in 0..50 {
        let root = PrivateDirectory::new(&NameAccumulator::empty(), time, &mut rng);
        ids.insert(root.get_id());
    }

    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn stored_blocks_reveal_no_plaintext() {
    let (root, forest, store, mut rng) = setup(16);
    let secret = b"very identifiable secret payload".to_vec();

    let written = root
        .write(
            &path(&["dir", "secret.txt"]),
            true,
            secret.clone(),
            Utc::now(),
            &forest,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    for (_, links) in written.forest.entries() {
        for link in links {
            let block = store.get_block(link).await.unwrap();
            assert!(!block
                .windows(secret.len())
                .any(|window| window == secret.as_slice()));
            assert!(!block.windows(3).any(|window| window == b"dir"));
        }
    }
}
