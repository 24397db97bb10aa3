// tests/store.rs

use std::fs;

use manuallabour::errors::ManualError;
use manuallabour::store::blobs::{BLOB_ID_LEN, collect_matching_files};
use manuallabour::store::{BlobPatterns, LocalMemoryStore, Store, compute_file_hash, import_blobs};
use manuallabour_test_utils::builders::{ObjectBuilder, StepBuilder};
use manuallabour_test_utils::init_tracing;
use tempfile::tempdir;

#[test]
fn objects_and_steps_are_stored_by_id() {
    init_tracing();
    let mut store = LocalMemoryStore::new();

    store.add_obj(ObjectBuilder::new("ta", "Tool A").build()).unwrap();
    store.add_step(StepBuilder::new("a", "First").build()).unwrap();

    assert!(store.has_obj("ta"));
    assert!(!store.has_obj("tb"));
    assert_eq!(store.get_obj("ta").unwrap().name(), "Tool A");
    assert_eq!(store.get_step("a").unwrap().title(), "First");
    assert_eq!(store.iter_step().map(|(id, _)| id).collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn duplicate_inserts_are_rejected_and_keep_the_original() {
    let mut store = LocalMemoryStore::new();
    store.add_obj(ObjectBuilder::new("ta", "Tool A").build()).unwrap();

    match store.add_obj(ObjectBuilder::new("ta", "Other").build()) {
        Err(ManualError::DuplicateId { kind, container, id }) => {
            assert_eq!(kind, "object");
            assert_eq!(container, "store");
            assert_eq!(id, "ta");
        }
        other => panic!("expected DuplicateId, got {:?}", other),
    }
    assert_eq!(store.get_obj("ta").unwrap().name(), "Tool A");

    store.add_blob("imb", "foo.png").unwrap();
    assert!(matches!(
        store.add_blob("imb", "bar.png"),
        Err(ManualError::DuplicateId { kind: "blob", .. })
    ));

    store.add_step(StepBuilder::new("a", "First").build()).unwrap();
    assert!(matches!(
        store.add_step(StepBuilder::new("a", "Again").build()),
        Err(ManualError::DuplicateId { kind: "step", .. })
    ));
}

#[test]
fn unknown_ids_are_not_found() {
    let store = LocalMemoryStore::new();
    assert!(matches!(
        store.get_obj("nope"),
        Err(ManualError::NotFound { kind: "object", .. })
    ));
    assert!(matches!(
        store.get_step("nope"),
        Err(ManualError::NotFound { kind: "step", .. })
    ));
    assert!(matches!(
        store.get_blob_url("nope"),
        Err(ManualError::NotFound { kind: "blob", .. })
    ));
}

#[test]
fn blob_urls_point_to_absolute_paths() {
    let mut store = LocalMemoryStore::new();
    store.add_blob("imb", "img/foo.png").unwrap();

    let url = store.get_blob_url("imb").unwrap();
    let path = url.strip_prefix("file://").expect("file url");
    assert!(std::path::Path::new(path).is_absolute());
    assert!(path.ends_with("foo.png"));
    assert!(store.blob_path("imb").unwrap().is_absolute());

    assert!(matches!(
        store.add_blob("bad id", "x.png"),
        Err(ManualError::InvalidIdentifier { .. })
    ));
}

#[test]
fn import_registers_matching_files_once_per_content() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("img/sub")).unwrap();
    fs::write(root.join("img/a.png"), b"png-a").unwrap();
    fs::write(root.join("img/sub/copy.png"), b"png-a").unwrap();
    fs::write(root.join("img/b.png"), b"png-b").unwrap();
    fs::write(root.join("img/b.tmp.png"), b"scratch").unwrap();
    fs::write(root.join("notes.txt"), b"not an image").unwrap();

    let patterns = BlobPatterns::new(["img/**/*.png"]).exclude(["**/*.tmp.png"]);

    let files = collect_matching_files(root, &patterns).unwrap();
    assert_eq!(files.len(), 3);

    let mut store = LocalMemoryStore::new();
    let imported = import_blobs(&mut store, root, &patterns).unwrap();
    assert_eq!(imported.len(), 3);

    // a.png and sub/copy.png share their content
    let ids: std::collections::BTreeSet<_> = imported.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(store.iter_blob().count(), 2);
    for id in &ids {
        assert_eq!(id.len(), BLOB_ID_LEN);
        assert!(store.has_blob(id));
    }

    // importing again does not fail
    let again = import_blobs(&mut store, root, &patterns).unwrap();
    assert_eq!(again.len(), 3);
    assert_eq!(store.iter_blob().count(), 2);
}

#[test]
fn file_hash_depends_on_content_only() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let c = dir.path().join("c.bin");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();
    fs::write(&c, b"different").unwrap();

    let ha = compute_file_hash(&a).unwrap();
    assert_eq!(ha.len(), 64);
    assert_eq!(ha, compute_file_hash(&b).unwrap());
    assert_ne!(ha, compute_file_hash(&c).unwrap());

    assert!(compute_file_hash(&dir.path().join("missing")).is_err());
}

#[test]
fn store_is_usable_as_trait_object() {
    let mut store = LocalMemoryStore::new();
    store.add_obj(ObjectBuilder::new("ta", "Tool A").build()).unwrap();

    let dyn_store: &dyn Store = &store;
    assert_eq!(dyn_store.iter_obj().count(), 1);
}
