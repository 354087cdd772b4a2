use std::fs;
use std::path::Path;

use docqa_core::{Chunk, Error, Metadata, Metric};
use docqa_index::{build, exists, load, persist, read_info, search, IndexHandle, DOCSTORE_FILE, SCHEMA_VERSION};
use serde_json::json;
use tempfile::TempDir;

fn sample() -> IndexHandle {
    let mut meta = Metadata::new();
    meta.insert("source".into(), json!("fruit.json"));
    meta.insert("page".into(), json!(2));
    build(
        "all-MiniLM-L6-v2",
        Metric::Cosine,
        vec![
            (vec![1.0, 0.0, 0.0], Chunk::new("apple", meta.clone())),
            (vec![0.0, 1.0, 0.0], Chunk::new("banana", meta)),
            (vec![0.0, 0.0, 1.0], Chunk::with_source("car", "cars.txt")),
        ],
    )
    .unwrap()
}

fn vector_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok()?.file_name().into_string().ok())
        .filter(|n| n.starts_with("vectors-"))
        .collect();
    names.sort();
    names
}

#[test]
fn persist_then_load_is_equivalent() {
    let tmp = TempDir::new().unwrap();
    let location = tmp.path().join("doc_index");
    let index = sample();

    assert!(!exists(&location));
    let info = persist(&index, &location).unwrap();
    assert!(exists(&location));
    assert_eq!(info.schema_version, SCHEMA_VERSION);
    assert_eq!(info.generation, 1);
    assert_eq!((info.dim, info.count), (3, 3));

    let loaded = load(&location).unwrap();
    assert_eq!(loaded, index);
    assert_eq!(loaded.model_id(), "all-MiniLM-L6-v2");
    assert_eq!(loaded.metric(), Metric::Cosine);

    for q in [[0.9f32, 0.1, 0.0], [0.0, 0.2, 0.8]] {
        assert_eq!(search(&loaded, &q, 3).unwrap(), search(&index, &q, 3).unwrap());
    }
}

#[test]
fn docstore_is_readable_json() {
    let tmp = TempDir::new().unwrap();
    persist(&sample(), tmp.path()).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(tmp.path().join(DOCSTORE_FILE)).unwrap()).unwrap();
    assert_eq!(raw["header"]["model_id"], json!("all-MiniLM-L6-v2"));
    assert_eq!(raw["header"]["metric"], json!("cosine"));
    assert_eq!(raw["chunks"][0], json!({"page_content": "apple", "metadata": {"source": "fruit.json", "page": 2}}));
}

#[test]
fn repersist_keeps_one_previous_generation() {
    let tmp = TempDir::new().unwrap();
    let index = sample();
    for _ in 0..3 {
        persist(&index, tmp.path()).unwrap();
    }
    assert_eq!(vector_files(tmp.path()), vec!["vectors-2.bin", "vectors-3.bin"]);
    assert_eq!(read_info(tmp.path()).unwrap().generation, 3);
    assert_eq!(load(tmp.path()).unwrap(), index);
}

#[test]
fn missing_location_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let location = tmp.path().join("nope");
    assert!(matches!(load(&location), Err(Error::IndexNotFound(p)) if p == location));

    fs::create_dir_all(&location).unwrap();
    assert!(matches!(load(&location), Err(Error::IndexNotFound(_))));
}

#[test]
fn missing_vector_file_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    let info = persist(&sample(), tmp.path()).unwrap();
    fs::remove_file(tmp.path().join(&info.vector_file)).unwrap();
    assert!(matches!(load(tmp.path()), Err(Error::IndexCorrupt { .. })));
}

#[test]
fn tampered_vector_file_fails_checksum() {
    let tmp = TempDir::new().unwrap();
    let info = persist(&sample(), tmp.path()).unwrap();
    let path = tmp.path().join(&info.vector_file);
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    match load(tmp.path()) {
        Err(Error::IndexCorrupt { reason, .. }) => assert!(reason.contains("checksum"), "{reason}"),
        other => panic!("expected IndexCorrupt, got {other:?}"),
    }
}

#[test]
fn garbage_docstore_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    persist(&sample(), tmp.path()).unwrap();
    fs::write(tmp.path().join(DOCSTORE_FILE), "{ this is not json").unwrap();
    assert!(matches!(load(tmp.path()), Err(Error::IndexCorrupt { .. })));
}

#[test]
fn header_disagreements_are_corrupt() {
    let tmp = TempDir::new().unwrap();
    persist(&sample(), tmp.path()).unwrap();
    let path = tmp.path().join(DOCSTORE_FILE);
    let original: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

    let edits: [(&str, serde_json::Value); 4] = [
        ("schema_version", json!(99)),
        ("count", json!(2)),
        ("dim", json!(4)),
        ("vector_file", json!("../elsewhere.bin")),
    ];
    for (field, value) in edits {
        let mut doc = original.clone();
        doc["header"][field] = value;
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
        assert!(matches!(load(tmp.path()), Err(Error::IndexCorrupt { .. })), "editing {field} must be detected");
    }
}

#[test]
fn zero_dimension_or_blank_chunks_are_corrupt() {
    let tmp = TempDir::new().unwrap();
    persist(&sample(), tmp.path()).unwrap();
    let path = tmp.path().join(DOCSTORE_FILE);
    let original: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

    let mut doc = original.clone();
    doc["header"]["dim"] = json!(0);
    fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
    match load(tmp.path()) {
        Err(Error::IndexCorrupt { reason, .. }) => assert!(reason.contains("dimension"), "{reason}"),
        other => panic!("expected IndexCorrupt, got {other:?}"),
    }

    let mut doc = original;
    doc["chunks"][1]["page_content"] = json!("");
    fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
    match load(tmp.path()) {
        Err(Error::IndexCorrupt { reason, .. }) => assert!(reason.contains("chunk 1"), "{reason}"),
        other => panic!("expected IndexCorrupt, got {other:?}"),
    }
}
