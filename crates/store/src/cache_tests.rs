// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn append_accumulates_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultCache::new(dir.path().join("council-cache.json"));

    cache.append(&json!({"goal": "first"})).unwrap();
    cache.append(&json!({"goal": "second"})).unwrap();

    let entries = cache.read_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["goal"], "first");
    assert_eq!(entries[1]["goal"], "second");
}

#[test]
fn missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultCache::new(dir.path().join("none.json"));
    assert!(cache.read_all().unwrap().is_empty());
}

#[test]
fn corrupt_file_reads_empty_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("council-cache.json");
    std::fs::write(&path, "{ not json").unwrap();

    let cache = ResultCache::new(&path);
    assert!(cache.read_all().unwrap().is_empty());
    cache.append(&json!({"ok": true})).unwrap();
    assert_eq!(cache.read_all().unwrap().len(), 1);
}

#[test]
fn no_temp_file_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResultCache::new(dir.path().join("cache.json"));
    cache.append(&json!(1)).unwrap();
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
        .collect();
    assert!(leftovers.is_empty());
}
