//! End-to-end behavior of the index facade against real files.

use srcdex::error::IndexError;
use srcdex::index::format::{FORMAT_VERSION, HEADER_LEN};
use srcdex::index::merge::temp_path;
use srcdex::index::{DurableIndexReader, Index, IndexConfig, MergeState, WriteSession};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn index_path(dir: &TempDir) -> PathBuf {
    dir.path().join("index.sdx")
}

fn open(dir: &TempDir) -> Index {
    Index::open(index_path(dir), IndexConfig::default()).unwrap()
}

fn add(index: &mut Index, path: &str, terms: &[&str]) {
    index
        .add_document(path, &|s: &mut WriteSession<'_>| -> srcdex::Result<()> {
            for term in terms {
                s.add_ref(term);
            }
            Ok(())
        })
        .unwrap();
}

/// `path` includes every name in `includes`
fn add_with_includes(index: &mut Index, path: &str, includes: &[&str]) {
    index
        .add_document(path, &|s: &mut WriteSession<'_>| -> srcdex::Result<()> {
            for name in includes {
                s.add_include_ref(name);
                s.add_relatives(name, path);
            }
            Ok(())
        })
        .unwrap();
}

fn hits(index: &Index, term: &str) -> Vec<String> {
    let mut paths: Vec<_> = index
        .query(term)
        .unwrap()
        .into_iter()
        .map(|h| h.path)
        .collect();
    paths.sort();
    paths
}

#[test]
fn repeated_refs_are_stored_once() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["foo", "foo", "bar", "foo"]);
    index.save().unwrap();

    assert_eq!(hits(&index, "foo"), vec!["a.c"]);
    let reader = DurableIndexReader::open(index.index_file()).unwrap();
    assert_eq!(reader.find_word("foo").unwrap().unwrap().refs, vec![1]);
}

#[test]
fn round_trip_through_durable_file() {
    let dir = TempDir::new().unwrap();
    {
        let mut index = open(&dir);
        add(&mut index, "a.c", &["foo", "bar"]);
        add(&mut index, "b.c", &["foo"]);
        index.save().unwrap();
    }

    let index = open(&dir);
    assert!(index.recovery().is_none());
    assert_eq!(hits(&index, "foo"), vec!["a.c", "b.c"]);
    assert_eq!(hits(&index, "bar"), vec!["a.c"]);

    let docs: Vec<_> = index
        .documents()
        .unwrap()
        .into_iter()
        .map(|d| (d.path, d.number))
        .collect();
    assert_eq!(docs, vec![("a.c".to_string(), 1), ("b.c".to_string(), 2)]);
    assert_eq!(index.num_words().unwrap(), 2);
}

#[test]
fn pending_changes_are_invisible_until_save() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["shared"]);
    add(&mut index, "b.c", &["shared"]);
    index.save().unwrap();

    add(&mut index, "c.c", &["shared"]);
    index.remove("a.c");
    assert_eq!(hits(&index, "shared"), vec!["a.c", "b.c"]);

    index.save().unwrap();
    assert_eq!(hits(&index, "shared"), vec!["b.c", "c.c"]);
}

#[test]
fn failed_merge_leaves_previous_generation_intact() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["foo"]);
    index.save().unwrap();

    let before_bytes = fs::read(index.index_file()).unwrap();
    let before_hits = hits(&index, "foo");

    add(&mut index, "b.c", &["foo"]);
    index.remove("a.c");
    // Block creation of the temporary file
    fs::create_dir(temp_path(index.index_file())).unwrap();

    let err = index.save().unwrap_err();
    assert!(matches!(err, IndexError::Merge(_)));
    assert_eq!(index.state(), MergeState::CanMerge);
    assert_eq!(fs::read(index.index_file()).unwrap(), before_bytes);
    assert_eq!(hits(&index, "foo"), before_hits);
}

#[test]
fn merge_renumbers_documents_contiguously() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["alpha", "common"]);
    add(&mut index, "b.c", &["beta", "common"]);
    add_with_includes(&mut index, "c.c", &["c.h"]);
    add(&mut index, "d.c", &["common"]);
    index.save().unwrap();

    index.remove("a.c");
    index.remove("b.c");
    index.save().unwrap();

    let docs: Vec<_> = index
        .documents()
        .unwrap()
        .into_iter()
        .map(|d| (d.path, d.number))
        .collect();
    assert_eq!(docs, vec![("c.c".to_string(), 1), ("d.c".to_string(), 2)]);

    // Postings only refer to numbers of the new generation
    let reader = DurableIndexReader::open(index.index_file()).unwrap();
    for word in reader.words() {
        let word = word.unwrap();
        assert!(word.refs.iter().all(|&n| n == 1 || n == 2), "{:?}", word);
    }
    assert!(reader.find_word("alpha").unwrap().is_none());
    assert_eq!(hits(&index, "common"), vec!["d.c"]);
    assert_eq!(index.file_dependencies("c.c").unwrap(), vec!["c.h"]);
}

#[test]
fn removal_then_re_add() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["foo"]);
    index.save().unwrap();

    index.remove("a.c");
    add(&mut index, "a.c", &["baz"]);
    index.save().unwrap();

    assert!(hits(&index, "foo").is_empty());
    assert_eq!(hits(&index, "baz"), vec!["a.c"]);
    assert_eq!(index.num_documents().unwrap(), 1);
}

fn add_failing(index: &mut Index, path: &str, partial: &str) {
    let result = index.add_document(path, &|s: &mut WriteSession<'_>| -> srcdex::Result<()> {
        s.add_ref(partial);
        Err(IndexError::invalid_operation("extraction aborted"))
    });
    assert!(result.is_err());
}

#[test]
fn failed_extraction_keeps_previous_version() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["foo", "keep"]);
    index.save().unwrap();

    add_failing(&mut index, "a.c", "partial");
    index.save().unwrap();

    assert_eq!(hits(&index, "foo"), vec!["a.c"]);
    assert_eq!(hits(&index, "keep"), vec!["a.c"]);
    assert!(hits(&index, "partial").is_empty());
    assert_eq!(index.num_documents().unwrap(), 1);
}

#[test]
fn failed_extraction_keeps_pending_working_version() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["old"]);
    index.save().unwrap();

    add(&mut index, "a.c", &["pending"]);
    add_failing(&mut index, "a.c", "partial");
    index.save().unwrap();

    assert!(hits(&index, "old").is_empty());
    assert_eq!(hits(&index, "pending"), vec!["a.c"]);
    assert!(hits(&index, "partial").is_empty());
    assert_eq!(index.num_documents().unwrap(), 1);
}

#[test]
fn re_add_after_failed_extraction_replaces_durable_copy() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["old"]);
    index.save().unwrap();

    add_failing(&mut index, "a.c", "partial");
    add(&mut index, "a.c", &["new"]);
    index.save().unwrap();

    assert!(hits(&index, "old").is_empty());
    assert!(hits(&index, "partial").is_empty());
    assert_eq!(hits(&index, "new"), vec!["a.c"]);
    assert_eq!(index.num_documents().unwrap(), 1);
}

#[test]
fn prefix_query_stops_at_boundary() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "1.c", &["foo"]);
    add(&mut index, "2.c", &["foobar"]);
    add(&mut index, "3.c", &["zzz"]);
    index.save().unwrap();

    let entries = index.query_prefix("foo", true).unwrap();
    let terms: Vec<_> = entries.iter().map(|e| e.term.as_str()).collect();
    assert_eq!(terms, vec!["foo", "foobar"]);
    assert_eq!(entries[1].paths().collect::<Vec<_>>(), vec!["2.c"]);
}

#[test]
fn pattern_queries_respect_case_flag() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["getUser", "GetUserName", "setUser", "get"]);
    index.save().unwrap();

    let terms = |pattern: &str, case_sensitive: bool| -> Vec<String> {
        index
            .query_pattern(pattern, case_sensitive)
            .unwrap()
            .into_iter()
            .map(|e| e.term)
            .collect()
    };

    assert_eq!(terms("get*", true), vec!["get", "getUser"]);
    assert_eq!(terms("get*", false), vec!["GetUserName", "get", "getUser"]);
    assert_eq!(terms("?etUser", true), vec!["getUser", "setUser"]);
    assert_eq!(terms("[gs]etUser", true), vec!["getUser", "setUser"]);

    let prefix: Vec<_> = index
        .query_prefix("GETUSER", false)
        .unwrap()
        .into_iter()
        .map(|e| e.term)
        .collect();
    assert_eq!(prefix, vec!["GetUserName", "getUser"]);
}

#[test]
fn include_dependencies_follow_merges() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add_with_includes(&mut index, "main.c", &["util.h", "io.h"]);
    add_with_includes(&mut index, "util.c", &["util.h"]);
    index.save().unwrap();

    let includers: Vec<_> = index.query_includes("util.h").unwrap()[0]
        .paths()
        .map(str::to_string)
        .collect();
    assert_eq!(includers, vec!["main.c", "util.c"]);
    assert_eq!(index.file_dependencies("main.c").unwrap(), vec!["io.h", "util.h"]);
    assert_eq!(index.file_dependencies("util.h").unwrap(), vec!["main.c", "util.c"]);

    let names: Vec<_> = index
        .query_include_prefix("u")
        .unwrap()
        .into_iter()
        .map(|e| e.term)
        .collect();
    assert_eq!(names, vec!["util.c", "util.h"]);

    index.remove("util.c");
    index.save().unwrap();
    assert_eq!(index.file_dependencies("util.h").unwrap(), vec!["main.c"]);
    assert_eq!(index.file_dependencies("main.c").unwrap(), vec!["io.h", "util.h"]);
    assert!(index.query_includes("util.c").unwrap().is_empty());
}

#[test]
fn missing_terms_and_paths_are_empty() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["foo"]);
    index.save().unwrap();

    assert!(index.query("nope").unwrap().is_empty());
    assert!(index.query_prefix("zz", true).unwrap().is_empty());
    assert!(index.query_includes("none.h").unwrap().is_empty());
    assert!(index.file_dependencies("ghost.c").unwrap().is_empty());
}

#[test]
fn corrupt_body_triggers_recovery_event() {
    let dir = TempDir::new().unwrap();
    {
        let mut index = open(&dir);
        add(&mut index, "a.c", &["foo"]);
        index.save().unwrap();
    }

    let path = index_path(&dir);
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let mut index = open(&dir);
    let event = index.recovery().expect("recovery event");
    assert!(event.reason.contains("checksum"));
    assert_eq!(index.num_documents().unwrap(), 0);

    // The reset index is usable
    add(&mut index, "b.c", &["bar"]);
    index.save().unwrap();
    assert_eq!(hits(&index, "bar"), vec!["b.c"]);
}

#[test]
fn unknown_format_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    {
        let mut index = open(&dir);
        add(&mut index, "a.c", &["foo"]);
        index.save().unwrap();
    }

    let path = index_path(&dir);
    let mut bytes = fs::read(&path).unwrap();
    assert!(bytes.len() >= HEADER_LEN);
    bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let strict = IndexConfig {
        recover_corrupt: false,
        ..IndexConfig::default()
    };
    match Index::open(&path, strict) {
        Err(IndexError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, FORMAT_VERSION + 1);
            assert_eq!(expected, FORMAT_VERSION);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("opened an index with an unknown version"),
    }

    let index = Index::open(&path, IndexConfig::default()).unwrap();
    assert!(index.recovery().unwrap().reason.contains("version"));
}

#[cfg(unix)]
#[test]
fn open_reader_keeps_its_snapshot_across_merge() {
    let dir = TempDir::new().unwrap();
    let mut index = open(&dir);
    add(&mut index, "a.c", &["foo"]);
    index.save().unwrap();

    let snapshot = DurableIndexReader::open(index.index_file()).unwrap();

    index.remove("a.c");
    add(&mut index, "b.c", &["bar"]);
    index.save().unwrap();

    assert_eq!(snapshot.find_word("foo").unwrap().unwrap().refs, vec![1]);
    assert!(snapshot.find_word("bar").unwrap().is_none());
    assert_eq!(hits(&index, "bar"), vec!["b.c"]);
}

#[test]
fn config_json_falls_back_to_defaults() {
    let config: IndexConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, IndexConfig::default());

    let config: IndexConfig =
        serde_json::from_str(r#"{"recover_corrupt": false, "sync_on_merge": false}"#).unwrap();
    assert!(!config.recover_corrupt);
    assert!(!config.sync_on_merge);
    assert_eq!(config.max_footprint, IndexConfig::default().max_footprint);
}
