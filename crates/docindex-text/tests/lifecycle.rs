mod common;

use docindex_core::types::{DocumentValueMap, FieldKind, FieldValue, IndexSchema, INDEXED, STORED, TOKENIZED};
use docindex_core::Error;
use docindex_text::{search, AnalyzerConfig, IndexHandle, Location, OpenMode, SearchRequest};
use tempfile::TempDir;

fn count(handle: &IndexHandle, q: &str) -> u64 {
    let reader = handle.open_reader().unwrap();
    search(reader.as_ref(), &SearchRequest::new(q, "title"), &AnalyzerConfig::default()).unwrap().total_hits
}

#[test]
fn append_on_missing_location_fails_but_create_or_append_succeeds() {
    let tmp = TempDir::new().unwrap();
    let handle = IndexHandle::open(Location::Path(tmp.path().join("idx"))).unwrap();
    let schema = common::article_schema();

    let err = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Append).unwrap_err();
    assert!(matches!(err, Error::Resource(_)), "{err}");

    let writer = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::CreateOrAppend).unwrap();
    writer.close().unwrap();
    let reader = handle.open_reader().unwrap().expect("empty index exists");
    assert_eq!(reader.num_docs(), 0);
}

#[test]
fn append_adds_to_existing_documents() {
    let handle = common::index_with(&[common::article("alpha", "a", 2000)]);
    let mut writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Append).unwrap();
    writer.add_document(&common::article("alpha again", "b", 2001)).unwrap();
    writer.close().unwrap();
    assert_eq!(count(&handle, "alpha"), 2);

    let mut writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::CreateOrAppend).unwrap();
    writer.add_document(&common::article("alpha third", "c", 2002)).unwrap();
    writer.close().unwrap();
    assert_eq!(count(&handle, "alpha"), 3);
}

#[test]
fn create_discards_existing_content() {
    let handle = common::index_with(&[common::article("alpha", "a", 2000)]);
    let writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Create).unwrap();
    writer.close().unwrap();
    assert_eq!(handle.open_reader().unwrap().unwrap().num_docs(), 0);
}

#[test]
fn create_discards_existing_content_on_disk() {
    let tmp = TempDir::new().unwrap();
    let handle = IndexHandle::open(Location::Path(tmp.path().to_path_buf())).unwrap();
    let schema = common::article_schema();
    let mut writer = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).unwrap();
    writer.add_document(&common::article("alpha", "a", 2000)).unwrap();
    writer.close().unwrap();
    assert_eq!(count(&handle, "alpha"), 1);

    handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).unwrap().close().unwrap();
    assert_eq!(count(&handle, "alpha"), 0);
}

#[test]
fn only_one_writer_per_handle() {
    let handle = IndexHandle::in_memory();
    let schema = common::article_schema();
    let first = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).unwrap();

    let clone = handle.clone();
    let err = clone.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::CreateOrAppend).unwrap_err();
    assert!(matches!(err, Error::Resource(_)), "{err}");

    first.close().unwrap();
    let again = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Append);
    assert!(again.is_ok(), "writer slot is released on close");
}

#[test]
fn writer_slot_released_when_open_fails() {
    let handle = IndexHandle::in_memory();
    let schema = common::article_schema();
    assert!(handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Append).is_err());
    assert!(handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).is_ok());
}

#[test]
fn reader_absent_until_an_index_exists() {
    let tmp = TempDir::new().unwrap();
    let existing_empty_dir = IndexHandle::open(Location::Path(tmp.path().to_path_buf())).unwrap();
    assert!(existing_empty_dir.open_reader().unwrap().is_none());

    let missing_dir = IndexHandle::open(Location::Path(tmp.path().join("nope"))).unwrap();
    assert!(missing_dir.open_reader().unwrap().is_none());

    assert!(IndexHandle::in_memory().open_reader().unwrap().is_none());
}

#[test]
fn file_location_is_a_resource_error() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("plain.txt");
    std::fs::write(&file, "not an index").unwrap();
    assert!(matches!(IndexHandle::open(Location::Path(file)), Err(Error::Resource(_))));
}

#[test]
fn readers_are_point_in_time_snapshots() {
    let handle = common::index_with(&[common::article("alpha", "a", 2000)]);
    let before = handle.open_reader().unwrap().unwrap();

    let mut writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Append).unwrap();
    writer.add_document(&common::article("alpha two", "b", 2001)).unwrap();
    let during = handle.open_reader().unwrap().unwrap();
    writer.close().unwrap();
    let after = handle.open_reader().unwrap().unwrap();

    assert_eq!(before.num_docs(), 1);
    assert_eq!(during.num_docs(), 1, "uncommitted documents are invisible");
    assert_eq!(after.num_docs(), 2);
    assert_eq!(before.num_docs(), 1, "old snapshot unchanged after commit");
}

#[test]
fn dropping_a_writer_commits() {
    let handle = IndexHandle::in_memory();
    {
        let mut writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Create).unwrap();
        writer.add_document(&common::article("alpha", "a", 2000)).unwrap();
        assert_eq!(writer.pending(), 1);
    }
    assert_eq!(count(&handle, "alpha"), 1);
    assert!(handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Append).is_ok());
}

#[test]
fn intermediate_commit_and_delete_all() {
    let handle = IndexHandle::in_memory();
    let mut writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Create).unwrap();
    writer.add_document(&common::article("alpha", "a", 2000)).unwrap();
    writer.commit().unwrap();
    assert_eq!(writer.pending(), 0);
    assert_eq!(handle.open_reader().unwrap().unwrap().num_docs(), 1);

    writer.delete_all().unwrap();
    writer.close().unwrap();
    assert_eq!(handle.open_reader().unwrap().unwrap().num_docs(), 0);
}

#[test]
fn narrow_kinds_survive_reopen_from_disk() {
    let tmp = TempDir::new().unwrap();
    let schema = IndexSchema::builder()
        .field("title", FieldKind::Text, INDEXED | STORED | TOKENIZED).unwrap()
        .field("pages", FieldKind::Int32, INDEXED | STORED).unwrap()
        .field("rating", FieldKind::Float32, STORED).unwrap()
        .build()
        .unwrap();
    {
        let handle = IndexHandle::open(Location::Path(tmp.path().to_path_buf())).unwrap();
        let mut writer = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).unwrap();
        let mut doc = DocumentValueMap::new();
        doc.insert("title".into(), FieldValue::from("alpha"));
        doc.insert("pages".into(), FieldValue::Int32(312));
        doc.insert("rating".into(), FieldValue::Float32(4.5));
        writer.add_document(&doc).unwrap();
        writer.close().unwrap();
    }

    let handle = IndexHandle::open(Location::Path(tmp.path().to_path_buf())).unwrap();
    let reader = handle.open_reader().unwrap().unwrap();
    assert_eq!(reader.schema(), &schema);
    let result = search(Some(&reader), &SearchRequest::new("alpha", "title"), &AnalyzerConfig::default()).unwrap();
    let fields = &result.documents[0].fields;
    assert_eq!(fields["pages"], FieldValue::Int32(312));
    assert_eq!(fields["rating"], FieldValue::Float32(4.5));

    // appending keeps the stored schema, whatever the caller passes
    let writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Append).unwrap();
    assert_eq!(writer.schema(), &schema);
}

#[test]
fn concurrent_readers_share_a_snapshot() {
    let docs: Vec<_> = (0..50).map(|i| common::article(&format!("alpha doc {i}"), &format!("s{i}"), 2000 + i)).collect();
    let handle = common::index_with(&docs);
    let reader = handle.open_reader().unwrap().unwrap();

    std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let reader = reader.clone();
                s.spawn(move || {
                    search(Some(&reader), &SearchRequest::new("alpha", "title").limit(5), &AnalyzerConfig::default())
                        .unwrap()
                        .total_hits
                })
            })
            .collect();
        for w in workers {
            assert_eq!(w.join().unwrap(), 50);
        }
    });
}

#[test]
fn create_keeps_files_the_index_does_not_own() {
    let tmp = TempDir::new().unwrap();
    let handle = IndexHandle::open(Location::Path(tmp.path().to_path_buf())).unwrap();
    let schema = common::article_schema();
    let mut writer = handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).unwrap();
    writer.add_document(&common::article("alpha", "a", 2000)).unwrap();
    writer.close().unwrap();

    let notes = tmp.path().join("notes.txt");
    std::fs::write(&notes, "keep me").unwrap();
    handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::Create).unwrap().close().unwrap();

    assert_eq!(std::fs::read_to_string(&notes).unwrap(), "keep me");
    assert_eq!(count(&handle, "alpha"), 0);
}

#[test]
fn refuses_to_create_in_a_foreign_directory() {
    let tmp = TempDir::new().unwrap();
    let notes = tmp.path().join("notes.txt");
    std::fs::write(&notes, "keep me").unwrap();
    let handle = IndexHandle::open(Location::Path(tmp.path().to_path_buf())).unwrap();
    let schema = common::article_schema();

    for mode in [OpenMode::Create, OpenMode::CreateOrAppend] {
        let result = handle.open_writer(&schema, &AnalyzerConfig::default(), mode);
        assert!(matches!(result, Err(Error::Resource(_))), "{mode:?}: {result:?}");
    }
    assert_eq!(std::fs::read_to_string(&notes).unwrap(), "keep me");
    assert!(handle.open_reader().unwrap().is_none());

    std::fs::remove_file(&notes).unwrap();
    handle.open_writer(&schema, &AnalyzerConfig::default(), OpenMode::CreateOrAppend).unwrap().close().unwrap();
    assert!(handle.open_reader().unwrap().is_some());
}

#[test]
fn writer_debug_shows_location_and_pending() {
    let handle = IndexHandle::in_memory();
    let mut writer = handle.open_writer(&common::article_schema(), &AnalyzerConfig::default(), OpenMode::Create).unwrap();
    writer.add_document(&common::article("alpha", "a", 2000)).unwrap();
    let shown = format!("{writer:?}");
    assert!(shown.contains("InMemory") && shown.contains("pending: 1"), "{shown}");
    writer.close().unwrap();
}
