#![allow(dead_code)]

use docindex_core::types::{DocumentValueMap, FieldKind, FieldValue, IndexSchema, INDEXED, STORED, TOKENIZED};
use docindex_text::{AnalyzerConfig, IndexHandle, OpenMode};

pub fn article_schema() -> IndexSchema {
    IndexSchema::builder()
        .field("title", FieldKind::Text, INDEXED | STORED | TOKENIZED).unwrap()
        .field("slug", FieldKind::Text, INDEXED | STORED).unwrap()
        .field("year", FieldKind::Int64, INDEXED | STORED).unwrap()
        .build()
        .unwrap()
}

pub fn article(title: &str, slug: &str, year: i64) -> DocumentValueMap {
    let mut m = DocumentValueMap::new();
    m.insert("title".into(), FieldValue::from(title));
    m.insert("slug".into(), FieldValue::from(slug));
    m.insert("year".into(), FieldValue::Int64(year));
    m
}

/// In-memory handle holding the committed documents.
pub fn index_with(docs: &[DocumentValueMap]) -> IndexHandle {
    let handle = IndexHandle::in_memory();
    let mut writer = handle.open_writer(&article_schema(), &AnalyzerConfig::default(), OpenMode::Create).unwrap();
    writer.add_documents(docs).unwrap();
    writer.close().unwrap();
    handle
}
