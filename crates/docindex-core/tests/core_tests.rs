use std::fs;

use docindex_core::source::{value_map_from_json, JsonDocumentSource};
use docindex_core::traits::DocumentSource;
use docindex_core::types::{
    rfc3339_to_epoch_millis, FieldKind, FieldOptions, FieldValue, IndexSchema, SearchCursor, INDEXED, STORED, TOKENIZED,
};
use docindex_core::Error;
use tempfile::TempDir;

fn schema() -> IndexSchema {
    IndexSchema::builder()
        .field("title", FieldKind::Text, INDEXED | STORED | TOKENIZED).unwrap()
        .field("year", FieldKind::Int32, INDEXED | STORED).unwrap()
        .field("price", FieldKind::Float64, STORED).unwrap()
        .build()
        .unwrap()
}

#[test]
fn options_require_indexed_or_stored() {
    let err = FieldOptions::default().validate_for(FieldKind::Text).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(TOKENIZED.validate_for(FieldKind::Text).is_err(), "tokenized alone is neither indexed nor stored");
}

#[test]
fn tokenized_rejected_on_numeric_kinds() {
    for kind in [FieldKind::Int32, FieldKind::Int64, FieldKind::Float32, FieldKind::Float64] {
        let err = (INDEXED | TOKENIZED).validate_for(kind).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{kind}");
    }
    assert!((INDEXED | TOKENIZED).validate_for(FieldKind::Text).is_ok());
}

#[test]
fn schema_rejects_duplicate_names() {
    let res = IndexSchema::builder()
        .field("a", FieldKind::Text, STORED).unwrap()
        .field("a", FieldKind::Int64, STORED).unwrap()
        .build();
    assert!(matches!(res, Err(Error::Configuration(_))));
}

#[test]
fn options_deserialize_from_names() {
    let opts: FieldOptions = serde_json::from_str(r#"["indexed","tokenized"]"#).unwrap();
    assert_eq!(opts, INDEXED | TOKENIZED);
    let back = serde_json::to_string(&opts).unwrap();
    assert_eq!(back, r#"["indexed","tokenized"]"#);
}

#[test]
fn json_coercion_follows_declared_kind() {
    assert_eq!(FieldValue::from_json(FieldKind::Int32, &serde_json::json!(7)).unwrap(), FieldValue::Int32(7));
    assert_eq!(FieldValue::from_json(FieldKind::Int64, &serde_json::json!("42")).unwrap(), FieldValue::Int64(42));
    assert_eq!(FieldValue::from_json(FieldKind::Float64, &serde_json::json!(1.5)).unwrap(), FieldValue::Float64(1.5));
    assert!(FieldValue::from_json(FieldKind::Int32, &serde_json::json!(i64::MAX)).is_err());
    assert!(FieldValue::from_json(FieldKind::Text, &serde_json::json!(true)).is_err());
    assert!(FieldValue::from_json(FieldKind::Int64, &serde_json::json!(null)).is_err());
    assert!(FieldValue::from_json(FieldKind::Int64, &serde_json::json!([1])).is_err());
}

#[test]
fn value_map_ignores_unknown_keys() {
    let map = value_map_from_json(&schema(), &serde_json::json!({"title": "x", "year": 2001, "extra": 1})).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["year"], FieldValue::Int32(2001));
}

#[test]
fn rfc3339_converts_to_millis() {
    assert_eq!(rfc3339_to_epoch_millis("1970-01-01T00:00:01Z").unwrap(), 1000);
    assert_eq!(rfc3339_to_epoch_millis("2001-09-09T01:46:40+00:00").unwrap(), 1_000_000_000_000);
    assert!(rfc3339_to_epoch_millis("yesterday").is_err());
}

#[test]
fn cursor_parses_doc_and_score() {
    let c: SearchCursor = "17:0.5".parse().unwrap();
    assert_eq!(c, SearchCursor::new(17, 0.5));
    assert!("17".parse::<SearchCursor>().is_err());
    assert_eq!(c.to_string(), "17:0.5");
}

#[test]
fn json_source_reads_json_and_jsonl_in_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.jsonl"), "{\"title\":\"two\",\"year\":2}\n\n{\"title\":\"three\",\"year\":3}\n").unwrap();
    fs::write(dir.join("a.json"), r#"{"title":"one","year":1}"#).unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let docs = JsonDocumentSource::new(dir).documents(&schema()).expect("documents");
    let titles: Vec<_> = docs.iter().map(|d| d["title"].as_str().unwrap().to_string()).collect();
    assert_eq!(titles, ["one", "two", "three"]);

    let limited = JsonDocumentSource::new(dir).with_file_limit(1).documents(&schema()).unwrap();
    assert_eq!(limited.len(), 1);
}
