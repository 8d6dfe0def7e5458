use std::fs;

use docindex_core::config::{expand_path, resolve_with_base, Config};
use docindex_core::types::{FieldKind, INDEXED, STORED, TOKENIZED};
use tempfile::TempDir;

#[test]
fn settings_have_defaults_without_files() {
    let tmp = TempDir::new().unwrap();
    let settings = Config::load_from(tmp.path()).unwrap().settings().unwrap();
    assert_eq!(settings.search.default_limit, 10);
    assert_eq!(settings.index.writer_heap_bytes, 50_000_000);
    assert!(settings.schema.is_empty());
}

#[test]
fn settings_read_schema_from_toml() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("docindex.toml"),
        r#"
[index]
location = ":memory:"

[search]
fulltext_field = "title"
default_limit = 25

[[schema]]
name = "title"
kind = "text"
options = ["indexed", "stored", "tokenized"]

[[schema]]
name = "published"
kind = "int64"
options = ["indexed", "stored"]
"#,
    )
    .unwrap();

    let config = Config::load_from(tmp.path()).unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(settings.index.path(), None);
    assert_eq!(settings.search.default_limit, 25);
    let schema = settings.index_schema().unwrap();
    assert_eq!(schema.get("title").unwrap().options, INDEXED | STORED | TOKENIZED);
    assert_eq!(schema.get("published").unwrap().kind, FieldKind::Int64);
    assert_eq!(config.get::<String>("search.fulltext_field").unwrap(), "title");
}

#[test]
fn invalid_schema_in_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("docindex.toml"),
        "[[schema]]\nname = \"n\"\nkind = \"int32\"\noptions = [\"indexed\", \"tokenized\"]\n",
    )
    .unwrap();
    assert!(Config::load_from(tmp.path()).unwrap().settings().is_err());
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = std::path::Path::new("/srv/docindex");
    assert_eq!(resolve_with_base(base, "idx"), base.join("idx"));
    assert_eq!(resolve_with_base(base, "/abs/idx"), std::path::PathBuf::from("/abs/idx"));
    std::env::set_var("DOCINDEX_TEST_ROOT", "/tmp/root");
    assert_eq!(expand_path("${DOCINDEX_TEST_ROOT}/idx"), std::path::PathBuf::from("/tmp/root/idx"));
}
