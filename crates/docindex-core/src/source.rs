//! Directory-backed document source.
//!
//! Walks a directory for `*.json` files (one object each) and `*.jsonl`
//! files (one object per line) and coerces every object through the schema.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::traits::DocumentSource;
use crate::types::{DocumentValueMap, FieldValue, IndexSchema};

#[derive(Debug, Clone)]
pub struct JsonDocumentSource {
    root: PathBuf,
    file_limit: Option<usize>,
}

impl JsonDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), file_limit: None }
    }

    /// Only read the first `limit` files (in sorted path order).
    pub fn with_file_limit(mut self, limit: usize) -> Self {
        self.file_limit = Some(limit);
        self
    }

    fn list_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if matches!(path.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        if let Some(limit) = self.file_limit { files.truncate(limit); }
        files
    }

    fn read_file(path: &Path, schema: &IndexSchema, out: &mut Vec<DocumentValueMap>) -> Result<()> {
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() { continue; }
                let obj: serde_json::Value = serde_json::from_str(line)
                    .with_context(|| format!("{}:{}: invalid JSON", path.display(), line_no + 1))?;
                out.push(value_map_from_json(schema, &obj).with_context(|| format!("{}:{}", path.display(), line_no + 1))?);
            }
        } else {
            let obj: serde_json::Value = serde_json::from_str(&content).with_context(|| format!("{}: invalid JSON", path.display()))?;
            out.push(value_map_from_json(schema, &obj).with_context(|| path.display().to_string())?);
        }
        Ok(())
    }
}

impl DocumentSource for JsonDocumentSource {
    fn documents(&self, schema: &IndexSchema) -> Result<Vec<DocumentValueMap>> {
        let files = self.list_files();
        if files.is_empty() {
            info!(root = %self.root.display(), "no .json/.jsonl files found");
            return Ok(vec![]);
        }
        let mut docs = Vec::new();
        for (i, path) in files.iter().enumerate() {
            debug!(file = %path.display(), n = i + 1, of = files.len(), "reading documents");
            Self::read_file(path, schema, &mut docs)?;
        }
        info!(files = files.len(), documents = docs.len(), "loaded documents");
        Ok(docs)
    }
}

/// Converts one JSON object into a value map. Keys without a schema field are
/// ignored; missing keys are left for the codec to reject.
pub fn value_map_from_json(schema: &IndexSchema, obj: &serde_json::Value) -> crate::Result<DocumentValueMap> {
    let map = obj
        .as_object()
        .ok_or_else(|| crate::Error::config("document must be a JSON object"))?;
    let mut values = DocumentValueMap::new();
    for def in schema.fields() {
        if let Some(v) = map.get(&def.name) {
            let value = FieldValue::from_json(def.kind, v).map_err(|e| match e {
                crate::Error::Configuration(m) => crate::Error::config(format!("field '{}': {m}", def.name)),
                other => other,
            })?;
            values.insert(def.name.clone(), value);
        }
    }
    Ok(values)
}
