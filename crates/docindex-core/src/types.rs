//! Domain types shared by the index engine and its collaborators.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The closed set of logical value types a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        !matches!(self, FieldKind::Text)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FieldKind::Int32 | FieldKind::Int64)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Text => "text",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Float32 => "float32",
            FieldKind::Float64 => "float64",
        };
        f.write_str(s)
    }
}

/// A single storage option, as spelled in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOption {
    Indexed,
    Stored,
    Tokenized,
}

/// Storage options of a field. Combine with `|`, e.g. `INDEXED | STORED`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldOption>", into = "Vec<FieldOption>")]
pub struct FieldOptions {
    pub indexed: bool,
    pub stored: bool,
    pub tokenized: bool,
}

/// Searchable and filterable.
pub const INDEXED: FieldOptions = FieldOptions { indexed: true, stored: false, tokenized: false };
/// Retrievable verbatim from search results.
pub const STORED: FieldOptions = FieldOptions { indexed: false, stored: true, tokenized: false };
/// Broken into fulltext terms. Text fields only.
pub const TOKENIZED: FieldOptions = FieldOptions { indexed: false, stored: false, tokenized: true };

impl BitOr for FieldOptions {
    type Output = FieldOptions;

    fn bitor(self, rhs: FieldOptions) -> FieldOptions {
        FieldOptions {
            indexed: self.indexed || rhs.indexed,
            stored: self.stored || rhs.stored,
            tokenized: self.tokenized || rhs.tokenized,
        }
    }
}

impl From<Vec<FieldOption>> for FieldOptions {
    fn from(opts: Vec<FieldOption>) -> Self {
        opts.into_iter().fold(FieldOptions::default(), |acc, o| {
            acc | match o {
                FieldOption::Indexed => INDEXED,
                FieldOption::Stored => STORED,
                FieldOption::Tokenized => TOKENIZED,
            }
        })
    }
}

impl From<FieldOptions> for Vec<FieldOption> {
    fn from(opts: FieldOptions) -> Self {
        let mut out = Vec::new();
        if opts.indexed { out.push(FieldOption::Indexed); }
        if opts.stored { out.push(FieldOption::Stored); }
        if opts.tokenized { out.push(FieldOption::Tokenized); }
        out
    }
}

impl FieldOptions {
    /// Checks the option set against a kind: at least one of indexed/stored,
    /// and tokenized only on text.
    pub fn validate_for(self, kind: FieldKind) -> Result<()> {
        if !self.indexed && !self.stored {
            return Err(Error::config(format!("a {kind} field must be indexed, stored, or both")));
        }
        if self.tokenized && kind != FieldKind::Text {
            return Err(Error::config(format!("tokenized is only valid for text fields, not {kind}")));
        }
        Ok(())
    }
}

/// A named, typed field of an index schema. Immutable once the schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    pub options: FieldOptions,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind, options: FieldOptions) -> Result<Self> {
        let def = Self { name: name.into(), kind, options };
        def.validate()?;
        Ok(def)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("field name must not be empty"));
        }
        self.options
            .validate_for(self.kind)
            .map_err(|e| Error::config(format!("field '{}': {}", self.name, e)))
    }
}

/// Ordered set of field definitions with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexSchema {
    fields: Vec<FieldDefinition>,
}

impl IndexSchema {
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        for f in &fields {
            f.validate()?;
            if !seen.insert(f.name.as_str()) {
                return Err(Error::config(format!("duplicate field name '{}'", f.name)));
            }
        }
        Ok(Self { fields })
    }

    pub fn builder() -> IndexSchemaBuilder {
        IndexSchemaBuilder::default()
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct IndexSchemaBuilder {
    fields: Vec<FieldDefinition>,
}

impl IndexSchemaBuilder {
    pub fn field(mut self, name: &str, kind: FieldKind, options: FieldOptions) -> Result<Self> {
        self.fields.push(FieldDefinition::new(name, kind, options)?);
        Ok(self)
    }

    pub fn build(self) -> Result<IndexSchema> {
        IndexSchema::new(self.fields)
    }
}

/// A typed value for one field of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Int32(_) => FieldKind::Int32,
            FieldValue::Int64(_) => FieldKind::Int64,
            FieldValue::Float32(_) => FieldKind::Float32,
            FieldValue::Float64(_) => FieldKind::Float64,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Int32(v) => Some(i64::from(v)),
            FieldValue::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Float32(v) => Some(f64::from(v)),
            FieldValue::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Coerces a collaborator-supplied JSON value into `kind`.
    ///
    /// Numeric kinds also accept numeric strings, since scraped markup
    /// rarely carries typed numbers.
    pub fn from_json(kind: FieldKind, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        let unsupported = || Error::config(format!("cannot convert {value} to {kind}"));
        match (kind, value) {
            (FieldKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldKind::Int32, Value::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(FieldValue::Int32)
                .ok_or_else(unsupported),
            (FieldKind::Int64, Value::Number(n)) => n.as_i64().map(FieldValue::Int64).ok_or_else(unsupported),
            #[allow(clippy::cast_possible_truncation)]
            (FieldKind::Float32, Value::Number(n)) => n.as_f64().map(|v| FieldValue::Float32(v as f32)).ok_or_else(unsupported),
            (FieldKind::Float64, Value::Number(n)) => n.as_f64().map(FieldValue::Float64).ok_or_else(unsupported),
            (FieldKind::Int32, Value::String(s)) => s.trim().parse().map(FieldValue::Int32).map_err(|_| unsupported()),
            (FieldKind::Int64, Value::String(s)) => s.trim().parse().map(FieldValue::Int64).map_err(|_| unsupported()),
            (FieldKind::Float32, Value::String(s)) => s.trim().parse().map(FieldValue::Float32).map_err(|_| unsupported()),
            (FieldKind::Float64, Value::String(s)) => s.trim().parse().map(FieldValue::Float64).map_err(|_| unsupported()),
            _ => Err(unsupported()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { FieldValue::Text(s.to_string()) }
}
impl From<String> for FieldValue {
    fn from(s: String) -> Self { FieldValue::Text(s) }
}
impl From<i32> for FieldValue {
    fn from(v: i32) -> Self { FieldValue::Int32(v) }
}
impl From<i64> for FieldValue {
    fn from(v: i64) -> Self { FieldValue::Int64(v) }
}
impl From<f32> for FieldValue {
    fn from(v: f32) -> Self { FieldValue::Float32(v) }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self { FieldValue::Float64(v) }
}

/// Converts an RFC 3339 timestamp into epoch milliseconds.
pub fn rfc3339_to_epoch_millis(s: &str) -> Result<i64> {
    chrono::DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| Error::config(format!("invalid RFC 3339 timestamp '{s}': {e}")))
}

/// Field name → value, one per logical document. Also the shape of documents
/// reconstructed from stored fields at read time.
pub type DocumentValueMap = BTreeMap<String, FieldValue>;

/// Resume point for paginated search: the last document seen on the previous page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchCursor {
    pub doc_id: u64,
    pub score: f32,
}

impl SearchCursor {
    pub fn new(doc_id: u64, score: f32) -> Self {
        Self { doc_id, score }
    }
}

impl FromStr for SearchCursor {
    type Err = Error;

    /// Parses `DOC:SCORE`, e.g. `17:0.4821`.
    fn from_str(s: &str) -> Result<Self> {
        let (doc, score) = s
            .split_once(':')
            .ok_or_else(|| Error::config(format!("cursor '{s}' is not DOC:SCORE")))?;
        let doc_id = doc.trim().parse().map_err(|_| Error::config(format!("bad cursor doc id '{doc}'")))?;
        let score = score.trim().parse().map_err(|_| Error::config(format!("bad cursor score '{score}'")))?;
        Ok(Self { doc_id, score })
    }
}

impl fmt::Display for SearchCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.doc_id, self.score)
    }
}

/// One ranked hit with its reconstructed stored fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub fields: DocumentValueMap,
    pub doc_id: u64,
    pub score: f32,
}

impl ScoredDocument {
    pub fn cursor(&self) -> SearchCursor {
        SearchCursor::new(self.doc_id, self.score)
    }
}

/// A page of ranked results. `total_hits` counts every match, not just this page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub total_hits: u64,
    pub documents: Vec<ScoredDocument>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Cursor for the page after this one, if this page has any documents.
    pub fn next_cursor(&self) -> Option<SearchCursor> {
        self.documents.last().map(ScoredDocument::cursor)
    }
}
