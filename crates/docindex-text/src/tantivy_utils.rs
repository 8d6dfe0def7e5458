use tantivy::schema::{FieldType as EngineFieldType, Schema};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenizerManager};
use tantivy::Index;
use tracing::warn;

use docindex_core::config::AnalyzerSettings;
use docindex_core::types::{FieldDefinition, FieldKind, FieldOptions, IndexSchema};
use docindex_core::{Error, Result};

use crate::registry::FieldType;

/// Name under which the fulltext analyzer is registered with the engine.
pub const TOKENIZER_NAME: &str = "docindex_text";

/// Tokenizer used for indexed but untokenized text: the whole value is one term.
pub(crate) const RAW_TOKENIZER: &str = "raw";

const ENGLISH_STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// How text is broken into searchable terms: simple word tokenization,
/// lowercasing, long-token removal and an optional stop-word list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
	pub stop_words: Vec<String>,
	pub max_token_length: usize,
}

impl Default for AnalyzerConfig {
	fn default() -> Self {
		Self { stop_words: Vec::new(), max_token_length: 40 }
	}
}

impl AnalyzerConfig {
	pub fn with_english_stop_words() -> Self {
		Self { stop_words: ENGLISH_STOP_WORDS.iter().map(|s| s.to_string()).collect(), ..Self::default() }
	}

	pub fn build(&self) -> TextAnalyzer {
		TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(RemoveLongFilter::limit(self.max_token_length))
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(self.stop_words.iter().cloned()))
			.build()
	}

	pub fn register(&self, index: &Index) {
		index.tokenizers().register(TOKENIZER_NAME, self.build());
	}

	/// A private tokenizer manager for query parsing, so per-search analyzer
	/// settings never mutate the index's shared registry.
	pub fn tokenizer_manager(&self) -> TokenizerManager {
		let manager = TokenizerManager::default();
		manager.register(TOKENIZER_NAME, self.build());
		manager
	}
}

impl From<&AnalyzerSettings> for AnalyzerConfig {
	fn from(s: &AnalyzerSettings) -> Self {
		Self { stop_words: s.stop_words.clone(), max_token_length: s.max_token_length }
	}
}

/// Translate the logical schema into the engine schema.
pub fn build_engine_schema(schema: &IndexSchema) -> Result<Schema> {
	if schema.is_empty() {
		return Err(Error::config("schema has no fields"));
	}
	let mut builder = Schema::builder();
	for def in schema.fields() {
		FieldType::define(def.kind, def.options)?.add_to(&mut builder, &def.name);
	}
	Ok(builder.build())
}

/// Best-effort logical schema for an index written without a schema payload.
/// Integer and float fields come back as their 64-bit kinds.
pub fn schema_from_engine(engine: &Schema) -> Result<IndexSchema> {
	let mut defs = Vec::new();
	for (_, entry) in engine.fields() {
		let (kind, options) = match entry.field_type() {
			EngineFieldType::Str(opts) => {
				let indexing = opts.get_indexing_options();
				(FieldKind::Text, FieldOptions {
					indexed: indexing.is_some(),
					stored: opts.is_stored(),
					tokenized: indexing.is_some_and(|i| i.tokenizer() != RAW_TOKENIZER),
				})
			}
			EngineFieldType::I64(opts) => (FieldKind::Int64, FieldOptions { indexed: opts.is_indexed(), stored: opts.is_stored(), tokenized: false }),
			EngineFieldType::F64(opts) => (FieldKind::Float64, FieldOptions { indexed: opts.is_indexed(), stored: opts.is_stored(), tokenized: false }),
			other => {
				warn!(field = entry.name(), engine_type = ?other.value_type(), "skipping field of unsupported engine type");
				continue;
			}
		};
		let def = FieldDefinition { name: entry.name().to_string(), kind, options };
		if def.validate().is_ok() { defs.push(def); }
	}
	IndexSchema::new(defs)
}
