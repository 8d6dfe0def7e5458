use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur as EngineOccur, Query as EngineQuery};
use tantivy::TantivyDocument;
use tracing::{debug, instrument, warn};

use docindex_core::types::{ScoredDocument, SearchCursor, SearchResult};
use docindex_core::{Error, Result};

use crate::codec::to_value_map;
use crate::collector::{CursorCollector, Interrupt};
use crate::index::Reader;
use crate::query::{CompileContext, Filter};
use crate::tantivy_utils::AnalyzerConfig;

/// One search call: a user query string parsed against a fulltext field,
/// plus an optional filter, page size and resume cursor.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
	query: &'a str,
	fulltext_field: &'a str,
	filter: Option<&'a Filter>,
	limit: usize,
	cursor: Option<SearchCursor>,
	interrupt: Interrupt,
}

impl<'a> SearchRequest<'a> {
	pub fn new(query: &'a str, fulltext_field: &'a str) -> Self {
		Self { query, fulltext_field, filter: None, limit: 10, cursor: None, interrupt: Interrupt::none() }
	}

	pub fn limit(mut self, limit: usize) -> Self {
		self.limit = limit;
		self
	}

	pub fn filter(mut self, filter: Option<&'a Filter>) -> Self {
		self.filter = filter;
		self
	}

	/// Resume strictly after `cursor`. `None` starts from the top.
	pub fn after(mut self, cursor: Option<SearchCursor>) -> Self {
		self.cursor = cursor;
		self
	}

	pub fn interrupt(mut self, interrupt: Interrupt) -> Self {
		self.interrupt = interrupt;
		self
	}
}

/// True for input that is never parsed: blank strings, and leading
/// wildcards (after any whitespace), which would scan the whole term
/// dictionary.
fn is_blocked(query: &str) -> bool {
	matches!(query.trim_start().chars().next(), None | Some('*' | '?'))
}

/// Run a ranked search.
///
/// A missing reader, blocked input, an unparseable query string or a filter
/// that does not fit the index all produce an empty result, not an error.
/// Errors are reserved for storage failures and interruption.
#[instrument(skip_all, fields(query = request.query, field = request.fulltext_field, limit = request.limit))]
pub fn search(reader: Option<&Reader>, request: &SearchRequest<'_>, analyzer: &AnalyzerConfig) -> Result<SearchResult> {
	let Some(reader) = reader else {
		debug!("no index to search");
		return Ok(SearchResult::empty());
	};
	if is_blocked(request.query) {
		debug!("blocked empty or leading-wildcard query");
		return Ok(SearchResult::empty());
	}

	let tokenizers = analyzer.tokenizer_manager();
	let ctx = CompileContext { schema: reader.schema(), engine: reader.engine_schema(), tokenizers: &tokenizers };
	let parsed = match ctx.parse(request.query, &[request.fulltext_field.to_string()]) {
		Ok(q) => q,
		Err(e) => {
			debug!(error = %e, "unparseable query, returning no results");
			return Ok(SearchResult::empty());
		}
	};
	let query: Box<dyn EngineQuery> = match request.filter {
		None => parsed,
		Some(filter) => match filter.query().compile(&ctx) {
			Ok(fq) => Box::new(BooleanQuery::new(vec![
				(EngineOccur::Must, parsed),
				(EngineOccur::Must, Box::new(ConstScoreQuery::new(fq, 0.0)) as Box<dyn EngineQuery>),
			])),
			Err(e) => {
				warn!(error = %e, "filter does not fit the index, returning no results");
				return Ok(SearchResult::empty());
			}
		},
	};

	if request.interrupt.is_triggered() {
		return Err(Error::Interrupted("interrupted before execution".to_string()));
	}
	let searcher = reader.searcher();
	let collector = CursorCollector::new(searcher, request.limit, request.cursor, request.interrupt.clone());
	let page = searcher.search(&*query, &collector).map_err(Error::resource)?;
	if page.interrupted {
		return Err(Error::Interrupted(format!("stopped after {} matches", page.total_hits)));
	}

	let mut documents = Vec::with_capacity(page.hits.len());
	for hit in page.hits {
		let doc: TantivyDocument = searcher.doc(hit.address).map_err(Error::resource)?;
		documents.push(ScoredDocument {
			fields: to_value_map(reader.schema(), reader.engine_schema(), &doc),
			doc_id: hit.doc_id,
			score: hit.score,
		});
	}
	debug!(total_hits = page.total_hits, returned = documents.len(), "search done");
	Ok(SearchResult { total_hits: page.total_hits, documents })
}
