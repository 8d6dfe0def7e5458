//! Structured query construction and compilation to engine queries.
//!
//! Construction never touches an index: fields are checked by name and
//! kind only when a query is compiled against a reader's schema.

use std::ops::Bound;

use tantivy::query::{BooleanQuery, Occur as EngineOccur, Query as EngineQuery, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema};
use tantivy::tokenizer::TokenizerManager;
use tantivy::Term;
use tracing::debug;

use docindex_core::types::{rfc3339_to_epoch_millis, FieldDefinition, FieldKind, FieldValue, IndexSchema};
use docindex_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
	Must,
	MustNot,
	Should,
}

impl From<Occur> for EngineOccur {
	fn from(o: Occur) -> Self {
		match o {
			Occur::Must => EngineOccur::Must,
			Occur::MustNot => EngineOccur::MustNot,
			Occur::Should => EngineOccur::Should,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
	/// Exact, unanalyzed value equality.
	Term { field: String, value: FieldValue },
	/// Inclusive on both ends; `min` and `max` share `kind`.
	NumericRange { field: String, kind: FieldKind, min: FieldValue, max: FieldValue },
	Boolean(Vec<(Query, Occur)>),
	/// Parsed with the search analyzer when compiled.
	ParsedFullText { raw: String, fields: Vec<String> },
}

/// A query that restricts results without contributing to their score.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter(Query);

impl Filter {
	pub fn query(&self) -> &Query {
		&self.0
	}
}

/// Wrap a present query as a filter. Absence passes through.
pub fn as_filter(query: Option<Query>) -> Option<Filter> {
	query.map(Filter)
}

/// One element of a flat `(query, occur, query, occur, ...)` argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseArg {
	Query(Option<Query>),
	Occur(Occur),
}

impl From<Occur> for ClauseArg {
	fn from(o: Occur) -> Self { ClauseArg::Occur(o) }
}
impl From<Query> for ClauseArg {
	fn from(q: Query) -> Self { ClauseArg::Query(Some(q)) }
}
impl From<Option<Query>> for ClauseArg {
	fn from(q: Option<Query>) -> Self { ClauseArg::Query(q) }
}

/// What to do with invalid construction input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConstructionPolicy {
	/// Invalid input yields `Ok(None)`, indistinguishable from "no query".
	#[default]
	Lenient,
	/// Invalid input yields `Err(Error::QueryConstruction)`.
	Strict,
}

/// Builds [`Query`] values. Every builder method distinguishes valid absence
/// (`Ok(None)`) from invalid input, which the policy turns into either
/// `Ok(None)` or an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
	policy: ConstructionPolicy,
}

impl QueryBuilder {
	pub fn new(policy: ConstructionPolicy) -> Self {
		Self { policy }
	}

	pub fn lenient() -> Self {
		Self::new(ConstructionPolicy::Lenient)
	}

	pub fn strict() -> Self {
		Self::new(ConstructionPolicy::Strict)
	}

	pub fn policy(&self) -> ConstructionPolicy {
		self.policy
	}

	pub fn term(&self, field: &str, value: impl Into<FieldValue>) -> Query {
		Query::Term { field: field.to_string(), value: value.into() }
	}

	pub fn full_text(&self, raw: &str, fields: &[&str]) -> Query {
		Query::ParsedFullText { raw: raw.to_string(), fields: fields.iter().map(|f| f.to_string()).collect() }
	}

	/// Valid only when both bounds have the same numeric kind and `min <= max`.
	pub fn numeric_range(&self, field: &str, min: impl Into<FieldValue>, max: impl Into<FieldValue>) -> Result<Option<Query>> {
		let (min, max) = (min.into(), max.into());
		let kind = min.kind();
		if kind != max.kind() {
			return self.reject(format!("range on '{field}' mixes {} and {}", kind, max.kind()));
		}
		let ordered = match kind {
			FieldKind::Text => return self.reject(format!("range on '{field}' needs numeric bounds, got text")),
			FieldKind::Int32 | FieldKind::Int64 => min.as_i64() <= max.as_i64(),
			FieldKind::Float32 | FieldKind::Float64 => matches!(
				min.as_f64().partial_cmp(&max.as_f64()),
				Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
			),
		};
		if !ordered {
			return self.reject(format!("range on '{field}' has min {min:?} above max {max:?}"));
		}
		Ok(Some(Query::NumericRange { field: field.to_string(), kind, min, max }))
	}

	/// Range over an epoch-millisecond date field, bounds in RFC 3339.
	pub fn date_range(&self, field: &str, start: &str, end: &str) -> Result<Option<Query>> {
		match (rfc3339_to_epoch_millis(start), rfc3339_to_epoch_millis(end)) {
			(Ok(lo), Ok(hi)) => self.numeric_range(field, lo, hi),
			(Err(e), _) | (_, Err(e)) => self.reject(format!("date range on '{field}': {e}")),
		}
	}

	/// Combine present clauses. Clauses whose query is `None` are dropped;
	/// if none remain the result is `None`, never an empty composite.
	pub fn boolean<I>(&self, clauses: I) -> Option<Query>
	where
		I: IntoIterator<Item = (Option<Query>, Occur)>,
	{
		let kept: Vec<(Query, Occur)> = clauses.into_iter().filter_map(|(q, o)| q.map(|q| (q, o))).collect();
		if kept.is_empty() { None } else { Some(Query::Boolean(kept)) }
	}

	/// Flat-argument form: arguments must alternate query, occur. An odd
	/// count or out-of-order pair is a construction mismatch.
	pub fn boolean_from_args(&self, args: Vec<ClauseArg>) -> Result<Option<Query>> {
		if args.len() % 2 != 0 {
			return self.reject(format!("boolean query needs (query, occur) pairs, got {} arguments", args.len()));
		}
		let mut pairs = Vec::with_capacity(args.len() / 2);
		let mut it = args.into_iter();
		while let (Some(a), Some(b)) = (it.next(), it.next()) {
			match (a, b) {
				(ClauseArg::Query(q), ClauseArg::Occur(o)) => pairs.push((q, o)),
				(a, b) => return self.reject(format!("boolean clause must be (query, occur), got ({a:?}, {b:?})")),
			}
		}
		Ok(self.boolean(pairs))
	}

	fn reject(&self, msg: String) -> Result<Option<Query>> {
		match self.policy {
			ConstructionPolicy::Lenient => {
				debug!(reason = %msg, "dropping invalid query");
				Ok(None)
			}
			ConstructionPolicy::Strict => Err(Error::QueryConstruction(msg)),
		}
	}
}

/// Everything needed to turn a [`Query`] into an engine query.
pub(crate) struct CompileContext<'a> {
	pub schema: &'a IndexSchema,
	pub engine: &'a Schema,
	pub tokenizers: &'a TokenizerManager,
}

impl CompileContext<'_> {
	/// Parse user input against `fields`; any parser failure is a `QueryParse` error.
	pub fn parse(&self, raw: &str, fields: &[String]) -> Result<Box<dyn EngineQuery>> {
		let mut default_fields = Vec::with_capacity(fields.len());
		for name in fields {
			default_fields.push(self.engine.get_field(name).map_err(|_| Error::QueryParse(format!("unknown field '{name}'")))?);
		}
		let parser = QueryParser::new(self.engine.clone(), default_fields, self.tokenizers.clone());
		parser.parse_query(raw).map_err(|e| Error::QueryParse(e.to_string()))
	}

	fn resolve(&self, name: &str) -> Result<(Field, &FieldDefinition)> {
		let def = self.schema.get(name).ok_or_else(|| Error::QueryConstruction(format!("unknown field '{name}'")))?;
		if !def.options.indexed {
			return Err(Error::QueryConstruction(format!("field '{name}' is not indexed")));
		}
		let field = self.engine.get_field(name).map_err(|_| Error::QueryConstruction(format!("unknown field '{name}'")))?;
		Ok((field, def))
	}
}

fn numeric_term(field: Field, kind: FieldKind, value: &FieldValue) -> Option<Term> {
	if kind.is_integer() {
		value.as_i64().map(|v| Term::from_field_i64(field, v))
	} else {
		value.as_f64().map(|v| Term::from_field_f64(field, v))
	}
}

impl Query {
	pub(crate) fn compile(&self, ctx: &CompileContext<'_>) -> Result<Box<dyn EngineQuery>> {
		match self {
			Query::Term { field, value } => {
				let (f, def) = ctx.resolve(field)?;
				let term = match (def.kind, value) {
					(FieldKind::Text, FieldValue::Text(s)) => Some(Term::from_field_text(f, s)),
					(FieldKind::Text, _) => None,
					(kind, v) => numeric_term(f, kind, v),
				}
				.ok_or_else(|| Error::QueryConstruction(format!("term on {} field '{}' with {} value", def.kind, field, value.kind())))?;
				let record = if def.options.tokenized { IndexRecordOption::WithFreqs } else { IndexRecordOption::Basic };
				Ok(Box::new(TermQuery::new(term, record)))
			}
			Query::NumericRange { field, kind, min, max } => {
				let (f, def) = ctx.resolve(field)?;
				if !def.kind.is_numeric() || def.kind.is_integer() != kind.is_integer() {
					return Err(Error::QueryConstruction(format!("{kind} range on {} field '{field}'", def.kind)));
				}
				let bound = |v: &FieldValue| {
					numeric_term(f, def.kind, v).ok_or_else(|| Error::QueryConstruction(format!("bad bound {v:?} on '{field}'")))
				};
				Ok(Box::new(RangeQuery::new(Bound::Included(bound(min)?), Bound::Included(bound(max)?))))
			}
			Query::Boolean(clauses) => {
				let mut compiled = Vec::with_capacity(clauses.len());
				for (q, occur) in clauses {
					compiled.push((EngineOccur::from(*occur), q.compile(ctx)?));
				}
				Ok(Box::new(BooleanQuery::new(compiled)))
			}
			Query::ParsedFullText { raw, fields } => ctx.parse(raw, fields),
		}
	}
}
