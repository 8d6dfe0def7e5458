//! Field type registry: maps a logical kind plus storage options onto an
//! engine field, and binds named values to those descriptors.

use tantivy::schema::{Field, IndexRecordOption, NumericOptions, SchemaBuilder, TextFieldIndexing, TextOptions};
use tantivy::TantivyDocument;

use docindex_core::types::{rfc3339_to_epoch_millis, FieldDefinition, FieldKind, FieldOptions, FieldValue};
use docindex_core::{Error, Result};

use crate::tantivy_utils::{RAW_TOKENIZER, TOKENIZER_NAME};

/// A validated (kind, options) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
	kind: FieldKind,
	options: FieldOptions,
}

impl FieldType {
	/// Fails unless the field is indexed or stored, and tokenized only on text.
	pub fn define(kind: FieldKind, options: FieldOptions) -> Result<Self> {
		options.validate_for(kind)?;
		Ok(Self { kind, options })
	}

	pub fn kind(&self) -> FieldKind { self.kind }

	pub fn options(&self) -> FieldOptions { self.options }

	pub(crate) fn add_to(&self, builder: &mut SchemaBuilder, name: &str) -> Field {
		match self.kind {
			FieldKind::Text => builder.add_text_field(name, self.text_options()),
			FieldKind::Int32 | FieldKind::Int64 => builder.add_i64_field(name, self.numeric_options()),
			FieldKind::Float32 | FieldKind::Float64 => builder.add_f64_field(name, self.numeric_options()),
		}
	}

	fn text_options(&self) -> TextOptions {
		let mut opts = TextOptions::default();
		if self.options.indexed {
			let indexing = if self.options.tokenized {
				TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions)
			} else {
				TextFieldIndexing::default().set_tokenizer(RAW_TOKENIZER).set_index_option(IndexRecordOption::Basic)
			};
			opts = opts.set_indexing_options(indexing);
		}
		if self.options.stored { opts = opts.set_stored(); }
		opts
	}

	fn numeric_options(&self) -> NumericOptions {
		let mut opts = NumericOptions::default();
		// fast columns back range queries
		if self.options.indexed { opts = opts.set_indexed().set_fast(); }
		if self.options.stored { opts = opts.set_stored(); }
		opts
	}
}

/// A reusable binding of one field definition to a value slot.
///
/// A `FieldSet` owns one instance per schema field for a whole writer session
/// and overwrites values in place for each document.
#[derive(Debug, Clone)]
pub struct FieldInstance {
	name: String,
	field_type: FieldType,
	value: FieldValue,
}

impl FieldInstance {
	/// Kind is taken from the value itself.
	pub fn create(name: impl Into<String>, value: impl Into<FieldValue>, options: FieldOptions) -> Result<Self> {
		let value = value.into();
		let field_type = FieldType::define(value.kind(), options)?;
		Ok(Self { name: name.into(), field_type, value })
	}

	/// Kind is inferred from a JSON value: strings are text, integers int64,
	/// other numbers float64. Anything else is unsupported.
	pub fn from_json(name: impl Into<String>, value: &serde_json::Value, options: FieldOptions) -> Result<Self> {
		let name = name.into();
		let value = match value {
			serde_json::Value::String(s) => FieldValue::Text(s.clone()),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(v) => FieldValue::Int64(v),
				None => FieldValue::Float64(n.as_f64().ok_or_else(|| Error::config(format!("field '{name}': number {n} out of range")))?),
			},
			other => return Err(Error::config(format!("field '{name}': unsupported value kind {other}"))),
		};
		Self::create(name, value, options)
	}

	/// An `Int64` field holding the timestamp as epoch milliseconds.
	pub fn date(name: impl Into<String>, rfc3339: &str, options: FieldOptions) -> Result<Self> {
		Self::create(name, FieldValue::Int64(rfc3339_to_epoch_millis(rfc3339)?), options)
	}

	/// An instance for `def` holding the kind's zero value.
	pub fn for_definition(def: &FieldDefinition) -> Result<Self> {
		let value = match def.kind {
			FieldKind::Text => FieldValue::Text(String::new()),
			FieldKind::Int32 => FieldValue::Int32(0),
			FieldKind::Int64 => FieldValue::Int64(0),
			FieldKind::Float32 => FieldValue::Float32(0.0),
			FieldKind::Float64 => FieldValue::Float64(0.0),
		};
		Ok(Self { name: def.name.clone(), field_type: FieldType::define(def.kind, def.options)?, value })
	}

	pub fn name(&self) -> &str { &self.name }

	pub fn field_type(&self) -> FieldType { self.field_type }

	pub fn value(&self) -> &FieldValue { &self.value }

	pub fn definition(&self) -> FieldDefinition {
		FieldDefinition { name: self.name.clone(), kind: self.field_type.kind, options: self.field_type.options }
	}

	/// Overwrite the slot. Text reuses the existing buffer; 32-bit values widen
	/// into 64-bit slots; any other kind change is rejected.
	pub fn set_value(&mut self, value: &FieldValue) -> Result<()> {
		match (&mut self.value, value) {
			(FieldValue::Text(slot), FieldValue::Text(v)) => { slot.clear(); slot.push_str(v); }
			(FieldValue::Int32(slot), FieldValue::Int32(v)) => *slot = *v,
			(FieldValue::Int64(slot), FieldValue::Int64(v)) => *slot = *v,
			(FieldValue::Int64(slot), FieldValue::Int32(v)) => *slot = i64::from(*v),
			(FieldValue::Float32(slot), FieldValue::Float32(v)) => *slot = *v,
			(FieldValue::Float64(slot), FieldValue::Float64(v)) => *slot = *v,
			(FieldValue::Float64(slot), FieldValue::Float32(v)) => *slot = f64::from(*v),
			(slot, v) => {
				return Err(Error::config(format!(
					"field '{}' is {} but the document supplies {}",
					self.name,
					slot.kind(),
					v.kind()
				)))
			}
		}
		Ok(())
	}

	pub(crate) fn write_to(&self, field: Field, doc: &mut TantivyDocument) {
		match &self.value {
			FieldValue::Text(s) => doc.add_text(field, s),
			FieldValue::Int32(v) => doc.add_i64(field, i64::from(*v)),
			FieldValue::Int64(v) => doc.add_i64(field, *v),
			FieldValue::Float32(v) => doc.add_f64(field, f64::from(*v)),
			FieldValue::Float64(v) => doc.add_f64(field, *v),
		}
	}
}
