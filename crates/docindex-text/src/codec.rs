//! Document codec: value maps to engine documents and back.
//!
//! `FieldSet` is the write-side arena and is `&mut`-only: one writer session
//! owns it and binds documents sequentially. To bind from several threads
//! call [`encode_fresh`], which allocates a new set per document.

use tantivy::schema::{Field, Schema, Value};
use tantivy::TantivyDocument;

use docindex_core::types::{DocumentValueMap, FieldKind, FieldValue, IndexSchema};
use docindex_core::{Error, Result};

use crate::registry::FieldInstance;

#[derive(Debug)]
pub struct FieldSet {
	slots: Vec<(Field, FieldInstance)>,
}

impl FieldSet {
	/// Resolve every schema field against the engine schema once.
	pub fn new(schema: &IndexSchema, engine: &Schema) -> Result<Self> {
		let mut slots = Vec::with_capacity(schema.fields().len());
		for def in schema.fields() {
			let field = engine
				.get_field(&def.name)
				.map_err(|_| Error::config(format!("field '{}' is not in the index schema", def.name)))?;
			slots.push((field, FieldInstance::for_definition(def)?));
		}
		Ok(Self { slots })
	}

	pub fn len(&self) -> usize { self.slots.len() }

	pub fn is_empty(&self) -> bool { self.slots.is_empty() }

	/// Overwrite every slot from `values` and assemble one document.
	/// Every schema field must be present in the map.
	pub fn bind(&mut self, values: &DocumentValueMap) -> Result<TantivyDocument> {
		let mut doc = TantivyDocument::default();
		for (field, instance) in &mut self.slots {
			let value = values
				.get(instance.name())
				.ok_or_else(|| Error::config(format!("document is missing field '{}'", instance.name())))?;
			instance.set_value(value)?;
			instance.write_to(*field, &mut doc);
		}
		Ok(doc)
	}
}

/// Bind with a throwaway field set. Safe to call from any number of threads.
pub fn encode_fresh(schema: &IndexSchema, engine: &Schema, values: &DocumentValueMap) -> Result<TantivyDocument> {
	FieldSet::new(schema, engine)?.bind(values)
}

/// Rebuild the stored fields of a document, typed by the logical schema.
/// Fields that are not stored, or have no value, are left out.
pub fn to_value_map(schema: &IndexSchema, engine: &Schema, doc: &TantivyDocument) -> DocumentValueMap {
	let mut out = DocumentValueMap::new();
	for def in schema.fields().iter().filter(|d| d.options.stored) {
		let Ok(field) = engine.get_field(&def.name) else { continue };
		let Some(v) = doc.get_first(field) else { continue };
		#[allow(clippy::cast_possible_truncation)]
		let value = match def.kind {
			FieldKind::Text => v.as_str().map(|s| FieldValue::Text(s.to_string())),
			FieldKind::Int32 => v.as_i64().and_then(|n| i32::try_from(n).ok()).map(FieldValue::Int32),
			FieldKind::Int64 => v.as_i64().map(FieldValue::Int64),
			FieldKind::Float32 => v.as_f64().map(|n| FieldValue::Float32(n as f32)),
			FieldKind::Float64 => v.as_f64().map(FieldValue::Float64),
		};
		if let Some(value) = value {
			out.insert(def.name.clone(), value);
		}
	}
	out
}
