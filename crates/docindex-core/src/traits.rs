use crate::types::{DocumentValueMap, IndexSchema};

/// Upstream collaborator (e.g. a scraper) that delivers one value map per
/// logical document. Every key the schema requires must be present.
pub trait DocumentSource {
    fn documents(&self, schema: &IndexSchema) -> anyhow::Result<Vec<DocumentValueMap>>;
}
