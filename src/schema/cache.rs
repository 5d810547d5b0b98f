//! # Materialized Schema Cache
//!
//! Materializing walks the document and expands every `$ref`; doing that on every
//! request is wasted work because the document never changes once loaded. This cache
//! keeps the resulting [`Schema`] values behind `Arc` and shares them across
//! coroutines.
//!
//! ## Cache Key Structure
//!
//! Keys are `{version}:{hash}:{reference}` where `version`/`hash` come from the
//! [`SpecVersion`] of the document the schema was materialized from. A schema
//! materialized from one document is never served for another, even if both contain
//! the same reference.
//!
//! ## Thread Safety
//!
//! `Arc<RwLock<HashMap>>`: lookups take the read lock, insertions the write lock
//! with a double check. Materialization failures are returned to the caller and never
//! cached.
//!
//! The cache can be disabled with `USERAPI_SCHEMA_CACHE=off` (see
//! [`ServiceConfig`](crate::config::ServiceConfig)); every call then materializes.

use super::error::SchemaError;
use super::materialize::materialize_ref;
use super::model::Schema;
use super::pointer::Reference;
use crate::spec::{Document, SpecVersion};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SchemaCache {
    cache: Arc<RwLock<HashMap<String, Arc<Schema>>>>,
    enabled: bool,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SchemaCache {
    pub fn new(enabled: bool) -> Self {
        info!(enabled = enabled, "Initializing materialized schema cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
        }
    }

    fn cache_key(version: &SpecVersion, reference: &Reference) -> String {
        format!("{}:{}", version.to_key(), reference)
    }

    /// Return the cached schema for `reference`, materializing it on a miss.
    pub fn get_or_materialize(
        &self,
        doc: &Document,
        reference: &Reference,
    ) -> Result<Arc<Schema>, SchemaError> {
        if !self.enabled {
            return materialize_ref(doc, reference).map(Arc::new);
        }

        let key = Self::cache_key(doc.version(), reference);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(schema) = cache.get(&key) {
                debug!(reference = %reference, cache_key = %key, "Schema cache hit");
                return Ok(Arc::clone(schema));
            }
        }

        let schema = Arc::new(materialize_ref(doc, reference)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = cache.get(&key) {
            debug!(reference = %reference, "Schema materialized concurrently, keeping first");
            return Ok(Arc::clone(existing));
        }
        cache.insert(key.clone(), Arc::clone(&schema));
        info!(
            reference = %reference,
            cache_key = %key,
            cache_size = cache.len(),
            "Schema materialized and cached"
        );
        Ok(schema)
    }

    /// Materialize every reference up front. Returns how many succeeded; failures are
    /// logged and will surface again when the reference is requested.
    pub fn precompile<'r>(&self, doc: &Document, references: impl IntoIterator<Item = &'r Reference>) -> usize {
        let mut compiled = 0;
        for reference in references {
            match self.get_or_materialize(doc, reference) {
                Ok(_) => compiled += 1,
                Err(e) => warn!(reference = %reference, error = %e, "Failed to precompile schema"),
            }
        }
        info!(compiled = compiled, "Schemas precompiled");
        compiled
    }

    pub fn size(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = cache.len();
        cache.clear();
        info!(dropped = dropped, "Schema cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(title: &str) -> Document {
        Document::from_value(json!({
            "swagger": "2.0",
            "info": { "title": title },
            "definitions": {
                "User": { "type": "object", "properties": { "id": { "type": "integer" } } },
                "Loop": { "$ref": "#/definitions/Loop" }
            }
        }))
    }

    #[test]
    fn test_hit_returns_same_arc() {
        let cache = SchemaCache::new(true);
        let d = doc("a");
        let r = Reference::parse("#/definitions/User").unwrap();
        let first = cache.get_or_materialize(&d, &r).unwrap();
        let second = cache.get_or_materialize(&d, &r).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_documents_do_not_share_entries() {
        let cache = SchemaCache::new(true);
        let r = Reference::parse("#/definitions/User").unwrap();
        cache.get_or_materialize(&doc("a"), &r).unwrap();
        cache.get_or_materialize(&doc("b"), &r).unwrap();
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = SchemaCache::new(true);
        let d = doc("a");
        let r = Reference::parse("#/definitions/Loop").unwrap();
        assert!(matches!(
            cache.get_or_materialize(&d, &r),
            Err(SchemaError::CyclicReference { .. })
        ));
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = SchemaCache::new(false);
        let d = doc("a");
        let r = Reference::parse("#/definitions/User").unwrap();
        assert!(cache.get_or_materialize(&d, &r).is_ok());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_precompile_counts_successes() {
        let cache = SchemaCache::new(true);
        let d = doc("a");
        let refs = [
            Reference::parse("#/definitions/User").unwrap(),
            Reference::parse("#/definitions/Loop").unwrap(),
        ];
        assert_eq!(cache.precompile(&d, &refs), 1);
        cache.clear();
        assert_eq!(cache.size(), 0);
    }
}
