//! Pinned linked-data vocabulary documents.
//!
//! Proof canonicalization must be deterministic, so the vocabulary
//! documents it depends on are embedded at compile time and served from
//! memory. The cache is constructed once at service startup, shared via
//! `Arc`, and never mutated afterwards.

use crate::error::InitializationError;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// URI of the v1 security vocabulary.
pub const SECURITY_V1_CONTEXT: &str = "https://w3id.org/security/v1";

/// URI of the v2 security vocabulary.
pub const SECURITY_V2_CONTEXT: &str = "https://w3id.org/security/v2";

const SECURITY_V1_DOCUMENT: &str = include_str!("../contexts/security-v1.jsonld");
const SECURITY_V2_DOCUMENT: &str = include_str!("../contexts/security-v2.jsonld");

/// Supplies vocabulary documents to the signature suite.
///
/// The suite consults its loader for every `@context` URI a document
/// names; canonicalization fails when a URI cannot be supplied.
pub trait DocumentLoader: Send + Sync {
    /// Look up the vocabulary document for `uri`.
    fn load(&self, uri: &str) -> Option<Arc<Value>>;
}

/// Chain this loader with a fallback consulted only on a miss.
///
/// The default configuration uses the [`ContextCache`] alone, so unknown
/// contexts fail instead of triggering a network fetch.
pub fn with_fallback<P, F>(primary: P, fallback: F) -> ChainedLoader<P, F>
where
    P: DocumentLoader,
    F: DocumentLoader,
{
    ChainedLoader(primary, fallback)
}

/// A [`DocumentLoader`] that consults a primary loader first and a
/// fallback only when the primary misses.
#[derive(Debug, Clone, Copy)]
pub struct ChainedLoader<P, F>(P, F);

impl<P: DocumentLoader, F: DocumentLoader> DocumentLoader for ChainedLoader<P, F> {
    fn load(&self, uri: &str) -> Option<Arc<Value>> {
        self.0.load(uri).or_else(|| self.1.load(uri))
    }
}

/// In-memory map of the fixed vocabulary set, keyed by URI.
///
/// No eviction, no expiry; the set is fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ContextCache {
    documents: HashMap<String, Arc<Value>>,
}

impl ContextCache {
    /// Parse the embedded vocabulary documents into the cache.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationError`] if either embedded document fails
    /// to parse. This is fatal: the service cannot produce valid
    /// signatures without its vocabularies.
    pub fn new() -> Result<Self, InitializationError> {
        let embedded = [
            (SECURITY_V1_CONTEXT, SECURITY_V1_DOCUMENT),
            (SECURITY_V2_CONTEXT, SECURITY_V2_DOCUMENT),
        ];

        let mut documents = HashMap::with_capacity(embedded.len());
        for (uri, content) in embedded {
            let document: Value =
                serde_json::from_str(content).map_err(|source| InitializationError {
                    uri: uri.to_string(),
                    source,
                })?;
            documents.insert(uri.to_string(), Arc::new(document));
        }

        tracing::debug!(contexts = documents.len(), "context cache initialized");
        Ok(Self { documents })
    }

    /// O(1) lookup of the vocabulary document for `uri`.
    #[must_use]
    pub fn lookup(&self, uri: &str) -> Option<Arc<Value>> {
        self.documents.get(uri).cloned()
    }
}

impl DocumentLoader for ContextCache {
    fn load(&self, uri: &str) -> Option<Arc<Value>> {
        self.lookup(uri)
    }
}

impl<L: DocumentLoader> DocumentLoader for Arc<L> {
    fn load(&self, uri: &str) -> Option<Arc<Value>> {
        self.as_ref().load(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn serves_embedded_vocabularies() -> TestResult {
        let cache = ContextCache::new()?;
        assert!(cache.lookup(SECURITY_V1_CONTEXT).is_some());
        assert!(cache.lookup(SECURITY_V2_CONTEXT).is_some());
        assert!(cache.lookup("https://example.com/unknown").is_none());
        Ok(())
    }

    #[test]
    fn embedded_documents_define_terms() -> TestResult {
        let cache = ContextCache::new()?;
        let v2 = cache.lookup(SECURITY_V2_CONTEXT).expect("v2 present");
        let terms = v2
            .get("@context")
            .and_then(Value::as_array)
            .and_then(|entries| entries.iter().rev().find_map(Value::as_object))
            .expect("v2 has a term map");
        assert!(terms.contains_key("Ed25519Signature2018"));
        assert!(terms.contains_key("capabilityChain"));
        Ok(())
    }

    #[test]
    fn fallback_is_consulted_only_on_miss() -> TestResult {
        struct Canned(&'static str);

        impl DocumentLoader for Canned {
            fn load(&self, uri: &str) -> Option<Arc<Value>> {
                (uri == self.0).then(|| Arc::new(Value::Null))
            }
        }

        let cache = ContextCache::new()?;
        let loader = with_fallback(cache, Canned("https://example.com/extra"));

        assert!(loader.load(SECURITY_V1_CONTEXT).is_some());
        assert!(loader.load("https://example.com/extra").is_some());
        assert!(loader.load("https://example.com/unknown").is_none());
        Ok(())
    }
}
