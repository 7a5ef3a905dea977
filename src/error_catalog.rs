//! Model-indexed map from a drive's numeric error code to a human description and advice.
//!
//! Catalogs are loaded lazily, at most once per model; the source of that data (a YAML resource,
//! an embedded table, whatever a given deployment wants) is out of this crate's scope — only the
//! [`ErrorCatalogSource`] trait boundary is specified, mirroring how ESI parsing and config-file
//! loading are out of scope elsewhere in this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A single looked-up error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: u32,
    pub description: String,
    pub advice: String,
}

impl ErrorEntry {
    fn unknown(code: u32) -> Self {
        Self {
            code,
            description: format!("Unknown error code {code}"),
            advice: "Contact technical support".to_string(),
        }
    }
}

/// A model's error code table, as returned by an [`ErrorCatalogSource`].
#[derive(Debug, Clone, Default)]
pub struct ErrorCatalog {
    entries: HashMap<u32, ErrorEntry>,
}

impl ErrorCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = ErrorEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.code, e)).collect(),
        }
    }

    /// Look up a code. An unrecognized code yields a synthesized "unknown error code" entry
    /// rather than an `Option::None` — callers never need to special-case a missing lookup.
    pub fn lookup(&self, code: u32) -> ErrorEntry {
        self.entries
            .get(&code)
            .cloned()
            .unwrap_or_else(|| ErrorEntry::unknown(code))
    }
}

/// External collaborator that produces a model's [`ErrorCatalog`] the first time it is needed.
/// Implementations typically read a vendor-supplied resource (YAML, an embedded table, ...); that
/// resource format is out of this crate's scope.
pub trait ErrorCatalogSource: Send + Sync {
    fn load(&self, model_id: &str) -> ErrorCatalog;
}

/// Process-wide, lazily-populated, at-most-once-per-model cache of error catalogs.
///
/// Initialization is idempotent and safe under concurrent first access, per §4.2's contract, even
/// though the cyclic pipeline itself only ever calls from a single thread (§5) — multiple adapters
/// of the same model may race to initialize it during startup, before the pipeline's steady-state
/// single-threaded loop begins.
pub struct ErrorCatalogRegistry<S> {
    source: S,
    cache: Mutex<HashMap<String, Arc<ErrorCatalog>>>,
}

impl<S: ErrorCatalogSource> ErrorCatalogRegistry<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the catalog for `model_id`, loading it via the [`ErrorCatalogSource`] on first
    /// access and memoizing it for every subsequent call.
    pub fn get(&self, model_id: &str) -> Arc<ErrorCatalog> {
        let mut cache = self.cache.lock().expect("error catalog cache poisoned");
        cache
            .entry(model_id.to_string())
            .or_insert_with(|| Arc::new(self.source.load(model_id)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
    }

    impl ErrorCatalogSource for CountingSource {
        fn load(&self, _model_id: &str) -> ErrorCatalog {
            self.loads.fetch_add(1, Ordering::SeqCst);
            ErrorCatalog::from_entries([ErrorEntry {
                code: 0x7305,
                description: "Overcurrent".to_string(),
                advice: "Check motor wiring".to_string(),
            }])
        }
    }

    #[test]
    fn unknown_code_is_synthesized() {
        let catalog = ErrorCatalog::from_entries([]);
        let entry = catalog.lookup(0xDEAD);
        assert_eq!(entry.description, "Unknown error code 57005");
        assert_eq!(entry.advice, "Contact technical support");
    }

    #[test]
    fn known_code_round_trips() {
        let catalog = ErrorCatalog::from_entries([ErrorEntry {
            code: 0x7305,
            description: "Overcurrent".to_string(),
            advice: "Check motor wiring".to_string(),
        }]);
        let entry = catalog.lookup(0x7305);
        assert_eq!(entry.description, "Overcurrent");
    }

    #[test]
    fn registry_loads_each_model_at_most_once() {
        let registry = ErrorCatalogRegistry::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let a = registry.get("c5e");
        let b = registry.get("c5e");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.source.loads.load(Ordering::SeqCst), 1);

        registry.get("other-model");
        assert_eq!(registry.source.loads.load(Ordering::SeqCst), 2);
    }
}
