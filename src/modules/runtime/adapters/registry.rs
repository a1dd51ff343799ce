//! Adapter registry keyed by connector type

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{Result, RuntimeConfig, StrataError};
use strata_types::Connector;
use tracing::{debug, warn};

use super::sql::SqlAdapter;
use super::traits::Adapter;

/// Registry of adapters, one per connector type key
///
/// Registration and lookup may happen from any thread. Registering a key
/// that is already present replaces the previous adapter.
pub struct AdapterRegistry {
    adapters: Mutex<HashMap<String, Arc<dyn Adapter>>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Create a registry with a [`SqlAdapter`] for every known connector
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for connector in Connector::all() {
            registry.register(SqlAdapter::new(*connector));
        }
        registry
    }

    /// Store `adapter` under its type key, returning the adapter it replaced
    pub fn register<A: Adapter + 'static>(&self, adapter: A) -> Option<Arc<dyn Adapter>> {
        self.register_arc(Arc::new(adapter))
    }

    /// Store a shared adapter under its type key, returning the adapter it replaced
    pub fn register_arc(&self, adapter: Arc<dyn Adapter>) -> Option<Arc<dyn Adapter>> {
        let key = adapter.type_key().to_string();
        let replaced = self.adapters.lock().insert(key.clone(), adapter);
        match &replaced {
            Some(previous) => warn!(
                key = %key,
                previous = previous.type_name(),
                "replaced registered adapter"
            ),
            None => debug!(key = %key, "registered adapter"),
        }
        replaced
    }

    /// Get the adapter registered for a type key
    pub fn lookup(&self, type_key: &str) -> Result<Arc<dyn Adapter>> {
        self.adapters
            .lock()
            .get(type_key)
            .cloned()
            .ok_or_else(|| StrataError::Lookup(type_key.to_string()))
    }

    /// Name of the implementation registered for a type key
    pub fn adapter_type(&self, type_key: &str) -> Result<&'static str> {
        self.lookup(type_key).map(|adapter| adapter.type_name())
    }

    /// Get the adapter a runtime configuration connects through
    pub fn adapter_for(&self, config: &RuntimeConfig) -> Result<Arc<dyn Adapter>> {
        self.lookup(config.adapter_type())
    }

    /// Check if an adapter is registered for a type key
    pub fn has(&self, type_key: &str) -> bool {
        self.adapters.lock().contains_key(type_key)
    }

    /// Get the sorted type keys of all registered adapters
    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.adapters.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct FakeAdapter {
        key: &'static str,
    }

    impl Adapter for FakeAdapter {
        fn type_key(&self) -> &str {
            self.key
        }

        fn date_function(&self) -> &str {
            "fake_now()"
        }

        fn quote(&self, identifier: &str) -> String {
            format!("[{}]", identifier)
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = AdapterRegistry::new();
        assert!(registry.registered_keys().is_empty());
        let err = registry.lookup("postgres").err().unwrap();
        assert!(matches!(err, StrataError::Lookup(ref key) if key == "postgres"));
    }

    #[test]
    fn test_builtins() {
        let registry = AdapterRegistry::with_builtins();
        assert_eq!(
            registry.registered_keys(),
            vec!["bigquery", "postgres", "redshift", "snowflake"]
        );
        assert_eq!(registry.lookup("redshift").unwrap().date_function(), "getdate()");
        assert!(registry.adapter_type("postgres").unwrap().ends_with("SqlAdapter"));
    }

    #[test]
    fn test_register_replaces() {
        let registry = AdapterRegistry::with_builtins();
        let replaced = registry.register(FakeAdapter { key: "postgres" }).unwrap();
        assert_eq!(replaced.quote("x"), "\"x\"");

        let adapter = registry.lookup("postgres").unwrap();
        assert_eq!(adapter.quote("x"), "[x]");
        assert!(registry.adapter_type("postgres").unwrap().ends_with("FakeAdapter"));
        assert!(registry.register(FakeAdapter { key: "duckdb" }).is_none());
        assert!(registry.has("duckdb"));
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(AdapterRegistry::new());
        let keys = ["a", "b", "c", "d", "e", "f", "g", "h"];

        let handles: Vec<_> = keys
            .iter()
            .copied()
            .map(|key| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry.register(FakeAdapter { key });
                    registry.lookup(key).is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.registered_keys().len(), keys.len());
    }
}
