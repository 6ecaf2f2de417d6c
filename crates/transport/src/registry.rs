//! Name to implementation mapping, materialized on first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::warn;

/// Registry of named implementations of one capability category.
///
/// Reads take a shared lock, so lookups during chain construction may run
/// concurrently. Registering while chains are being built is allowed but the
/// caller decides which build observes the new entry.
pub struct Registry<T: ?Sized> {
    entries: OnceCell<RwLock<HashMap<String, Arc<T>>>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Registry<T> {
    /// Creates an empty registry. No storage is allocated until first use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: OnceCell::new(),
        }
    }

    fn entries(&self) -> &RwLock<HashMap<String, Arc<T>>> {
        self.entries.get_or_init(|| RwLock::new(HashMap::new()))
    }

    /// Registers `implementation` under `name`. Names are unique: a later
    /// registration replaces the earlier one, which is returned.
    pub fn register(&self, name: impl Into<String>, implementation: Arc<T>) -> Option<Arc<T>> {
        let name = name.into();
        let previous = self.entries().write().insert(name.clone(), implementation);
        if previous.is_some() {
            warn!(%name, "replaced registered implementation");
        }
        previous
    }

    /// Removes the entry under `name`.
    pub fn unregister(&self, name: &str) -> Option<Arc<T>> {
        self.entries().write().remove(name)
    }

    /// Looks up `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries().read().get(name).cloned()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries().read().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.get().map_or(0, |entries| entries.read().len())
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("initialized", &self.entries.get().is_some())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazily_materialized() {
        let registry: Registry<str> = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.entries.get().is_none());

        assert!(registry.get("tcp").is_none());
        assert!(registry.entries.get().is_some());
    }

    #[test]
    fn register_replaces_existing() {
        let registry: Registry<str> = Registry::new();
        assert!(registry.register("tcp", Arc::from("first")).is_none());
        let replaced = registry.register("tcp", Arc::from("second"));
        assert_eq!(replaced.as_deref(), Some("first"));
        registry.register("udp", Arc::from("third"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("tcp").as_deref(), Some("second"));
        assert_eq!(registry.names(), vec!["tcp".to_string(), "udp".to_string()]);

        assert!(registry.unregister("tcp").is_some());
        assert!(!registry.contains("tcp"));
    }
}
