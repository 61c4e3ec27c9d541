//! Transform registry
//!
//! Maps a stable key to a constructor. Every run builds fresh instances,
//! so no transform state is shared between files or threads. Adding a
//! transform means adding an entry here.

use super::{Category, Transform, TransformError};

pub type Constructor = fn() -> Box<dyn Transform>;

#[derive(Clone)]
pub struct RegistryEntry {
    pub key: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub constructor: Constructor,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("key", &self.key)
            .field("category", &self.category)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    entries: Vec<RegistryEntry>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in chisel
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::chisels::register_builtins(&mut registry);
        registry
    }

    /// Add an entry, replacing any with the same key
    pub fn register(&mut self, entry: RegistryEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn create(&self, key: &str) -> Result<Box<dyn Transform>, TransformError> {
        self.get(key)
            .map(|entry| (entry.constructor)())
            .ok_or_else(|| TransformError::UnknownTransform {
                key: key.to_string(),
            })
    }

    /// Entries of one category, in registration order
    pub fn category(&self, category: Category) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Fresh instances of a category's transforms, minus `disabled` keys
    pub fn instantiate(&self, category: Category, disabled: &[String]) -> Vec<Box<dyn Transform>> {
        self.category(category)
            .filter(|e| !disabled.iter().any(|d| d == e.key))
            .map(|e| (e.constructor)())
            .collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_builtins_cover_every_category() {
        let registry = TransformRegistry::with_builtins();
        for category in Category::ALL {
            assert!(
                registry.category(category).next().is_some(),
                "no transform in {category}"
            );
        }
        for entry in registry.entries() {
            let transform = (entry.constructor)();
            assert_eq!(transform.key(), entry.key);
            assert_eq!(transform.category(), entry.category);
        }
    }

    #[test]
    fn test_create_and_disable() {
        let registry = TransformRegistry::with_builtins();
        assert_eq!(registry.create("unused_defs").unwrap().key(), "unused_defs");
        assert_matches!(
            registry.create("nope").err(),
            Some(TransformError::UnknownTransform { key }) if key == "nope"
        );

        let all = registry.instantiate(Category::Clean, &[]);
        let some = registry.instantiate(Category::Clean, &["empty_groups".to_string()]);
        assert_eq!(all.len(), some.len() + 1);
        assert!(some.iter().all(|t| t.key() != "empty_groups"));
    }

    #[test]
    fn test_register_replaces_key() {
        let mut registry = TransformRegistry::with_builtins();
        let before = registry.len();
        let entry = registry.get("reformat").cloned().unwrap();
        registry.register(RegistryEntry {
            description: "replaced",
            ..entry
        });
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("reformat").unwrap().description, "replaced");
    }
}
