//! Generator Registry
//!
//! Owns one instance of every generator, keyed by its type id. Population is
//! an explicit bootstrap step ([`Registry::builtin`]); after that the registry
//! is only read, so lookups from many threads need no locking.

use super::{
    AwsFindingGenerator, Generator, SuricataGenerator, SystemMetricsGenerator,
    WindowsAuditGenerator,
};
use crate::error::GenerateError;
use crate::event::{EventType, Fields, GeneratedEvent};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::builtin);

/// Process-wide registry holding the builtin generators, built on first use.
///
/// Convenience for library callers and tests. Binaries should build their own
/// with [`Registry::builtin`] at startup and pass it down.
pub fn global() -> &'static Registry {
    &GLOBAL
}

pub struct Registry {
    /// Generators in registration order
    generators: Vec<Box<dyn Generator>>,
    /// Type id -> position in `generators`
    index: HashMap<String, usize>,
}

impl Registry {
    /// Empty registry; call [`Registry::register`] for each generator.
    pub fn new() -> Self {
        Self {
            generators: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registry populated with every builtin generator.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SuricataGenerator::new()));
        registry.register(Box::new(AwsFindingGenerator::new()));
        registry.register(Box::new(WindowsAuditGenerator::new()));
        registry.register(Box::new(SystemMetricsGenerator::new()));
        registry
    }

    /// Add a generator under its `describe_type().id`.
    ///
    /// # Panics
    /// Registering the same type id twice is a programming error.
    pub fn register(&mut self, generator: Box<dyn Generator>) {
        let id = generator.describe_type().id.clone();
        assert!(
            !self.index.contains_key(&id),
            "generator `{id}` registered twice"
        );
        debug!(event_type = %id, templates = generator.list_templates().len(), "Registered generator");
        self.index.insert(id, self.generators.len());
        self.generators.push(generator);
    }

    /// Resolve a generator by type id.
    pub fn get(&self, type_id: &str) -> Result<&dyn Generator, GenerateError> {
        self.index
            .get(type_id)
            .map(|&i| self.generators[i].as_ref())
            .ok_or_else(|| GenerateError::UnknownType(type_id.to_string()))
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.index.contains_key(type_id)
    }

    /// Descriptors of every registered type, in registration order.
    pub fn types(&self) -> Vec<&EventType> {
        self.generators.iter().map(|g| g.describe_type()).collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Resolve `type_id` and generate one event from `template_id`.
    pub fn generate(
        &self,
        type_id: &str,
        template_id: &str,
        overrides: &Fields,
    ) -> Result<GeneratedEvent, GenerateError> {
        self.get(type_id)?.generate(template_id, overrides)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registration_order() {
        let registry = Registry::builtin();
        let ids: Vec<&str> = registry.types().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["suricata", "aws-guardduty", "windows-security", "system-metrics"]
        );
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let registry = Registry::builtin();
        let err = registry.get("zeek").err().unwrap();
        assert!(matches!(err, GenerateError::UnknownType(ref id) if id == "zeek"));
        assert!(err.is_not_found());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_registration_panics() {
        let mut registry = Registry::builtin();
        registry.register(Box::new(SuricataGenerator::new()));
    }

    #[test]
    fn test_generate_delegates_to_generator() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        let event = global()
            .generate("system-metrics", "load-average", &Fields::new())
            .unwrap();
        assert_eq!(event.event_type(), "system-metrics");
        assert_eq!(event.event_id(), "load.1m");
    }

    #[test]
    fn test_concurrent_lookups() {
        let registry = global();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(move || {
                    for ty in ["suricata", "aws-guardduty", "windows-security", "system-metrics"] {
                        assert!(registry.get(ty).is_ok());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
