//! Ordered set of platforms.
//!
//! Registration order is detection precedence: when only one platform may
//! be selected, the earliest detecting platform wins, and in multi-platform
//! builds earlier platforms are built first.

use std::sync::Arc;

use crate::core::options::GeneratorOptions;
use crate::core::platform::Platform;
use crate::platforms::hugo::HugoPlatform;
use crate::platforms::node::NodePlatform;
use crate::platforms::php::PhpPlatform;
use crate::platforms::python::PythonPlatform;

/// A collection of platforms in precedence order.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Arc<dyn Platform>>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        PlatformRegistry { platforms: Vec::new() }
    }

    /// The built-in platforms: node, python, php, hugo.
    pub fn with_defaults(options: &GeneratorOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NodePlatform::new(options)));
        registry.register(Arc::new(PythonPlatform::new(options)));
        registry.register(Arc::new(PhpPlatform::new(options)));
        registry.register(Arc::new(HugoPlatform::new(options)));
        registry
    }

    /// Add a platform after the ones already registered.
    pub fn register(&mut self, platform: Arc<dyn Platform>) {
        self.platforms.push(platform);
    }

    /// Find a platform by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Platform>> {
        self.platforms.iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Platforms in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Platform>> {
        self.platforms.iter()
    }

    /// Names of all registered platforms, in order.
    pub fn names(&self) -> Vec<String> {
        self.platforms.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let registry = PlatformRegistry::with_defaults(&GeneratorOptions::new("/src"));
        assert_eq!(registry.names(), vec!["node", "python", "php", "hugo"]);
        assert_eq!(registry.names(), crate::platforms::BUILTIN_PLATFORMS);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = PlatformRegistry::with_defaults(&GeneratorOptions::new("/src"));
        assert_eq!(registry.get("PyThOn").map(|p| p.name()), Some("python"));
        assert!(registry.get("ruby").is_none());
    }
}
