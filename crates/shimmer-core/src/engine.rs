//! The interception engine: shared registry and identity state.

use std::sync::Arc;

use dashmap::DashMap;
use shimmer_object::{ClassId, ObjectRef};
use tracing::debug;

use crate::config::TraceConfig;

/// Shared state behind every [`ShimEngine`] clone.
pub(crate) struct EngineState {
    /// Instrumentation configs keyed by the class they were registered
    /// for. Consulted when intercepted calls return fresh objects.
    pub(crate) registry: DashMap<ClassId, TraceConfig>,
    /// Per-class-name counters backing generated identities.
    counters: DashMap<String, u64>,
}

/// Entry point for instrumenting classes, objects, and members.
///
/// The engine owns the class registry used for recursive
/// instrumentation and the counters behind generated identities.
/// Clones share state, so shims installed by one handle keep working
/// through any other.
#[derive(Clone)]
pub struct ShimEngine {
    pub(crate) state: Arc<EngineState>,
}

impl ShimEngine {
    /// Creates an engine with an empty registry.
    pub fn new() -> Self {
        Self {
            state: Arc::new(EngineState {
                registry: DashMap::new(),
                counters: DashMap::new(),
            }),
        }
    }

    /// Records that instances of `class` should be instrumented with
    /// `config` whenever the engine encounters them.
    pub(crate) fn register_class(&self, class: ClassId, name: &str, config: &TraceConfig) {
        self.state.registry.insert(class, config.clone());
        debug!(class = name, "registered class for instrumentation");
    }

    /// Looks up the config registered for a class, if any.
    pub(crate) fn registered_config(&self, class: ClassId) -> Option<TraceConfig> {
        self.state.registry.get(&class).map(|entry| entry.value().clone())
    }

    /// Returns the display identity for an instance, assigning one if
    /// it has none yet.
    ///
    /// The configured id member is consulted first, but only through
    /// stored values; native accessors are never invoked here, so
    /// identity resolution cannot trigger the shims that call it.
    /// Otherwise a `ClassName_N` identity is generated, with `N`
    /// counting instances of that class name from 1, and pinned to the
    /// instance so it never changes.
    pub fn identity_of(&self, instance: &ObjectRef, config: &TraceConfig) -> String {
        if !config.id_property.is_empty() {
            if let Some(value) = instance.raw_value(&config.id_property) {
                if !value.is_null() {
                    return value.display_string();
                }
            }
        }
        if let Some(identity) = instance.assigned_identity() {
            return identity;
        }
        let class_name = instance.class_name();
        let ordinal = {
            let mut counter = self.state.counters.entry(class_name.clone()).or_insert(1);
            let ordinal = *counter;
            *counter += 1;
            ordinal
        };
        let identity = format!("{class_name}_{ordinal}");
        instance.assign_identity(identity.clone());
        identity
    }
}

impl Default for ShimEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shimmer_object::{ClassBuilder, DynObject, Value};

    #[test]
    fn test_generated_identity_is_stable() {
        let engine = ShimEngine::new();
        let config = TraceConfig::new();
        let object = DynObject::new().into_ref();
        let first = engine.identity_of(&object, &config);
        let second = engine.identity_of(&object, &config);
        assert_eq!(first, "Object_1");
        assert_eq!(first, second);
    }

    #[test]
    fn test_identities_count_per_class_name() {
        let engine = ShimEngine::new();
        let config = TraceConfig::new();
        let player = ClassBuilder::new("Player").build();
        let a = player.instantiate(&[]).unwrap();
        let b = player.instantiate(&[]).unwrap();
        let other = DynObject::new().into_ref();
        assert_eq!(engine.identity_of(&a, &config), "Player_1");
        assert_eq!(engine.identity_of(&b, &config), "Player_2");
        assert_eq!(engine.identity_of(&other, &config), "Object_1");
    }

    #[test]
    fn test_id_property_wins_over_generated() {
        let engine = ShimEngine::new();
        let config = TraceConfig::new();
        let object = DynObject::new()
            .with_data("id", Value::from("left-panel"))
            .into_ref();
        assert_eq!(engine.identity_of(&object, &config), "left-panel");
        // The stored value is read fresh on every resolution.
        object.set("id", Value::from("right-panel")).unwrap();
        assert_eq!(engine.identity_of(&object, &config), "right-panel");
    }

    #[test]
    fn test_null_id_property_falls_back() {
        let engine = ShimEngine::new();
        let config = TraceConfig::new();
        let object = DynObject::new().with_data("id", Value::Null).into_ref();
        assert_eq!(engine.identity_of(&object, &config), "Object_1");
    }

    #[test]
    fn test_registry_round_trip() {
        let engine = ShimEngine::new();
        let config = TraceConfig::new().with_methods(false);
        let player = ClassBuilder::new("Player").build();
        assert!(engine.registered_config(player.id()).is_none());
        engine.register_class(player.id(), player.name(), &config);
        let found = engine.registered_config(player.id()).unwrap();
        assert!(!found.methods);
    }
}
