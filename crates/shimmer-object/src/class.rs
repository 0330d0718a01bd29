//! Classes for dynamic objects.
//!
//! A `ClassDef` couples a constructor with a shared behavior table that
//! instances fall back to during member lookup (a single-level prototype
//! chain). Class identity is a `ClassId`; a replacement class produced by
//! instrumentation carries the same id as the class it replaces so
//! `is_instance_of` keeps answering identically for both.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::ObjectResult;
use crate::object::{DynObject, ObjectRef, Property};
use crate::value::{FuncRef, Value};

/// Unique identifier for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(Uuid);

impl ClassId {
    /// Create a new random class ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constructor signature. Receives the class being constructed so the new
/// instance can be tagged with it.
pub type Constructor =
    Arc<dyn Fn(&ClassRef, &[Value]) -> ObjectResult<ObjectRef> + Send + Sync>;

/// A class definition: identity, name, shared behavior, constructor.
pub struct ClassDef {
    id: ClassId,
    name: String,
    behavior: Arc<RwLock<BTreeMap<String, Property>>>,
    construct: Constructor,
}

impl ClassDef {
    /// Start building a class.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }
}

/// Shared handle to a class definition.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDef>);

impl ClassRef {
    /// The class identity.
    pub fn id(&self) -> ClassId {
        self.0.id
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Construct a new instance.
    pub fn instantiate(&self, args: &[Value]) -> ObjectResult<ObjectRef> {
        (self.0.construct)(self, args)
    }

    /// Look up a shared behavior member.
    pub fn behavior_descriptor(&self, name: &str) -> Option<Property> {
        self.0.behavior.read().get(name).cloned()
    }

    /// Install (or replace) a shared behavior member.
    ///
    /// Existing instances see the change immediately; lookup goes through
    /// the live table.
    pub fn define_behavior(&self, name: impl Into<String>, property: Property) {
        self.0.behavior.write().insert(name.into(), property);
    }

    /// Names of every shared behavior member.
    pub fn behavior_names(&self) -> Vec<String> {
        self.0.behavior.read().keys().cloned().collect()
    }

    /// A replacement class with the same identity, name, and behavior table
    /// but a different constructor.
    pub fn with_constructor_override(
        &self,
        construct: impl Fn(&ClassRef, &[Value]) -> ObjectResult<ObjectRef> + Send + Sync + 'static,
    ) -> ClassRef {
        ClassRef(Arc::new(ClassDef {
            id: self.0.id,
            name: self.0.name.clone(),
            behavior: Arc::clone(&self.0.behavior),
            construct: Arc::new(construct),
        }))
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRef")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}

/// Builder for class definitions.
pub struct ClassBuilder {
    name: String,
    behavior: BTreeMap<String, Property>,
    construct: Option<Constructor>,
}

impl ClassBuilder {
    /// Start building a class with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: BTreeMap::new(),
            construct: None,
        }
    }

    /// Add a shared behavior member with an explicit descriptor.
    pub fn with_behavior(mut self, name: impl Into<String>, property: Property) -> Self {
        self.behavior.insert(name.into(), property);
        self
    }

    /// Add a shared callable member.
    pub fn with_method(
        self,
        name: impl Into<String>,
        f: impl Fn(Option<&ObjectRef>, &[Value]) -> ObjectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.with_behavior(name, Property::data(Value::Func(FuncRef::new(f))))
    }

    /// Set the constructor.
    pub fn with_constructor(
        mut self,
        f: impl Fn(&ClassRef, &[Value]) -> ObjectResult<ObjectRef> + Send + Sync + 'static,
    ) -> Self {
        self.construct = Some(Arc::new(f));
        self
    }

    /// Finish building. Classes without an explicit constructor produce
    /// empty instances tagged with the class.
    pub fn build(self) -> ClassRef {
        let construct = self.construct.unwrap_or_else(|| {
            Arc::new(|class: &ClassRef, _args: &[Value]| {
                Ok(DynObject::of_class(class.clone()).into_ref())
            })
        });
        ClassRef(Arc::new(ClassDef {
            id: ClassId::new(),
            name: self.name,
            behavior: Arc::new(RwLock::new(self.behavior)),
            construct,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObjectError;

    #[test]
    fn test_default_constructor_tags_instances() {
        let class = ClassDef::builder("Widget").build();
        let instance = class.instantiate(&[]).unwrap();

        assert_eq!(instance.class_name(), "Widget");
        assert!(instance.is_instance_of(&class));
    }

    #[test]
    fn test_custom_constructor_receives_args() {
        let class = ClassDef::builder("Player")
            .with_constructor(|class, args| {
                let volume = args.first().cloned().unwrap_or(Value::Number(50.0));
                Ok(DynObject::of_class(class.clone())
                    .with_data("volume", volume)
                    .into_ref())
            })
            .build();

        let instance = class.instantiate(&[Value::from(11i64)]).unwrap();
        assert_eq!(instance.get("volume").unwrap(), Value::Number(11.0));
    }

    #[test]
    fn test_constructor_failure_propagates() {
        let class = ClassDef::builder("Fragile")
            .with_constructor(|_class, _args| Err(ObjectError::thrown("no instances")))
            .build();
        assert!(matches!(
            class.instantiate(&[]),
            Err(ObjectError::Thrown(_))
        ));
    }

    #[test]
    fn test_constructor_override_keeps_identity_and_behavior() {
        let class = ClassDef::builder("Base")
            .with_method("ping", |_recv, _args| Ok(Value::from("pong")))
            .build();

        let original = class.clone();
        let replaced = class.with_constructor_override(move |_class, args| {
            original.instantiate(args)
        });

        assert_eq!(class.id(), replaced.id());
        assert_eq!(class, replaced);

        let instance = replaced.instantiate(&[]).unwrap();
        assert!(instance.is_instance_of(&class));
        assert_eq!(instance.call("ping", &[]).unwrap(), Value::Str("pong".to_string()));
    }

    #[test]
    fn test_behavior_changes_visible_to_existing_instances() {
        let class = ClassDef::builder("Live").build();
        let instance = class.instantiate(&[]).unwrap();
        assert!(!instance.has_member("fresh"));

        class.define_behavior("fresh", Property::data("yes"));
        assert_eq!(instance.get("fresh").unwrap(), Value::Str("yes".to_string()));
    }
}
