//! Dynamic objects with reflective member access.
//!
//! A `DynObject` is an open bag of named members described by `Property`
//! descriptors (the data/accessor split of dynamic object models), an
//! optional class providing shared behavior, and a listener table for
//! events. `ObjectRef` is the shared handle the rest of the system works
//! with; none of its operations hold the interior lock while running
//! user-provided accessors, mutators, methods, or listeners.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::class::ClassRef;
use crate::error::{ObjectError, ObjectResult};
use crate::value::{FuncRef, Value};

/// Conventional name of the generic listener-registration method.
pub const LISTENER_REGISTRATION: &str = "add_listener";

/// Shared storage cell behind an accessor pair that fronts a plain value.
pub type ValueCell = Arc<RwLock<Value>>;

/// Native accessor function for a member.
pub type Getter = Arc<dyn Fn(&ObjectRef) -> ObjectResult<Value> + Send + Sync>;

/// Native mutator function for a member.
pub type Setter = Arc<dyn Fn(&ObjectRef, Value) -> ObjectResult<()> + Send + Sync>;

/// Member descriptor: a stored value or an accessor/mutator pair.
#[derive(Clone)]
pub enum Property {
    /// Plain stored value.
    Data {
        /// Current value.
        value: Value,
        /// Whether assignment is permitted.
        writable: bool,
        /// Whether the member shows up in enumeration.
        enumerable: bool,
        /// Whether the member may be redefined.
        configurable: bool,
    },
    /// Accessor/mutator pair.
    Accessor {
        /// Accessor invoked on reads.
        get: Option<Getter>,
        /// Mutator invoked on writes.
        set: Option<Setter>,
        /// Storage cell when the pair fronts a plain stored value.
        ///
        /// Lets identity lookup read the current value without re-entering
        /// the accessor.
        backing: Option<ValueCell>,
        /// Whether the member shows up in enumeration.
        enumerable: bool,
        /// Whether the member may be redefined.
        configurable: bool,
    },
}

impl Property {
    /// A writable, enumerable, configurable stored value.
    pub fn data(value: impl Into<Value>) -> Self {
        Property::Data {
            value: value.into(),
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// A read-only, enumerable, configurable stored value.
    pub fn read_only(value: impl Into<Value>) -> Self {
        Property::Data {
            value: value.into(),
            writable: false,
            enumerable: true,
            configurable: true,
        }
    }

    /// An accessor/mutator pair with no backing cell.
    pub fn accessor(get: Option<Getter>, set: Option<Setter>) -> Self {
        Property::Accessor {
            get,
            set,
            backing: None,
            enumerable: true,
            configurable: true,
        }
    }

    /// Whether the member shows up in enumeration.
    pub fn is_enumerable(&self) -> bool {
        match self {
            Property::Data { enumerable, .. } | Property::Accessor { enumerable, .. } => {
                *enumerable
            }
        }
    }

    /// Whether the member may be redefined.
    pub fn is_configurable(&self) -> bool {
        match self {
            Property::Data { configurable, .. } | Property::Accessor { configurable, .. } => {
                *configurable
            }
        }
    }

    /// Copy of this descriptor with `enumerable` overridden.
    pub fn with_enumerable(mut self, value: bool) -> Self {
        match &mut self {
            Property::Data { enumerable, .. } | Property::Accessor { enumerable, .. } => {
                *enumerable = value;
            }
        }
        self
    }

    /// Copy of this descriptor with `configurable` overridden.
    pub fn with_configurable(mut self, value: bool) -> Self {
        match &mut self {
            Property::Data { configurable, .. } | Property::Accessor { configurable, .. } => {
                *configurable = value;
            }
        }
        self
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => f
                .debug_struct("Data")
                .field("value", value)
                .field("writable", writable)
                .field("enumerable", enumerable)
                .field("configurable", configurable)
                .finish(),
            Property::Accessor {
                get,
                set,
                backing,
                enumerable,
                configurable,
            } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .field("backing", &backing.is_some())
                .field("enumerable", enumerable)
                .field("configurable", configurable)
                .finish(),
        }
    }
}

/// A dynamic object: named members, optional class, listener table, and the
/// per-instance slots the instrumentation engine relies on.
pub struct DynObject {
    class: Option<ClassRef>,
    properties: BTreeMap<String, Property>,
    listeners: BTreeMap<String, Vec<Value>>,
    instrumented: bool,
    observed_events: BTreeSet<String>,
    assigned_identity: Option<String>,
}

impl DynObject {
    /// Create an empty, classless object.
    pub fn new() -> Self {
        Self {
            class: None,
            properties: BTreeMap::new(),
            listeners: BTreeMap::new(),
            instrumented: false,
            observed_events: BTreeSet::new(),
            assigned_identity: None,
        }
    }

    /// Create an empty instance of the given class.
    pub fn of_class(class: ClassRef) -> Self {
        Self {
            class: Some(class),
            ..Self::new()
        }
    }

    /// Add a member with an explicit descriptor.
    pub fn with_member(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Add a plain data member.
    pub fn with_data(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_member(name, Property::data(value))
    }

    /// Add a callable member.
    pub fn with_method(
        self,
        name: impl Into<String>,
        f: impl Fn(Option<&ObjectRef>, &[Value]) -> ObjectResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.with_member(name, Property::data(Value::Func(FuncRef::new(f))))
    }

    /// Install the conventional listener-registration method.
    ///
    /// The method is non-enumerable so generic member enumeration skips it;
    /// callers that care about events look it up by name.
    pub fn with_listener_support(self) -> Self {
        let register = FuncRef::new(|recv, args| {
            let recv = recv
                .ok_or_else(|| ObjectError::MissingReceiver(LISTENER_REGISTRATION.to_string()))?;
            let event = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| ObjectError::thrown("add_listener: event name required"))?
                .to_string();
            let listener = args.get(1).cloned().unwrap_or(Value::Null);
            recv.register_listener(&event, listener);
            Ok(Value::Null)
        });
        self.with_member(
            LISTENER_REGISTRATION,
            Property::data(Value::Func(register)).with_enumerable(false),
        )
    }

    /// Finish construction, producing a shared handle.
    pub fn into_ref(self) -> ObjectRef {
        ObjectRef(Arc::new(RwLock::new(self)))
    }
}

impl Default for DynObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a dynamic object.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<DynObject>>);

impl ObjectRef {
    /// The object's class, if it has one.
    pub fn class(&self) -> Option<ClassRef> {
        self.0.read().class.clone()
    }

    /// Replace the object's class tag.
    ///
    /// Used by wrapper instrumentation so type-identity checks against the
    /// original class keep succeeding.
    pub fn set_class(&self, class: Option<ClassRef>) {
        self.0.write().class = class;
    }

    /// The object's class name, or `"Object"` for classless objects.
    pub fn class_name(&self) -> String {
        self.class()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "Object".to_string())
    }

    /// Check whether the object is an instance of the given class.
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.class().is_some_and(|c| c.id() == class.id())
    }

    /// Read a member, running its accessor if it has one.
    pub fn get(&self, name: &str) -> ObjectResult<Value> {
        match self.lookup(name) {
            Some(Property::Data { value, .. }) => Ok(value),
            Some(Property::Accessor { get: Some(get), .. }) => get(self),
            Some(Property::Accessor { get: None, .. }) => {
                Err(ObjectError::NoGetter(name.to_string()))
            }
            None => Err(ObjectError::NoSuchMember(name.to_string())),
        }
    }

    /// Write a member, running its mutator if it has one.
    ///
    /// Assignment to a name the object does not own creates a plain data
    /// member, shadowing any class behavior of the same name unless the
    /// behavior member exposes a mutator.
    pub fn set(&self, name: &str, value: Value) -> ObjectResult<()> {
        let own = self.0.read().properties.get(name).cloned();
        match own {
            Some(Property::Data { writable: true, .. }) => {
                let mut object = self.0.write();
                if let Some(Property::Data { value: slot, .. }) = object.properties.get_mut(name) {
                    *slot = value;
                }
                Ok(())
            }
            Some(Property::Data { writable: false, .. })
            | Some(Property::Accessor { set: None, .. }) => {
                Err(ObjectError::NotWritable(name.to_string()))
            }
            Some(Property::Accessor { set: Some(set), .. }) => set(self, value),
            None => {
                let behavior = self.class().and_then(|c| c.behavior_descriptor(name));
                if let Some(Property::Accessor { set: Some(set), .. }) = behavior {
                    set(self, value)
                } else {
                    self.0
                        .write()
                        .properties
                        .insert(name.to_string(), Property::data(value));
                    Ok(())
                }
            }
        }
    }

    /// Invoke a callable member with the object as the receiver.
    pub fn call(&self, name: &str, args: &[Value]) -> ObjectResult<Value> {
        match self.get(name)? {
            Value::Func(f) => f.call(Some(self), args),
            _ => Err(ObjectError::NotCallable(name.to_string())),
        }
    }

    /// Install (or replace) a member descriptor, bypassing writability.
    pub fn define(&self, name: impl Into<String>, property: Property) {
        self.0.write().properties.insert(name.into(), property);
    }

    /// The member's descriptor, consulting own members then class behavior.
    pub fn descriptor(&self, name: &str) -> Option<Property> {
        self.lookup(name)
    }

    /// The member's own descriptor, ignoring class behavior.
    pub fn own_descriptor(&self, name: &str) -> Option<Property> {
        self.0.read().properties.get(name).cloned()
    }

    /// Check whether a member exists on the object or its class behavior.
    pub fn has_member(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every member name: own members plus class behavior.
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.read().properties.keys().cloned().collect();
        if let Some(class) = self.class() {
            for name in class.behavior_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Enumerable member names: own members plus un-shadowed class behavior.
    pub fn enumerable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = {
            let object = self.0.read();
            object
                .properties
                .iter()
                .filter(|(_, p)| p.is_enumerable())
                .map(|(k, _)| k.clone())
                .collect()
        };
        if let Some(class) = self.class() {
            for name in class.behavior_names() {
                let shadowed = self.0.read().properties.contains_key(&name);
                if shadowed || names.contains(&name) {
                    continue;
                }
                if class
                    .behavior_descriptor(&name)
                    .is_some_and(|p| p.is_enumerable())
                {
                    names.push(name);
                }
            }
        }
        names
    }

    /// The member's current value without running interception.
    ///
    /// Answers for plain stored values and for accessor pairs that front a
    /// stored value; pure native accessors yield `None`.
    pub fn raw_value(&self, name: &str) -> Option<Value> {
        match self.lookup(name)? {
            Property::Data { value, .. } => Some(value),
            Property::Accessor {
                backing: Some(cell),
                ..
            } => Some(cell.read().clone()),
            Property::Accessor { .. } => None,
        }
    }

    /// Whether the object has passed through instrumentation.
    pub fn instrumented(&self) -> bool {
        self.0.read().instrumented
    }

    /// Mark the object as instrumented.
    pub fn set_instrumented(&self, value: bool) {
        self.0.write().instrumented = value;
    }

    /// Record an event name as observed. Returns `false` if already present.
    pub fn observe_event(&self, event: &str) -> bool {
        self.0.write().observed_events.insert(event.to_string())
    }

    /// Check whether an event name is already observed on this instance.
    pub fn observes_event(&self, event: &str) -> bool {
        self.0.read().observed_events.contains(event)
    }

    /// The identity previously stored on this instance, if any.
    pub fn assigned_identity(&self) -> Option<String> {
        self.0.read().assigned_identity.clone()
    }

    /// Store a generated identity on this instance.
    pub fn assign_identity(&self, identity: impl Into<String>) {
        self.0.write().assigned_identity = Some(identity.into());
    }

    /// Append a listener for an event name.
    pub fn register_listener(&self, event: &str, listener: Value) {
        self.0
            .write()
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Current listeners for an event name, in registration order.
    pub fn listeners_for(&self, event: &str) -> Vec<Value> {
        self.0
            .read()
            .listeners
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    /// Fire an event on this object.
    ///
    /// Invokes the current value of the matching `on`-prefixed member (when
    /// callable), then every registered listener, in order. The first
    /// listener failure stops dispatch and propagates.
    pub fn dispatch_event(&self, event: &str, payload: Value) -> ObjectResult<()> {
        let handler_member = self
            .member_names()
            .into_iter()
            .find(|name| on_member_event_name(name) == Some(event));
        if let Some(member) = handler_member {
            if let Ok(listener) = self.get(&member) {
                if !listener.is_null() {
                    invoke_listener(&listener, self, &payload)?;
                }
            }
        }
        for listener in self.listeners_for(event) {
            invoke_listener(&listener, self, &payload)?;
        }
        Ok(())
    }

    /// Downgrade to a weak handle.
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// Check whether two references point at the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn lookup(&self, name: &str) -> Option<Property> {
        let own = self.0.read().properties.get(name).cloned();
        own.or_else(|| self.class().and_then(|c| c.behavior_descriptor(name)))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {} @ {:p}]", self.class_name(), Arc::as_ptr(&self.0))
    }
}

/// Weak handle to a dynamic object.
///
/// Shims stored on an object (listener wrappers, promise observers) hold the
/// object weakly so instance and shim do not keep each other alive.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RwLock<DynObject>>);

impl WeakObjectRef {
    /// Upgrade back to a strong handle, if the object is still alive.
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[weak object]")
    }
}

/// Event name observed through an `on`-prefixed listener member, if the
/// member name follows that convention.
///
/// The prefix and any separator underscores are stripped, so both
/// `onvolumechange` and `on_volume_change` answer an event name.
pub fn on_member_event_name(member: &str) -> Option<&str> {
    member
        .strip_prefix("on")
        .map(|rest| rest.trim_start_matches('_'))
        .filter(|rest| !rest.is_empty())
}

/// Invoke a listener value with an event payload.
///
/// A listener is either a callable or an object exposing a callable
/// `handle_event` member; anything else is a dispatch error. `Null`
/// listeners are ignored.
pub fn invoke_listener(
    listener: &Value,
    receiver: &ObjectRef,
    payload: &Value,
) -> ObjectResult<Value> {
    match listener {
        Value::Null => Ok(Value::Null),
        Value::Func(f) => f.call(Some(receiver), &[payload.clone()]),
        Value::Object(handler) if handler.has_member("handle_event") => {
            handler.call("handle_event", &[payload.clone()])
        }
        _ => Err(ObjectError::NotCallable("listener".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassDef;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_data_member_roundtrip() {
        let obj = DynObject::new().with_data("volume", 11i64).into_ref();
        assert_eq!(obj.get("volume").unwrap(), Value::Number(11.0));

        obj.set("volume", Value::from(3i64)).unwrap();
        assert_eq!(obj.get("volume").unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_read_only_member_rejects_writes() {
        let obj = DynObject::new()
            .with_member("kind", Property::read_only("fixed"))
            .into_ref();
        assert!(matches!(
            obj.set("kind", Value::from("other")),
            Err(ObjectError::NotWritable(_))
        ));
    }

    #[test]
    fn test_accessor_member_runs_native_functions() {
        let reads = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&reads);
        let get: Getter = Arc::new(move |_recv| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from(42i64))
        });
        let obj = DynObject::new()
            .with_member("answer", Property::accessor(Some(get), None))
            .into_ref();

        assert_eq!(obj.get("answer").unwrap(), Value::Number(42.0));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(matches!(
            obj.set("answer", Value::Null),
            Err(ObjectError::NotWritable(_))
        ));
    }

    #[test]
    fn test_method_invocation_receives_receiver() {
        let obj = DynObject::new()
            .with_data("count", 1i64)
            .with_method("bump", |recv, _args| {
                let recv = recv.unwrap();
                let current = recv.get("count")?.as_number().unwrap_or(0.0);
                recv.set("count", Value::Number(current + 1.0))?;
                Ok(Value::Number(current + 1.0))
            })
            .into_ref();

        assert_eq!(obj.call("bump", &[]).unwrap(), Value::Number(2.0));
        assert_eq!(obj.get("count").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_class_behavior_fallback_and_shadowing() {
        let class = ClassDef::builder("Counter")
            .with_method("label", |_recv, _args| Ok(Value::from("counter")))
            .build();
        let obj = DynObject::of_class(class).into_ref();

        assert_eq!(obj.call("label", &[]).unwrap(), Value::Str("counter".to_string()));

        obj.set("label", Value::from("mine")).unwrap();
        assert_eq!(obj.get("label").unwrap(), Value::Str("mine".to_string()));
    }

    #[test]
    fn test_raw_value_sees_data_and_backing_cells() {
        let cell: ValueCell = Arc::new(RwLock::new(Value::from(5i64)));
        let get: Getter = {
            let cell = Arc::clone(&cell);
            Arc::new(move |_recv| Ok(cell.read().clone()))
        };
        let obj = DynObject::new()
            .with_data("plain", "x")
            .with_member(
                "cellbacked",
                Property::Accessor {
                    get: Some(get),
                    set: None,
                    backing: Some(cell),
                    enumerable: true,
                    configurable: true,
                },
            )
            .with_member("opaque", {
                let get: Getter = Arc::new(|_recv| Ok(Value::Null));
                Property::accessor(Some(get), None)
            })
            .into_ref();

        assert_eq!(obj.raw_value("plain"), Some(Value::Str("x".to_string())));
        assert_eq!(obj.raw_value("cellbacked"), Some(Value::Number(5.0)));
        assert_eq!(obj.raw_value("opaque"), None);
        assert_eq!(obj.raw_value("missing"), None);
    }

    #[test]
    fn test_on_member_event_name() {
        assert_eq!(on_member_event_name("on_volume_change"), Some("volume_change"));
        assert_eq!(on_member_event_name("onpause"), Some("pause"));
        assert_eq!(on_member_event_name("volume"), None);
        assert_eq!(on_member_event_name("on"), None);
    }

    #[test]
    fn test_dispatch_event_invokes_on_member_and_listeners() {
        let seen = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&seen);
        let obj = DynObject::new()
            .with_member(
                "on_tick",
                Property::data(Value::Func(FuncRef::new(move |_recv, _args| {
                    s.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }))),
            )
            .with_listener_support()
            .into_ref();

        let s = Arc::clone(&seen);
        obj.call(
            LISTENER_REGISTRATION,
            &[
                Value::from("tick"),
                Value::Func(FuncRef::new(move |_recv, _args| {
                    s.fetch_add(10, Ordering::SeqCst);
                    Ok(Value::Null)
                })),
            ],
        )
        .unwrap();

        obj.dispatch_event("tick", Value::Null).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_listener_registration_is_not_enumerable() {
        let obj = DynObject::new().with_listener_support().into_ref();
        assert!(obj.has_member(LISTENER_REGISTRATION));
        assert!(!obj.enumerable_names().contains(&LISTENER_REGISTRATION.to_string()));
    }

    #[test]
    fn test_object_listener_with_handle_event() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let handler = DynObject::new()
            .with_method("handle_event", move |_recv, _args| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            })
            .into_ref();

        let obj = DynObject::new().with_listener_support().into_ref();
        obj.register_listener("done", Value::Object(handler));
        obj.dispatch_event("done", Value::from("payload")).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
