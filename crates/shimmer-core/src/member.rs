//! Member-level shims: methods, plain properties, native accessors,
//! and deferred-valued properties.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::RwLock;
use shimmer_object::{
    FuncRef, Getter, ObjectError, ObjectRef, Property, Setter, Value, ValueCell,
};
use shimmer_observe::{Outcome, TraceRecord};

use crate::config::TraceConfig;
use crate::engine::ShimEngine;
use crate::error::{ShimError, ShimResult};

/// How a member is handled during an instrumentation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Callable member; calls are intercepted.
    Method,
    /// Plain or accessor member; reads and writes are intercepted.
    Property,
    /// Deferred-valued member; settlement reports as an event.
    PromiseProperty,
    /// `on`-prefixed listener member; assigned listeners are wrapped.
    EventListener,
    /// Passed through without logging.
    Silent,
}

/// Classifies a member by its name and the value it currently holds.
pub(crate) fn classify(source: &ObjectRef, name: &str, config: &TraceConfig) -> MemberKind {
    if config.events && shimmer_object::on_member_event_name(name).is_some() {
        return MemberKind::EventListener;
    }
    match source.get(name) {
        Ok(Value::Func(_)) => {
            if config.methods {
                MemberKind::Method
            } else {
                MemberKind::Silent
            }
        }
        Ok(Value::Deferred(_)) if config.properties && config.promise_properties_as_events => {
            MemberKind::PromiseProperty
        }
        _ => {
            if config.properties {
                MemberKind::Property
            } else {
                MemberKind::Silent
            }
        }
    }
}

/// Copies a member onto a wrapper without interception, rebinding
/// accessor receivers to the original object. In-place targets already
/// hold the member and are left untouched.
pub(crate) fn silent_shim(
    target: &ObjectRef,
    source: &ObjectRef,
    name: &str,
    config: &TraceConfig,
) {
    if config.in_place {
        return;
    }
    let Some(descriptor) = source.descriptor(name) else {
        return;
    };
    let copied = match descriptor {
        Property::Data {
            value,
            writable,
            enumerable,
            ..
        } => Property::Data {
            value,
            writable,
            enumerable,
            configurable: true,
        },
        Property::Accessor {
            get,
            set,
            backing,
            enumerable,
            ..
        } => {
            let get = get.map(|orig| {
                let bound = source.clone();
                Arc::new(move |_recv: &ObjectRef| orig(&bound)) as Getter
            });
            let set = set.map(|orig| {
                let bound = source.clone();
                Arc::new(move |_recv: &ObjectRef, value: Value| orig(&bound, value)) as Setter
            });
            Property::Accessor {
                get,
                set,
                backing,
                enumerable,
                configurable: true,
            }
        }
    };
    target.define(name, copied);
}

/// Reports that an in-place member could not be replaced.
pub(crate) fn warn_non_configurable(target: &ObjectRef, name: &str, config: &TraceConfig) {
    config.emit(TraceRecord::Warning {
        timestamp: SystemTime::now(),
        duration: Duration::ZERO,
        message: format!(
            "cannot replace non-configurable member '{name}' on class '{}'",
            target.class_name()
        ),
    });
}

/// True when replacing `name` in place is blocked by its descriptor.
pub(crate) fn blocked_in_place(source: &ObjectRef, name: &str, config: &TraceConfig) -> bool {
    config.in_place
        && source
            .own_descriptor(name)
            .is_some_and(|descriptor| !descriptor.is_configurable())
}

/// Builds the intercepting function installed over a callable member.
///
/// `bound` pins the receiver the original runs against; wrapper-mode
/// shims bind the original object, while in-place and class-level
/// shims pass the dynamic receiver through. The returned function
/// records one entry per call: synchronous results at return time,
/// deferred results when they settle unless the config asks for
/// call-time logging.
pub(crate) fn wrap_method(
    engine: &ShimEngine,
    original: FuncRef,
    bound: Option<ObjectRef>,
    class_name: String,
    member: String,
    config: &TraceConfig,
) -> FuncRef {
    let engine = engine.clone();
    let config = config.clone();
    FuncRef::new(move |recv, args| {
        let receiver = match (recv, bound.as_ref()) {
            (Some(receiver), _) => receiver.clone(),
            (None, Some(bound)) => bound.clone(),
            (None, None) => return Err(ObjectError::MissingReceiver(member.clone())),
        };
        let call_target = bound.clone().unwrap_or_else(|| receiver.clone());
        let start = Instant::now();
        let timestamp = SystemTime::now();
        match original.call(Some(&call_target), args) {
            Err(err) => {
                config.emit(TraceRecord::Method {
                    timestamp,
                    duration: start.elapsed(),
                    instance: receiver.clone(),
                    identity: engine.identity_of(&receiver, &config),
                    class_name: class_name.clone(),
                    member: member.clone(),
                    args: args.to_vec(),
                    outcome: Outcome::Threw(err.clone()),
                });
                Err(err)
            }
            Ok(Value::Deferred(deferred)) => {
                let relay = shimmer_object::DeferredRef::pending();
                if config.log_async_results_immediately {
                    config.emit(TraceRecord::Method {
                        timestamp,
                        duration: start.elapsed(),
                        instance: receiver.clone(),
                        identity: engine.identity_of(&receiver, &config),
                        class_name: class_name.clone(),
                        member: member.clone(),
                        args: args.to_vec(),
                        outcome: Outcome::Returned(Value::Deferred(deferred.clone())),
                    });
                    let engine = engine.clone();
                    let config = config.clone();
                    let relay_out = relay.clone();
                    deferred.subscribe(move |result| match result {
                        Ok(value) => relay_out.resolve(engine.propagate(value.clone(), &config)),
                        Err(err) => relay_out.reject(err.clone()),
                    });
                } else {
                    let engine = engine.clone();
                    let config = config.clone();
                    let relay_out = relay.clone();
                    let receiver = receiver.clone();
                    let class_name = class_name.clone();
                    let member = member.clone();
                    let args = args.to_vec();
                    deferred.subscribe(move |result| {
                        let duration = start.elapsed();
                        match result {
                            Ok(value) => {
                                let value = engine.propagate(value.clone(), &config);
                                config.emit(TraceRecord::Method {
                                    timestamp,
                                    duration,
                                    instance: receiver.clone(),
                                    identity: engine.identity_of(&receiver, &config),
                                    class_name,
                                    member,
                                    args,
                                    outcome: Outcome::Returned(value.clone()),
                                });
                                relay_out.resolve(value);
                            }
                            Err(err) => {
                                config.emit(TraceRecord::Method {
                                    timestamp,
                                    duration,
                                    instance: receiver.clone(),
                                    identity: engine.identity_of(&receiver, &config),
                                    class_name,
                                    member,
                                    args,
                                    outcome: Outcome::Threw(err.clone()),
                                });
                                relay_out.reject(err.clone());
                            }
                        }
                    });
                }
                Ok(Value::Deferred(relay))
            }
            Ok(value) => {
                let value = engine.propagate(value, &config);
                config.emit(TraceRecord::Method {
                    timestamp,
                    duration: start.elapsed(),
                    instance: receiver.clone(),
                    identity: engine.identity_of(&receiver, &config),
                    class_name: class_name.clone(),
                    member: member.clone(),
                    args: args.to_vec(),
                    outcome: Outcome::Returned(value.clone()),
                });
                Ok(value)
            }
        }
    })
}

impl ShimEngine {
    /// Installs the shim matching the member's classification.
    pub(crate) fn shim_member(
        &self,
        target: &ObjectRef,
        source: &ObjectRef,
        name: &str,
        config: &TraceConfig,
    ) {
        match classify(source, name, config) {
            MemberKind::Method => self.shim_method(target, source, name, config),
            MemberKind::Property => self.shim_property(target, source, name, config),
            MemberKind::PromiseProperty => self.shim_promise_property(target, source, name, config),
            MemberKind::EventListener => self.shim_listener_member(target, source, name, config),
            MemberKind::Silent => silent_shim(target, source, name, config),
        }
    }

    fn shim_method(
        &self,
        target: &ObjectRef,
        source: &ObjectRef,
        name: &str,
        config: &TraceConfig,
    ) {
        let Some(descriptor) = source.descriptor(name) else {
            return;
        };
        if blocked_in_place(source, name, config) {
            warn_non_configurable(target, name, config);
            return;
        }
        let Ok(Value::Func(original)) = source.get(name) else {
            return;
        };
        let bound = if config.in_place {
            None
        } else {
            Some(source.clone())
        };
        let wrapped = wrap_method(
            self,
            original,
            bound,
            target.class_name(),
            name.to_string(),
            config,
        );
        target.define(
            name,
            Property::Data {
                value: Value::Func(wrapped),
                writable: true,
                enumerable: descriptor.is_enumerable(),
                configurable: true,
            },
        );
    }

    fn shim_property(
        &self,
        target: &ObjectRef,
        source: &ObjectRef,
        name: &str,
        config: &TraceConfig,
    ) {
        let Some(descriptor) = source.descriptor(name) else {
            return;
        };
        if blocked_in_place(source, name, config) {
            warn_non_configurable(target, name, config);
            return;
        }
        match descriptor {
            Property::Data {
                value,
                writable,
                enumerable,
                ..
            } => {
                // Writes log; reads stay silent and serve the stored
                // value through the backing cell, which also keeps the
                // value visible to identity resolution.
                let cell: ValueCell = Arc::new(RwLock::new(value));
                let get: Getter = {
                    let cell = cell.clone();
                    Arc::new(move |_recv| Ok(cell.read().clone()))
                };
                let set: Option<Setter> = if writable {
                    let cell = cell.clone();
                    let engine = self.clone();
                    let config = config.clone();
                    let class_name = target.class_name();
                    let member = name.to_string();
                    Some(Arc::new(move |recv: &ObjectRef, value: Value| {
                        config.emit(TraceRecord::Setter {
                            timestamp: SystemTime::now(),
                            duration: Duration::ZERO,
                            instance: recv.clone(),
                            identity: engine.identity_of(recv, &config),
                            class_name: class_name.clone(),
                            member: member.clone(),
                            outcome: Outcome::Returned(value.clone()),
                        });
                        *cell.write() = value;
                        Ok(())
                    }))
                } else {
                    None
                };
                target.define(
                    name,
                    Property::Accessor {
                        get: Some(get),
                        set,
                        backing: Some(cell),
                        enumerable,
                        configurable: true,
                    },
                );
            }
            Property::Accessor {
                get,
                set,
                enumerable,
                ..
            } => {
                let bound = if config.in_place {
                    None
                } else {
                    Some(source.clone())
                };
                let wrapped_get = get.map(|orig| {
                    let engine = self.clone();
                    let config = config.clone();
                    let class_name = target.class_name();
                    let member = name.to_string();
                    let bound = bound.clone();
                    Arc::new(move |recv: &ObjectRef| {
                        let receiver = bound.as_ref().unwrap_or(recv);
                        let start = Instant::now();
                        let timestamp = SystemTime::now();
                        let outcome = match orig(receiver) {
                            Ok(value) => (Ok(value.clone()), Outcome::Returned(value)),
                            Err(err) => (Err(err.clone()), Outcome::Threw(err)),
                        };
                        config.emit(TraceRecord::Getter {
                            timestamp,
                            duration: start.elapsed(),
                            instance: recv.clone(),
                            identity: engine.identity_of(recv, &config),
                            class_name: class_name.clone(),
                            member: member.clone(),
                            outcome: outcome.1,
                        });
                        outcome.0
                    }) as Getter
                });
                let wrapped_set = set.map(|orig| {
                    let engine = self.clone();
                    let config = config.clone();
                    let class_name = target.class_name();
                    let member = name.to_string();
                    let bound = bound.clone();
                    Arc::new(move |recv: &ObjectRef, value: Value| {
                        let receiver = bound.as_ref().unwrap_or(recv);
                        let start = Instant::now();
                        let timestamp = SystemTime::now();
                        let outcome = match orig(receiver, value.clone()) {
                            Ok(()) => (Ok(()), Outcome::Returned(value)),
                            Err(err) => (Err(err.clone()), Outcome::Threw(err)),
                        };
                        config.emit(TraceRecord::Setter {
                            timestamp,
                            duration: start.elapsed(),
                            instance: recv.clone(),
                            identity: engine.identity_of(recv, &config),
                            class_name: class_name.clone(),
                            member: member.clone(),
                            outcome: outcome.1,
                        });
                        outcome.0
                    }) as Setter
                });
                target.define(
                    name,
                    Property::Accessor {
                        get: wrapped_get,
                        set: wrapped_set,
                        backing: None,
                        enumerable,
                        configurable: true,
                    },
                );
            }
        }
    }

    fn shim_promise_property(
        &self,
        target: &ObjectRef,
        source: &ObjectRef,
        name: &str,
        config: &TraceConfig,
    ) {
        if let Ok(Value::Deferred(deferred)) = source.get(name) {
            let weak = target.downgrade();
            let engine = self.clone();
            let config_hook = config.clone();
            let class_name = target.class_name();
            let member = name.to_string();
            deferred.subscribe(move |result| {
                let Some(instance) = weak.upgrade() else {
                    return;
                };
                let (event, payload) = match result {
                    Ok(value) => (format!("{member} Promise resolved"), value.clone()),
                    Err(err) => (format!("{member} Promise rejected"), err.payload()),
                };
                config_hook.emit(TraceRecord::Event {
                    timestamp: SystemTime::now(),
                    duration: Duration::ZERO,
                    instance: instance.clone(),
                    identity: engine.identity_of(&instance, &config_hook),
                    class_name,
                    event,
                    payload,
                    value: None,
                });
            });
        }
        // The member itself stays passively delegated.
        silent_shim(target, source, name, config);
    }

    /// Instruments a single named member of an object, in place.
    pub fn trace_member(
        &self,
        object: &ObjectRef,
        name: &str,
        config: &TraceConfig,
    ) -> ShimResult<()> {
        if !object.has_member(name) {
            return Err(ShimError::NoSuchMember {
                class: object.class_name(),
                member: name.to_string(),
            });
        }
        let config = config.clone().with_in_place(true);
        self.shim_member(object, &object.clone(), name, &config);
        Ok(())
    }

    /// Instruments a callable shared-behavior member of a class, so
    /// every existing and future instance reports calls to it.
    pub fn trace_class_member(
        &self,
        class: &shimmer_object::ClassRef,
        name: &str,
        config: &TraceConfig,
    ) -> ShimResult<()> {
        let Some(descriptor) = class.behavior_descriptor(name) else {
            return Err(ShimError::NoSuchMember {
                class: class.name().to_string(),
                member: name.to_string(),
            });
        };
        let Property::Data {
            value: Value::Func(original),
            enumerable,
            ..
        } = descriptor
        else {
            return Err(ShimError::NotInstrumentable {
                member: name.to_string(),
                reason: "only callable shared-behavior members can be wrapped at class level"
                    .to_string(),
            });
        };
        let wrapped = wrap_method(
            self,
            original,
            None,
            class.name().to_string(),
            name.to_string(),
            config,
        );
        class.define_behavior(
            name,
            Property::Data {
                value: Value::Func(wrapped),
                writable: true,
                enumerable,
                configurable: true,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shimmer_object::{ClassBuilder, DeferredRef, DynObject};
    use shimmer_observe::CollectingSink;

    fn collected() -> (Arc<CollectingSink>, TraceConfig) {
        let sink = Arc::new(CollectingSink::new());
        let config = TraceConfig::new().with_sink(sink.clone());
        (sink, config)
    }

    fn adder() -> ObjectRef {
        DynObject::new()
            .with_method("add", |_recv, args| {
                let sum = args.iter().filter_map(Value::as_number).sum();
                Ok(Value::Number(sum))
            })
            .into_ref()
    }

    #[test]
    fn test_classify_members() {
        let object = DynObject::new()
            .with_method("run", |_, _| Ok(Value::Null))
            .with_data("count", Value::from(1.0))
            .with_data("ready", Value::Deferred(DeferredRef::pending()))
            .with_data("on_pause", Value::Null)
            .into_ref();
        let config = TraceConfig::new();
        assert_eq!(classify(&object, "run", &config), MemberKind::Method);
        assert_eq!(classify(&object, "count", &config), MemberKind::Property);
        assert_eq!(
            classify(&object, "ready", &config),
            MemberKind::PromiseProperty
        );
        assert_eq!(
            classify(&object, "on_pause", &config),
            MemberKind::EventListener
        );

        let muted = config
            .with_methods(false)
            .with_properties(false)
            .with_events(false);
        assert_eq!(classify(&object, "run", &muted), MemberKind::Silent);
        assert_eq!(classify(&object, "count", &muted), MemberKind::Silent);
        assert_eq!(classify(&object, "on_pause", &muted), MemberKind::Silent);
    }

    #[test]
    fn test_method_call_is_logged_with_args_and_result() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let object = adder();
        engine.trace_member(&object, "add", &config).unwrap();

        let result = object
            .call("add", &[Value::from(1.0), Value::from(2.0)])
            .unwrap();
        assert_eq!(result, Value::Number(3.0));

        let records = sink.of_kind("method");
        assert_eq!(records.len(), 1);
        let TraceRecord::Method { args, outcome, member, .. } = &records[0] else {
            panic!("expected a method record");
        };
        assert_eq!(member, "add");
        assert_eq!(args, &vec![Value::from(1.0), Value::from(2.0)]);
        assert_eq!(outcome.result(), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_method_throw_is_logged_and_rethrown() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let object = DynObject::new()
            .with_method("boom", |_, _| Err(ObjectError::thrown("bad state")))
            .into_ref();
        engine.trace_member(&object, "boom", &config).unwrap();

        let err = object.call("boom", &[]).unwrap_err();
        assert_eq!(err.payload(), Value::from("bad state"));
        let records = sink.of_kind("method");
        assert_eq!(records.len(), 1);
        assert!(records[0].outcome().unwrap().is_throw());
    }

    #[test]
    fn test_deferred_method_logs_on_settlement() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let config = config.with_log_async_results_immediately(false);
        let pending = DeferredRef::pending();
        let handle = pending.clone();
        let object = DynObject::new()
            .with_method("fetch", move |_, _| Ok(Value::Deferred(handle.clone())))
            .into_ref();
        engine.trace_member(&object, "fetch", &config).unwrap();

        let returned = object.call("fetch", &[]).unwrap();
        let Value::Deferred(relay) = returned else {
            panic!("expected a deferred result");
        };
        assert!(sink.of_kind("method").is_empty());

        pending.resolve(Value::from("payload"));
        let records = sink.of_kind("method");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].outcome().unwrap().result(),
            Some(&Value::from("payload"))
        );
        assert_eq!(relay.settled(), Some(Ok(Value::from("payload"))));
    }

    #[test]
    fn test_deferred_method_logs_immediately_when_configured() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let config = config.with_log_async_results_immediately(true);
        let pending = DeferredRef::pending();
        let handle = pending.clone();
        let object = DynObject::new()
            .with_method("fetch", move |_, _| Ok(Value::Deferred(handle.clone())))
            .into_ref();
        engine.trace_member(&object, "fetch", &config).unwrap();

        let returned = object.call("fetch", &[]).unwrap();
        assert_eq!(sink.of_kind("method").len(), 1);
        let TraceRecord::Method { outcome, .. } = &sink.of_kind("method")[0] else {
            panic!("expected a method record");
        };
        assert!(outcome.result().is_some_and(Value::is_deferred));

        // Settlement still reaches the caller without a second record.
        pending.resolve(Value::from(7.0));
        assert_eq!(sink.of_kind("method").len(), 1);
        let Value::Deferred(relay) = returned else {
            panic!("expected a deferred result");
        };
        assert_eq!(relay.settled(), Some(Ok(Value::from(7.0))));
    }

    #[test]
    fn test_deferred_rejection_is_logged() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let config = config.with_log_async_results_immediately(false);
        let pending = DeferredRef::pending();
        let handle = pending.clone();
        let object = DynObject::new()
            .with_method("fetch", move |_, _| Ok(Value::Deferred(handle.clone())))
            .into_ref();
        engine.trace_member(&object, "fetch", &config).unwrap();

        let Value::Deferred(relay) = object.call("fetch", &[]).unwrap() else {
            panic!("expected a deferred result");
        };
        pending.reject(ObjectError::thrown("offline"));
        let records = sink.of_kind("method");
        assert_eq!(records.len(), 1);
        assert!(records[0].outcome().unwrap().is_throw());
        assert!(matches!(relay.settled(), Some(Err(_))));
    }

    #[test]
    fn test_data_property_write_logged_read_silent() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let object = DynObject::new()
            .with_data("volume", Value::from(40.0))
            .into_ref();
        engine.trace_member(&object, "volume", &config).unwrap();

        assert_eq!(object.get("volume").unwrap(), Value::Number(40.0));
        assert!(sink.is_empty());

        object.set("volume", Value::from(70.0)).unwrap();
        let records = sink.of_kind("setter");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].outcome().unwrap().result(),
            Some(&Value::Number(70.0))
        );
        assert_eq!(object.get("volume").unwrap(), Value::Number(70.0));
    }

    #[test]
    fn test_read_only_data_property_stays_read_only() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let object = DynObject::new()
            .with_member("version", Property::read_only(Value::from("1.2.0")))
            .into_ref();
        engine.trace_member(&object, "version", &config).unwrap();

        assert_eq!(object.get("version").unwrap(), Value::from("1.2.0"));
        assert!(object.set("version", Value::from("hacked")).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_native_accessor_reads_are_logged() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let get: Getter = Arc::new(|_recv| Ok(Value::from(12.5)));
        let object = DynObject::new()
            .with_member("position", Property::accessor(Some(get), None))
            .into_ref();
        engine.trace_member(&object, "position", &config).unwrap();

        assert_eq!(object.get("position").unwrap(), Value::Number(12.5));
        let records = sink.of_kind("getter");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member(), Some("position"));
    }

    #[test]
    fn test_non_configurable_member_warns_and_survives() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let object = DynObject::new()
            .with_member(
                "state",
                Property::data(Value::from("idle")).with_configurable(false),
            )
            .into_ref();
        engine.trace_member(&object, "state", &config).unwrap();

        let warnings = sink.of_kind("warning");
        assert_eq!(warnings.len(), 1);
        let TraceRecord::Warning { message, .. } = &warnings[0] else {
            panic!("expected a warning record");
        };
        assert!(message.contains("state"));

        // The member still behaves as before, unlogged.
        object.set("state", Value::from("busy")).unwrap();
        assert_eq!(object.get("state").unwrap(), Value::from("busy"));
        assert!(sink.of_kind("setter").is_empty());
    }

    #[test]
    fn test_promise_property_settlement_reports_as_event() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let pending = DeferredRef::pending();
        let object = DynObject::new()
            .with_data("ready", Value::Deferred(pending.clone()))
            .into_ref();
        engine.trace_member(&object, "ready", &config).unwrap();

        assert!(sink.is_empty());
        pending.resolve(Value::from("loaded"));
        let events = sink.of_kind("event");
        assert_eq!(events.len(), 1);
        let TraceRecord::Event { event, payload, .. } = &events[0] else {
            panic!("expected an event record");
        };
        assert_eq!(event, "ready Promise resolved");
        assert_eq!(payload, &Value::from("loaded"));
    }

    #[test]
    fn test_trace_member_unknown_name() {
        let engine = ShimEngine::new();
        let (_sink, config) = collected();
        let object = DynObject::new().into_ref();
        let err = engine.trace_member(&object, "missing", &config).unwrap_err();
        assert!(matches!(err, ShimError::NoSuchMember { .. }));
    }

    #[test]
    fn test_trace_class_member_logs_every_instance() {
        let engine = ShimEngine::new();
        let (sink, config) = collected();
        let player = ClassBuilder::new("Player")
            .with_method("mute", |_recv, _args| Ok(Value::Bool(true)))
            .build();
        engine.trace_class_member(&player, "mute", &config).unwrap();

        let a = player.instantiate(&[]).unwrap();
        let b = player.instantiate(&[]).unwrap();
        a.call("mute", &[]).unwrap();
        b.call("mute", &[]).unwrap();
        assert_eq!(sink.of_kind("method").len(), 2);
    }

    #[test]
    fn test_trace_class_member_rejects_non_callable() {
        let engine = ShimEngine::new();
        let (_sink, config) = collected();
        let player = ClassBuilder::new("Player")
            .with_behavior("volume", Property::data(Value::from(40.0)))
            .build();
        let err = engine
            .trace_class_member(&player, "volume", &config)
            .unwrap_err();
        assert!(matches!(err, ShimError::NotInstrumentable { .. }));
    }
}
