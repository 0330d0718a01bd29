//! Event interception: listener members, dynamic listener discovery,
//! and value correlation at fire time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use shimmer_object::{
    FuncRef, Getter, ObjectRef, Property, Setter, Value, ValueCell, WeakObjectRef,
    invoke_listener, on_member_event_name, LISTENER_REGISTRATION,
};
use shimmer_observe::{Correlated, TraceRecord};

use crate::config::TraceConfig;
use crate::engine::ShimEngine;
use crate::member::{blocked_in_place, silent_shim, warn_non_configurable};

/// Which instance members are sampled when an event fires.
///
/// Decided once, when the wrapper is built, so firing stays cheap.
enum CorrelationPlan {
    None,
    Single(String),
    Named(Vec<String>),
}

fn correlation_plan(instance: &WeakObjectRef, event: &str, config: &TraceConfig) -> CorrelationPlan {
    if let Some(names) = config.event_properties.get(event) {
        return match names.as_slice() {
            [] => CorrelationPlan::None,
            [single] => CorrelationPlan::Single(single.clone()),
            many => CorrelationPlan::Named(many.to_vec()),
        };
    }
    // Heuristic: an event often reports a member of the same name, with
    // any trailing "change" dropped ("volume_change" samples "volume").
    let Some(instance) = instance.upgrade() else {
        return CorrelationPlan::None;
    };
    let lowered = event.to_lowercase();
    let stripped = lowered
        .strip_suffix("change")
        .unwrap_or(&lowered)
        .trim_end_matches('_');
    for name in instance.member_names() {
        let candidate = name.to_lowercase();
        if candidate == lowered || (!stripped.is_empty() && candidate == stripped) {
            return CorrelationPlan::Single(name);
        }
    }
    CorrelationPlan::None
}

fn sampled_member(instance: &ObjectRef, name: &str) -> Value {
    match instance.get(name) {
        Ok(Value::Func(func)) => func.call(Some(instance), &[]).unwrap_or(Value::Null),
        Ok(value) => value,
        Err(_) => Value::Null,
    }
}

fn correlated_value(instance: &ObjectRef, plan: &CorrelationPlan) -> Option<Correlated> {
    match plan {
        CorrelationPlan::None => None,
        CorrelationPlan::Single(name) => Some(Correlated::Single(sampled_member(instance, name))),
        CorrelationPlan::Named(names) => {
            let sampled: BTreeMap<String, Value> = names
                .iter()
                .map(|name| (name.clone(), sampled_member(instance, name)))
                .collect();
            Some(Correlated::Named(sampled))
        }
    }
}

/// Builds the function that stands in for an application listener.
///
/// When fired it records the event with its payload and any correlated
/// member values, then forwards to `user_listener`. A null listener
/// still records; the event is observed even when the application
/// never cared. The instance is held weakly so a discarded object is
/// not kept alive by its own instrumentation.
pub(crate) fn listener_wrapper(
    engine: &ShimEngine,
    instance: WeakObjectRef,
    user_listener: Value,
    class_name: String,
    event: String,
    config: &TraceConfig,
) -> FuncRef {
    let plan = correlation_plan(&instance, &event, config);
    let engine = engine.clone();
    let config = config.clone();
    FuncRef::new(move |recv, args| {
        let payload = args.first().cloned().unwrap_or(Value::Null);
        let upgraded = instance.upgrade();
        if let Some(observed) = upgraded.as_ref() {
            config.emit(TraceRecord::Event {
                timestamp: SystemTime::now(),
                duration: Duration::ZERO,
                instance: observed.clone(),
                identity: engine.identity_of(observed, &config),
                class_name: class_name.clone(),
                event: event.clone(),
                payload: payload.clone(),
                value: correlated_value(observed, &plan),
            });
        }
        match recv.cloned().or(upgraded) {
            Some(receiver) => invoke_listener(&user_listener, &receiver, &payload),
            None => Ok(Value::Null),
        }
    })
}

impl ShimEngine {
    /// Replaces an `on`-prefixed listener member so any listener the
    /// application assigns is wrapped before it is stored.
    pub(crate) fn shim_listener_member(
        &self,
        target: &ObjectRef,
        source: &ObjectRef,
        member: &str,
        config: &TraceConfig,
    ) {
        let Some(event) = on_member_event_name(member) else {
            return;
        };
        let event = event.to_string();
        if config.skip_events.contains(&event) {
            silent_shim(target, source, member, config);
            return;
        }
        if blocked_in_place(source, member, config) {
            warn_non_configurable(target, member, config);
            return;
        }
        target.observe_event(&event);
        let enumerable = source
            .descriptor(member)
            .map(|descriptor| descriptor.is_enumerable())
            .unwrap_or(true);
        let original_listener = source.get(member).unwrap_or(Value::Null);

        if config.in_place {
            // Local cell; the member on the object becomes the cell.
            let cell: ValueCell = Arc::new(RwLock::new(Value::Null));
            let get: Getter = {
                let cell = cell.clone();
                Arc::new(move |_recv| Ok(cell.read().clone()))
            };
            let set: Setter = {
                let cell = cell.clone();
                let engine = self.clone();
                let config = config.clone();
                let weak = target.downgrade();
                let class_name = target.class_name();
                let event = event.clone();
                Arc::new(move |_recv: &ObjectRef, value: Value| {
                    // Clearing the listener neutralizes it but keeps
                    // the wrapper, so the event stays observed.
                    let listener = if value.is_truthy() { value } else { Value::Null };
                    let wrapped = listener_wrapper(
                        &engine,
                        weak.clone(),
                        listener,
                        class_name.clone(),
                        event.clone(),
                        &config,
                    );
                    *cell.write() = Value::Func(wrapped);
                    Ok(())
                })
            };
            target.define(
                member,
                Property::Accessor {
                    get: Some(get),
                    set: Some(set),
                    backing: Some(cell),
                    enumerable,
                    configurable: true,
                },
            );
        } else {
            // Wrapped listeners are written through to the original
            // object, so host-side dispatch fires them too.
            let get: Getter = {
                let source = source.clone();
                let member = member.to_string();
                Arc::new(move |_recv| source.get(&member))
            };
            let set: Setter = {
                let source = source.clone();
                let member_name = member.to_string();
                let engine = self.clone();
                let config = config.clone();
                let weak = target.downgrade();
                let class_name = target.class_name();
                let event = event.clone();
                Arc::new(move |_recv: &ObjectRef, value: Value| {
                    let listener = if value.is_truthy() { value } else { Value::Null };
                    let wrapped = listener_wrapper(
                        &engine,
                        weak.clone(),
                        listener,
                        class_name.clone(),
                        event.clone(),
                        &config,
                    );
                    source.set(&member_name, Value::Func(wrapped))
                })
            };
            target.define(
                member,
                Property::Accessor {
                    get: Some(get),
                    set: Some(set),
                    backing: None,
                    enumerable,
                    configurable: true,
                },
            );
        }

        // Route the pre-existing listener (or a null stand-in) through
        // the new mutator so it is wrapped from the start.
        let _ = target.set(member, original_listener);
    }

    /// Wraps the listener-registration method so events registered at
    /// runtime become observed the first time they are named.
    pub(crate) fn shim_listener_registration(
        &self,
        target: &ObjectRef,
        source: &ObjectRef,
        config: &TraceConfig,
    ) {
        let Ok(Value::Func(original)) = source.get(LISTENER_REGISTRATION) else {
            return;
        };
        let bound = if config.in_place {
            None
        } else {
            Some(source.clone())
        };
        let engine = self.clone();
        let config_hook = config.clone();
        let weak = target.downgrade();
        let class_name = target.class_name();
        let wrapped = FuncRef::new(move |recv, args| {
            let receiver = bound.clone().or_else(|| recv.cloned());
            if let Some(Value::Str(event)) = args.first() {
                if !config_hook.skip_events.contains(event) {
                    if let Some(instance) = weak.upgrade() {
                        // First mention of this event name: register a
                        // probe listener so it is recorded even if the
                        // application listener is later removed.
                        if instance.observe_event(event) {
                            let probe = listener_wrapper(
                                &engine,
                                weak.clone(),
                                Value::Null,
                                class_name.clone(),
                                event.clone(),
                                &config_hook,
                            );
                            if let Some(receiver) = receiver.as_ref() {
                                original.call(
                                    Some(receiver),
                                    &[Value::Str(event.clone()), Value::Func(probe)],
                                )?;
                            }
                        }
                    }
                }
            }
            original.call(receiver.as_ref(), args)
        });
        target.define(
            LISTENER_REGISTRATION,
            Property::data(Value::Func(wrapped)).with_enumerable(false),
        );
    }

    /// Observes an event named only in configuration by registering a
    /// probe listener for it.
    pub(crate) fn force_event_observation(
        &self,
        target: &ObjectRef,
        event: &str,
        config: &TraceConfig,
    ) {
        if config.skip_events.contains(&event.to_string()) {
            return;
        }
        // Mark first so the registration wrapper does not add a second
        // probe when it sees this name.
        if !target.observe_event(event) {
            return;
        }
        if target.has_member(LISTENER_REGISTRATION) {
            let probe = listener_wrapper(
                self,
                target.downgrade(),
                Value::Null,
                target.class_name(),
                event.to_string(),
                config,
            );
            let _ = target.call(
                LISTENER_REGISTRATION,
                &[Value::from(event), Value::Func(probe)],
            );
        }
    }
}
