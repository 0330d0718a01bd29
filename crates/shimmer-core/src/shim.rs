//! Class and whole-object instrumentation passes.

use std::time::{Instant, SystemTime};

use shimmer_object::{ClassRef, DynObject, ObjectRef, Value};
use shimmer_observe::{Outcome, TraceRecord};
use tracing::debug;

use crate::config::TraceConfig;
use crate::engine::ShimEngine;
use crate::member::{MemberKind, classify, silent_shim};

impl ShimEngine {
    /// Registers a class for instrumentation and returns a replacement
    /// whose constructor instruments every instance it produces.
    ///
    /// The replacement shares the original's identity and behavior
    /// table, so existing instance checks keep passing. The original
    /// class is also remembered in the engine registry; objects of this
    /// class returned by other intercepted calls get instrumented with
    /// the same config.
    pub fn trace_class(&self, class: &ClassRef, config: &TraceConfig) -> ClassRef {
        self.register_class(class.id(), class.name(), config);
        let engine = self.clone();
        let original = class.clone();
        let config = config.clone();
        class.with_constructor_override(move |_class, args| {
            let start = Instant::now();
            let timestamp = SystemTime::now();
            match original.instantiate(args) {
                Ok(instance) => {
                    let traced = engine.trace_object(&instance, &config);
                    let identity = engine.identity_of(&traced, &config);
                    config.emit(TraceRecord::Constructor {
                        timestamp,
                        duration: start.elapsed(),
                        instance: Some(traced.clone()),
                        identity: Some(identity),
                        class_name: original.name().to_string(),
                        args: args.to_vec(),
                        outcome: Outcome::Returned(Value::Object(traced.clone())),
                    });
                    Ok(traced)
                }
                Err(err) => {
                    config.emit(TraceRecord::Constructor {
                        timestamp,
                        duration: start.elapsed(),
                        instance: None,
                        identity: None,
                        class_name: original.name().to_string(),
                        args: args.to_vec(),
                        outcome: Outcome::Threw(err.clone()),
                    });
                    Err(err)
                }
            }
        })
    }

    /// Instruments an object, either rewriting its members in place or
    /// returning a delegating wrapper, per the config.
    ///
    /// Already-instrumented objects are returned unchanged; the pass
    /// runs at most once per object however many times it is reached.
    pub fn trace_object(&self, object: &ObjectRef, config: &TraceConfig) -> ObjectRef {
        if object.instrumented() {
            return object.clone();
        }
        let target = if config.in_place {
            object.clone()
        } else {
            let wrapper = DynObject::new().into_ref();
            wrapper.set_class(object.class());
            wrapper
        };

        let mut members = Vec::new();
        for name in object.enumerable_names() {
            if config.skip_properties.contains(&name) {
                // Excluded from logging, still usable on a wrapper.
                silent_shim(&target, object, &name, config);
            } else {
                members.push(name);
            }
        }
        for extra in &config.extra_properties {
            if !members.contains(extra) && !config.skip_properties.contains(extra) {
                members.push(extra.clone());
            }
        }

        // Listener members go last so correlation plans see the rest
        // of the members already in place.
        let mut listener_members = Vec::new();
        for name in members {
            if classify(object, &name, config) == MemberKind::EventListener {
                listener_members.push(name);
            } else {
                self.shim_member(&target, object, &name, config);
            }
        }

        if config.events {
            for member in &listener_members {
                self.shim_listener_member(&target, object, member, config);
            }
            self.shim_listener_registration(&target, object, config);
            for event in &config.extra_events {
                self.force_event_observation(&target, event, config);
            }
        }

        target.set_instrumented(true);
        let identity = self.identity_of(&target, config);
        debug!(
            class = %target.class_name(),
            identity = %identity,
            in_place = config.in_place,
            "instrumented object"
        );
        target
    }
}
