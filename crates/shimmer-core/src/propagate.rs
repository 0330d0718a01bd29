//! Return-value propagation: instrumentation follows the objects that
//! intercepted calls hand back.

use shimmer_object::Value;

use crate::config::TraceConfig;
use crate::engine::ShimEngine;

impl ShimEngine {
    /// Extends instrumentation to an intercepted result before it is
    /// returned to the caller.
    ///
    /// Objects of a registered class are instrumented with that class's
    /// config. Unrecognized objects are probed at the configured
    /// explore fields, each of which is propagated in turn. Everything
    /// else, including already-instrumented objects, passes through
    /// untouched.
    pub fn propagate(&self, value: Value, config: &TraceConfig) -> Value {
        let Value::Object(object) = value else {
            return value;
        };
        if object.instrumented() {
            return Value::Object(object);
        }
        if let Some(class) = object.class() {
            if let Some(registered) = self.registered_config(class.id()) {
                return Value::Object(self.trace_object(&object, &registered));
            }
        }
        for field in &config.explore_result_fields {
            if let Ok(current) = object.get(field) {
                let propagated = self.propagate(current, config);
                let _ = object.set(field, propagated);
            }
        }
        Value::Object(object)
    }
}
