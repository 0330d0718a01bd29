//! Structured log records describing observed interactions.
//!
//! One record is emitted per observed occurrence: a construction, a method
//! call, a property read or write, an event firing, or a non-fatal warning
//! raised by the instrumentation layer itself. Records are immutable and
//! have no identity beyond their position in the sink's input stream.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use shimmer_object::{ObjectError, ObjectRef, Value};

/// Outcome of an observed operation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The operation returned (or wrote) a value.
    Returned(Value),
    /// The operation threw.
    Threw(ObjectError),
}

impl Outcome {
    /// Check whether the operation returned.
    pub fn is_return(&self) -> bool {
        matches!(self, Outcome::Returned(_))
    }

    /// Check whether the operation threw.
    pub fn is_throw(&self) -> bool {
        matches!(self, Outcome::Threw(_))
    }

    /// The returned value, if the operation returned.
    pub fn result(&self) -> Option<&Value> {
        match self {
            Outcome::Returned(value) => Some(value),
            Outcome::Threw(_) => None,
        }
    }

    /// The error, if the operation threw.
    pub fn error(&self) -> Option<&ObjectError> {
        match self {
            Outcome::Returned(_) => None,
            Outcome::Threw(err) => Some(err),
        }
    }
}

/// Value(s) correlated with an event occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum Correlated {
    /// A single correlated member value.
    Single(Value),
    /// Several correlated members, by name.
    Named(BTreeMap<String, Value>),
}

/// A structured log record.
#[derive(Debug, Clone)]
pub enum TraceRecord {
    /// An instance was constructed.
    Constructor {
        /// When the construction was observed.
        timestamp: SystemTime,
        /// Time from invocation to (instrumented) instance or failure.
        duration: Duration,
        /// The constructed instance; absent when construction threw.
        instance: Option<ObjectRef>,
        /// Display identity of the instance; absent when construction threw.
        identity: Option<String>,
        /// Class name.
        class_name: String,
        /// Constructor arguments.
        args: Vec<Value>,
        /// Result or thrown error.
        outcome: Outcome,
    },
    /// A method was called.
    Method {
        /// When the call was observed.
        timestamp: SystemTime,
        /// Call duration; for deferred results, either time-to-obtain or
        /// time-to-settle depending on configuration.
        duration: Duration,
        /// Acting instance.
        instance: ObjectRef,
        /// Display identity of the instance.
        identity: String,
        /// Class name.
        class_name: String,
        /// Member name.
        member: String,
        /// Call arguments.
        args: Vec<Value>,
        /// Result or thrown error.
        outcome: Outcome,
    },
    /// A property was read through a native accessor.
    Getter {
        /// When the read was observed.
        timestamp: SystemTime,
        /// Accessor duration.
        duration: Duration,
        /// Acting instance.
        instance: ObjectRef,
        /// Display identity of the instance.
        identity: String,
        /// Class name.
        class_name: String,
        /// Member name.
        member: String,
        /// Read value or thrown error.
        outcome: Outcome,
    },
    /// A property was written.
    Setter {
        /// When the write was observed.
        timestamp: SystemTime,
        /// Mutator duration; zero for plain stored values.
        duration: Duration,
        /// Acting instance.
        instance: ObjectRef,
        /// Display identity of the instance.
        identity: String,
        /// Class name.
        class_name: String,
        /// Member name.
        member: String,
        /// Written value or thrown error.
        outcome: Outcome,
    },
    /// An event fired.
    Event {
        /// When the event was observed.
        timestamp: SystemTime,
        /// Always zero for events.
        duration: Duration,
        /// Acting instance.
        instance: ObjectRef,
        /// Display identity of the instance.
        identity: String,
        /// Class name.
        class_name: String,
        /// Event name.
        event: String,
        /// Raw event payload.
        payload: Value,
        /// Correlated member value(s), when a correlation was found.
        value: Option<Correlated>,
    },
    /// The instrumentation layer could not intercept something.
    Warning {
        /// When the warning was raised.
        timestamp: SystemTime,
        /// Always zero for warnings.
        duration: Duration,
        /// Free-text message.
        message: String,
    },
}

impl TraceRecord {
    /// Get the record kind name.
    pub fn record_kind(&self) -> &'static str {
        match self {
            TraceRecord::Constructor { .. } => "constructor",
            TraceRecord::Method { .. } => "method",
            TraceRecord::Getter { .. } => "getter",
            TraceRecord::Setter { .. } => "setter",
            TraceRecord::Event { .. } => "event",
            TraceRecord::Warning { .. } => "warning",
        }
    }

    /// The class name, absent for warnings.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TraceRecord::Constructor { class_name, .. }
            | TraceRecord::Method { class_name, .. }
            | TraceRecord::Getter { class_name, .. }
            | TraceRecord::Setter { class_name, .. }
            | TraceRecord::Event { class_name, .. } => Some(class_name),
            TraceRecord::Warning { .. } => None,
        }
    }

    /// The instance identity, where present.
    pub fn identity(&self) -> Option<&str> {
        match self {
            TraceRecord::Constructor { identity, .. } => identity.as_deref(),
            TraceRecord::Method { identity, .. }
            | TraceRecord::Getter { identity, .. }
            | TraceRecord::Setter { identity, .. }
            | TraceRecord::Event { identity, .. } => Some(identity),
            TraceRecord::Warning { .. } => None,
        }
    }

    /// The member name, for method/getter/setter records.
    pub fn member(&self) -> Option<&str> {
        match self {
            TraceRecord::Method { member, .. }
            | TraceRecord::Getter { member, .. }
            | TraceRecord::Setter { member, .. } => Some(member),
            _ => None,
        }
    }

    /// The operation outcome, where the record kind has one.
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            TraceRecord::Constructor { outcome, .. }
            | TraceRecord::Method { outcome, .. }
            | TraceRecord::Getter { outcome, .. }
            | TraceRecord::Setter { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// The record duration.
    pub fn duration(&self) -> Duration {
        match self {
            TraceRecord::Constructor { duration, .. }
            | TraceRecord::Method { duration, .. }
            | TraceRecord::Getter { duration, .. }
            | TraceRecord::Setter { duration, .. }
            | TraceRecord::Event { duration, .. }
            | TraceRecord::Warning { duration, .. } => *duration,
        }
    }

    /// Flatten to a serializable summary.
    pub fn summary(&self) -> RecordSummary {
        let mut summary = RecordSummary {
            kind: self.record_kind().to_string(),
            class_name: self.class_name().map(str::to_string),
            identity: self.identity().map(str::to_string),
            member: self.member().map(str::to_string),
            duration_ms: self.duration().as_millis() as u64,
            ..RecordSummary::default()
        };
        match self {
            TraceRecord::Constructor { args, outcome, .. }
            | TraceRecord::Method { args, outcome, .. } => {
                summary.args = Some(serde_json::Value::Array(
                    args.iter().map(Value::to_json).collect(),
                ));
                summary.apply_outcome(outcome);
            }
            TraceRecord::Getter { outcome, .. } | TraceRecord::Setter { outcome, .. } => {
                summary.apply_outcome(outcome);
            }
            TraceRecord::Event {
                event,
                payload,
                value,
                ..
            } => {
                summary.event = Some(event.clone());
                summary.payload = Some(payload.to_json());
                summary.value = value.as_ref().map(|correlated| match correlated {
                    Correlated::Single(v) => v.to_json(),
                    Correlated::Named(map) => serde_json::Value::Object(
                        map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
                    ),
                });
            }
            TraceRecord::Warning { message, .. } => {
                summary.message = Some(message.clone());
            }
        }
        summary
    }
}

/// Flat, serializable rendering of a trace record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSummary {
    /// Record kind name.
    pub kind: String,
    /// Class name, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Instance identity, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Member name, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    /// Event name, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Arguments as JSON, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
    /// Result as JSON, if the operation returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error message, if the operation threw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Event payload as JSON, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Correlated value as JSON, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Warning message, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl RecordSummary {
    fn apply_outcome(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Returned(value) => self.result = Some(value.to_json()),
            Outcome::Threw(err) => self.error = Some(err.to_string()),
        }
    }
}
