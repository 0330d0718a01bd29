//! Sinks consuming trace records.
//!
//! A sink receives one record at a time, synchronously; its return value is
//! never used. The default sink renders records through `tracing`; the
//! collecting sink keeps them for later inspection (tests lean on it).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::TraceRecord;

/// Consumer of trace records.
pub trait TraceSink: Send + Sync {
    /// Called once per observed occurrence.
    fn record(&self, record: &TraceRecord);
}

/// A sink that renders records through `tracing`.
pub struct LoggingSink {
    _private: (),
}

impl LoggingSink {
    /// Create a new logging sink.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for LoggingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for LoggingSink {
    fn record(&self, record: &TraceRecord) {
        let summary = record.summary();
        match record {
            TraceRecord::Constructor { .. } => {
                tracing::info!(
                    kind = "constructor",
                    class = summary.class_name.as_deref().unwrap_or(""),
                    identity = summary.identity.as_deref().unwrap_or(""),
                    args = %summary.args.unwrap_or(serde_json::Value::Null),
                    result = %summary.result.unwrap_or(serde_json::Value::Null),
                    error = summary.error.as_deref().unwrap_or(""),
                    duration_ms = summary.duration_ms,
                    "Constructed"
                );
            }
            TraceRecord::Method { .. } => {
                tracing::info!(
                    kind = "method",
                    class = summary.class_name.as_deref().unwrap_or(""),
                    identity = summary.identity.as_deref().unwrap_or(""),
                    member = summary.member.as_deref().unwrap_or(""),
                    args = %summary.args.unwrap_or(serde_json::Value::Null),
                    result = %summary.result.unwrap_or(serde_json::Value::Null),
                    error = summary.error.as_deref().unwrap_or(""),
                    duration_ms = summary.duration_ms,
                    "Method called"
                );
            }
            TraceRecord::Getter { .. } => {
                tracing::debug!(
                    kind = "getter",
                    class = summary.class_name.as_deref().unwrap_or(""),
                    identity = summary.identity.as_deref().unwrap_or(""),
                    member = summary.member.as_deref().unwrap_or(""),
                    result = %summary.result.unwrap_or(serde_json::Value::Null),
                    error = summary.error.as_deref().unwrap_or(""),
                    "Property read"
                );
            }
            TraceRecord::Setter { .. } => {
                tracing::debug!(
                    kind = "setter",
                    class = summary.class_name.as_deref().unwrap_or(""),
                    identity = summary.identity.as_deref().unwrap_or(""),
                    member = summary.member.as_deref().unwrap_or(""),
                    value = %summary.result.unwrap_or(serde_json::Value::Null),
                    error = summary.error.as_deref().unwrap_or(""),
                    "Property written"
                );
            }
            TraceRecord::Event { .. } => {
                tracing::info!(
                    kind = "event",
                    class = summary.class_name.as_deref().unwrap_or(""),
                    identity = summary.identity.as_deref().unwrap_or(""),
                    event = summary.event.as_deref().unwrap_or(""),
                    payload = %summary.payload.unwrap_or(serde_json::Value::Null),
                    value = %summary.value.unwrap_or(serde_json::Value::Null),
                    "Event fired"
                );
            }
            TraceRecord::Warning { message, .. } => {
                tracing::warn!(kind = "warning", message = %message, "Instrumentation warning");
            }
        }
    }
}

/// A sink that collects records for later analysis.
pub struct CollectingSink {
    records: RwLock<Vec<TraceRecord>>,
    max_records: usize,
}

impl CollectingSink {
    /// Create an unbounded collecting sink.
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    /// Create a collecting sink that keeps at most `max_records` records.
    pub fn with_limit(max_records: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            max_records,
        }
    }

    /// Get collected records.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.read().clone()
    }

    /// Get collected records of one kind.
    pub fn of_kind(&self, kind: &str) -> Vec<TraceRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.record_kind() == kind)
            .cloned()
            .collect()
    }

    /// The most recent record, if any.
    pub fn last(&self) -> Option<TraceRecord> {
        self.records.read().last().cloned()
    }

    /// Clear collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Get record count.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for CollectingSink {
    fn record(&self, record: &TraceRecord) {
        let mut records = self.records.write();
        if records.len() < self.max_records {
            records.push(record.clone());
        }
    }
}

/// A sink that forwards every record to several sinks.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}

impl FanoutSink {
    /// Create an empty fanout sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream sink.
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Get downstream sink count.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl TraceSink for FanoutSink {
    fn record(&self, record: &TraceRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Outcome;
    use shimmer_object::{DynObject, Value};
    use std::time::{Duration, SystemTime};

    fn getter_record(member: &str) -> TraceRecord {
        TraceRecord::Getter {
            timestamp: SystemTime::now(),
            duration: Duration::ZERO,
            instance: DynObject::new().into_ref(),
            identity: "Object_1".to_string(),
            class_name: "Object".to_string(),
            member: member.to_string(),
            outcome: Outcome::Returned(Value::Null),
        }
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.record(&getter_record("a"));
        sink.record(&getter_record("b"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.of_kind("getter").len(), 2);
        assert!(sink.of_kind("setter").is_empty());
        assert_eq!(sink.last().unwrap().member(), Some("b"));

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_collecting_sink_limit() {
        let sink = CollectingSink::with_limit(2);
        for member in ["a", "b", "c", "d"] {
            sink.record(&getter_record(member));
        }
        assert_eq!(sink.len(), 2); // Should be capped at the limit
    }

    #[test]
    fn test_fanout_sink_forwards_to_all() {
        let first = Arc::new(CollectingSink::new());
        let second = Arc::new(CollectingSink::new());
        let fanout = FanoutSink::new()
            .with_sink(Arc::clone(&first) as Arc<dyn TraceSink>)
            .with_sink(Arc::clone(&second) as Arc<dyn TraceSink>);

        assert_eq!(fanout.sink_count(), 2);
        fanout.record(&getter_record("x"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
