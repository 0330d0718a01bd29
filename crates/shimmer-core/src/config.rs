//! Per-target instrumentation configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use shimmer_observe::{LoggingSink, TraceRecord, TraceSink};

/// Controls what an instrumentation pass intercepts and where the
/// resulting records go.
///
/// A config is attached to a class or object when instrumentation is
/// requested and is carried by every shim installed during that pass,
/// so later calls, reads, writes, and events all report through the
/// same sink. Cloning is cheap; the sink is shared behind an [`Arc`].
#[derive(Clone)]
pub struct TraceConfig {
    /// Rewrite members on the original object instead of building a
    /// delegating wrapper.
    pub in_place: bool,
    /// Intercept callable members.
    pub methods: bool,
    /// Intercept non-callable members.
    pub properties: bool,
    /// Report deferred-valued properties as settlement events instead
    /// of plain properties.
    pub promise_properties_as_events: bool,
    /// Additional member names to instrument beyond the enumerable set.
    pub extra_properties: Vec<String>,
    /// Member names to leave out of logging. Wrapper-mode targets still
    /// delegate them passively.
    pub skip_properties: Vec<String>,
    /// Intercept listener members and listener registration.
    pub events: bool,
    /// Event names to observe even when no listener member or
    /// registration ever names them.
    pub extra_events: Vec<String>,
    /// Event names to pass through without logging.
    pub skip_events: Vec<String>,
    /// For each event name, the members whose values are captured when
    /// the event fires. Overrides the name-matching heuristic.
    pub event_properties: BTreeMap<String, Vec<String>>,
    /// Member names checked on returned objects for instrumentable
    /// values when the object itself is not recognized.
    pub explore_result_fields: Vec<String>,
    /// Emit a record for a deferred-returning method as soon as the
    /// call returns, instead of waiting for settlement.
    pub log_async_results_immediately: bool,
    /// Member consulted for a stable display identity.
    pub id_property: String,
    /// Destination for every record produced under this config.
    pub sink: Arc<dyn TraceSink>,
}

impl TraceConfig {
    /// Creates a config with every interception category enabled,
    /// in-place rewriting, and a [`LoggingSink`].
    pub fn new() -> Self {
        Self {
            in_place: true,
            methods: true,
            properties: true,
            promise_properties_as_events: true,
            extra_properties: Vec::new(),
            skip_properties: Vec::new(),
            events: true,
            extra_events: Vec::new(),
            skip_events: Vec::new(),
            event_properties: BTreeMap::new(),
            explore_result_fields: Vec::new(),
            log_async_results_immediately: true,
            id_property: "id".to_string(),
            sink: Arc::new(LoggingSink::new()),
        }
    }

    /// Sets whether members are rewritten on the original object.
    pub fn with_in_place(mut self, in_place: bool) -> Self {
        self.in_place = in_place;
        self
    }

    /// Sets whether callable members are intercepted.
    pub fn with_methods(mut self, methods: bool) -> Self {
        self.methods = methods;
        self
    }

    /// Sets whether non-callable members are intercepted.
    pub fn with_properties(mut self, properties: bool) -> Self {
        self.properties = properties;
        self
    }

    /// Sets whether deferred-valued properties report as events.
    pub fn with_promise_properties_as_events(mut self, as_events: bool) -> Self {
        self.promise_properties_as_events = as_events;
        self
    }

    /// Adds a member name to instrument beyond the enumerable set.
    pub fn with_extra_property(mut self, name: impl Into<String>) -> Self {
        self.extra_properties.push(name.into());
        self
    }

    /// Adds a member name to exclude from logging.
    pub fn with_skip_property(mut self, name: impl Into<String>) -> Self {
        self.skip_properties.push(name.into());
        self
    }

    /// Sets whether listener members and registration are intercepted.
    pub fn with_events(mut self, events: bool) -> Self {
        self.events = events;
        self
    }

    /// Adds an event name to observe unconditionally.
    pub fn with_extra_event(mut self, event: impl Into<String>) -> Self {
        self.extra_events.push(event.into());
        self
    }

    /// Adds an event name to pass through without logging.
    pub fn with_skip_event(mut self, event: impl Into<String>) -> Self {
        self.skip_events.push(event.into());
        self
    }

    /// Names the members captured alongside an event, replacing the
    /// name-matching heuristic for that event.
    pub fn with_event_properties<I, S>(mut self, event: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_properties
            .insert(event.into(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a member name probed on unrecognized returned objects.
    pub fn with_explore_result_field(mut self, name: impl Into<String>) -> Self {
        self.explore_result_fields.push(name.into());
        self
    }

    /// Sets whether deferred-returning methods log at call time.
    pub fn with_log_async_results_immediately(mut self, immediately: bool) -> Self {
        self.log_async_results_immediately = immediately;
        self
    }

    /// Sets the member consulted for a display identity.
    pub fn with_id_property(mut self, name: impl Into<String>) -> Self {
        self.id_property = name.into();
        self
    }

    /// Replaces the record destination.
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Delivers a record to the configured sink.
    pub(crate) fn emit(&self, record: TraceRecord) {
        self.sink.record(&record);
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TraceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceConfig")
            .field("in_place", &self.in_place)
            .field("methods", &self.methods)
            .field("properties", &self.properties)
            .field(
                "promise_properties_as_events",
                &self.promise_properties_as_events,
            )
            .field("extra_properties", &self.extra_properties)
            .field("skip_properties", &self.skip_properties)
            .field("events", &self.events)
            .field("extra_events", &self.extra_events)
            .field("skip_events", &self.skip_events)
            .field("event_properties", &self.event_properties)
            .field("explore_result_fields", &self.explore_result_fields)
            .field(
                "log_async_results_immediately",
                &self.log_async_results_immediately,
            )
            .field("id_property", &self.id_property)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TraceConfig::default();
        assert!(config.in_place);
        assert!(config.methods);
        assert!(config.properties);
        assert!(config.events);
        assert!(config.promise_properties_as_events);
        assert!(config.log_async_results_immediately);
        assert_eq!(config.id_property, "id");
        assert!(config.extra_events.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let config = TraceConfig::new()
            .with_in_place(false)
            .with_methods(false)
            .with_skip_property("internal")
            .with_extra_event("ready")
            .with_event_properties("seek", ["position", "duration"])
            .with_id_property("name");
        assert!(!config.in_place);
        assert!(!config.methods);
        assert_eq!(config.skip_properties, vec!["internal"]);
        assert_eq!(config.extra_events, vec!["ready"]);
        assert_eq!(
            config.event_properties.get("seek").map(Vec::len),
            Some(2)
        );
        assert_eq!(config.id_property, "name");
    }

    #[test]
    fn test_debug_omits_sink() {
        let rendered = format!("{:?}", TraceConfig::new());
        assert!(rendered.contains("in_place"));
        assert!(!rendered.contains("sink"));
    }
}
