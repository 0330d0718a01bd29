//! Host-element instrumentation: shimming objects owned by a surrounding
//! environment, looked up by tag.

use shimmer_object::ObjectRef;
use tracing::debug;

use crate::config::TraceConfig;
use crate::engine::ShimEngine;

/// A surrounding environment that owns tagged elements, such as a
/// document tree or a widget hierarchy.
///
/// The engine uses it to find the current elements of a tag and to
/// hear about elements added later.
pub trait ElementHost: Send + Sync {
    /// All current elements carrying `tag`.
    fn elements_by_tag(&self, tag: &str) -> Vec<ObjectRef>;

    /// Registers a callback invoked for every element of `tag` added
    /// after this call.
    fn on_element_added(&self, tag: &str, callback: Box<dyn Fn(ObjectRef) + Send + Sync>);
}

impl ShimEngine {
    /// Instruments every current element of `tag` and watches the host
    /// for new ones, instrumenting each as it appears.
    ///
    /// Host elements are shared with the environment, so they are
    /// always shimmed in place; a wrapper would never be dispatched to.
    pub fn trace_tag(&self, host: &dyn ElementHost, tag: &str, config: &TraceConfig) {
        let config = config.clone().with_in_place(true);
        for element in host.elements_by_tag(tag) {
            self.trace_object(&element, &config);
        }
        let engine = self.clone();
        let watched = config.clone();
        host.on_element_added(
            tag,
            Box::new(move |element| {
                engine.trace_object(&element, &watched);
            }),
        );
        debug!(tag, "watching tag for new elements");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::RwLock;
    use shimmer_object::{DynObject, Value};
    use shimmer_observe::CollectingSink;

    use super::*;

    type AddedCallback = Box<dyn Fn(ObjectRef) + Send + Sync>;

    #[derive(Default)]
    struct FakeHost {
        elements: RwLock<Vec<(String, ObjectRef)>>,
        callbacks: RwLock<Vec<(String, AddedCallback)>>,
    }

    impl FakeHost {
        fn insert(&self, tag: &str, element: ObjectRef) {
            self.elements
                .write()
                .push((tag.to_string(), element.clone()));
            for (watched, callback) in self.callbacks.read().iter() {
                if watched == tag {
                    callback(element.clone());
                }
            }
        }
    }

    impl ElementHost for FakeHost {
        fn elements_by_tag(&self, tag: &str) -> Vec<ObjectRef> {
            self.elements
                .read()
                .iter()
                .filter(|(t, _)| t == tag)
                .map(|(_, element)| element.clone())
                .collect()
        }

        fn on_element_added(&self, tag: &str, callback: AddedCallback) {
            self.callbacks.write().push((tag.to_string(), callback));
        }
    }

    fn video_element() -> ObjectRef {
        DynObject::new()
            .with_data("volume", Value::from(50.0))
            .into_ref()
    }

    #[test]
    fn test_existing_elements_are_instrumented() {
        let engine = ShimEngine::new();
        let sink = Arc::new(CollectingSink::new());
        let config = TraceConfig::new().with_sink(sink.clone());
        let host = FakeHost::default();
        let video = video_element();
        host.insert("video", video.clone());
        host.insert("audio", video_element());

        engine.trace_tag(&host, "video", &config);
        assert!(video.instrumented());
        assert!(!host.elements_by_tag("audio")[0].instrumented());

        video.set("volume", Value::from(75.0)).unwrap();
        assert_eq!(sink.of_kind("setter").len(), 1);
    }

    #[test]
    fn test_late_elements_are_instrumented() {
        let engine = ShimEngine::new();
        let sink = Arc::new(CollectingSink::new());
        let config = TraceConfig::new().with_sink(sink.clone());
        let host = FakeHost::default();
        engine.trace_tag(&host, "video", &config);

        let late = video_element();
        host.insert("video", late.clone());
        assert!(late.instrumented());
    }

    #[test]
    fn test_trace_tag_forces_in_place() {
        let engine = ShimEngine::new();
        let sink = Arc::new(CollectingSink::new());
        let config = TraceConfig::new()
            .with_sink(sink.clone())
            .with_in_place(false);
        let host = FakeHost::default();
        let video = video_element();
        host.insert("video", video.clone());

        engine.trace_tag(&host, "video", &config);
        // The host's own reference is the one that got shimmed.
        assert!(video.instrumented());
    }
}
