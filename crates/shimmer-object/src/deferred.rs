//! Deferred asynchronous values.
//!
//! A `Deferred` represents a result that is not yet available. It settles
//! exactly once with either a success value or a failure; continuations are
//! registered explicitly and invoked in registration order. There is no
//! polling: a continuation registered after settlement runs immediately.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ObjectError, ObjectResult};
use crate::value::Value;

/// The terminal outcome of a deferred value.
pub type SettleResult = ObjectResult<Value>;

type Continuation = Box<dyn FnOnce(&SettleResult) + Send>;

enum State {
    Pending(Vec<Continuation>),
    Settled(SettleResult),
}

/// A deferred asynchronous value with exactly one eventual outcome.
pub struct Deferred {
    state: Mutex<State>,
}

/// Shared handle to a deferred value.
#[derive(Clone)]
pub struct DeferredRef(Arc<Deferred>);

impl DeferredRef {
    /// Create a deferred value that has not settled yet.
    pub fn pending() -> Self {
        Self(Arc::new(Deferred {
            state: Mutex::new(State::Pending(Vec::new())),
        }))
    }

    /// Create an already-resolved deferred value.
    pub fn resolved(value: impl Into<Value>) -> Self {
        let d = Self::pending();
        d.resolve(value.into());
        d
    }

    /// Create an already-rejected deferred value.
    pub fn rejected(error: ObjectError) -> Self {
        let d = Self::pending();
        d.reject(error);
        d
    }

    /// Settle with a success value. Later settles are ignored.
    pub fn resolve(&self, value: Value) {
        self.settle(Ok(value));
    }

    /// Settle with a failure. Later settles are ignored.
    pub fn reject(&self, error: ObjectError) {
        self.settle(Err(error));
    }

    /// Register a continuation.
    ///
    /// Runs immediately if the value has already settled; otherwise it is
    /// queued and runs when settlement happens. Continuations run in
    /// registration order and at most once.
    pub fn subscribe(&self, f: impl FnOnce(&SettleResult) + Send + 'static) {
        let settled = {
            let mut state = self.0.state.lock();
            match &mut *state {
                State::Pending(queue) => {
                    queue.push(Box::new(f));
                    None
                }
                State::Settled(result) => Some((f, result.clone())),
            }
        };
        if let Some((f, result)) = settled {
            f(&result);
        }
    }

    /// Check whether the value has settled.
    pub fn is_settled(&self) -> bool {
        matches!(&*self.0.state.lock(), State::Settled(_))
    }

    /// The settled outcome, if settlement has happened.
    pub fn settled(&self) -> Option<SettleResult> {
        match &*self.0.state.lock() {
            State::Settled(result) => Some(result.clone()),
            State::Pending(_) => None,
        }
    }

    /// Check whether two references point at the same deferred value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn settle(&self, result: SettleResult) {
        // First settle wins; continuations run outside the lock.
        let continuations = {
            let mut state = self.0.state.lock();
            match &mut *state {
                State::Settled(_) => return,
                State::Pending(queue) => {
                    let queue = std::mem::take(queue);
                    *state = State::Settled(result.clone());
                    queue
                }
            }
        };
        for continuation in continuations {
            continuation(&result);
        }
    }
}

impl fmt::Debug for DeferredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_settled() { "settled" } else { "pending" };
        write!(f, "[deferred {state} @ {:p}]", Arc::as_ptr(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_before_settlement() {
        let d = DeferredRef::pending();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        d.subscribe(move |result| {
            assert_eq!(result.as_ref().unwrap(), &Value::Str("ok".to_string()));
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        d.resolve(Value::from("ok"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_after_settlement_runs_immediately() {
        let d = DeferredRef::resolved(Value::from(7i64));
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        d.subscribe(move |result| {
            assert_eq!(result.as_ref().unwrap(), &Value::Number(7.0));
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_settle_wins() {
        let d = DeferredRef::pending();
        d.resolve(Value::from(1i64));
        d.reject(ObjectError::thrown("late"));
        d.resolve(Value::from(2i64));

        assert_eq!(d.settled().unwrap().unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_continuations_run_in_registration_order() {
        let d = DeferredRef::pending();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            d.subscribe(move |_| order.lock().push(i));
        }
        d.resolve(Value::Null);

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rejection_observed() {
        let d = DeferredRef::pending();
        let seen = Arc::new(Mutex::new(None));

        let s = Arc::clone(&seen);
        d.subscribe(move |result| {
            *s.lock() = Some(result.clone());
        });
        d.reject(ObjectError::thrown("nope"));

        match seen.lock().take() {
            Some(Err(ObjectError::Thrown(v))) => assert_eq!(v, Value::Str("nope".to_string())),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
