//! # Lifecycle Monitor
//!
//! A synchronous publish/subscribe bus for lifecycle events.
//!
//! - Events are typed: an [`EventDefinition<T>`] only accepts handlers for `&T`.
//! - [`Monitor::raise`] delivers to every matching handler in registration order
//!   before returning.
//! - A handler that returns an error or panics is logged and counted; delivery
//!   to the remaining handlers continues.
//! - Handlers are snapshotted before delivery, so a handler may subscribe or
//!   unsubscribe without deadlocking the bus.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{trace, warn};

/// Error type a subscriber may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Arc<dyn Fn(&dyn Any) -> Result<(), SubscriberError> + Send + Sync>;

/// A named event carrying a payload of type `T`.
pub struct EventDefinition<T> {
    name: &'static str,
    payload: PhantomData<fn(&T)>,
}

impl<T> EventDefinition<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for EventDefinition<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EventDefinition<T> {}

impl<T> fmt::Debug for EventDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventDefinition").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    /// Some handlers failed. All handlers were still invoked.
    #[error("{failed} subscriber(s) failed while handling {event}")]
    SubscribersFailed { event: &'static str, failed: usize },
}

struct Subscription {
    id: SubscriptionId,
    event: &'static str,
    handler: Handler,
}

#[derive(Default)]
pub struct Monitor {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<T, F>(&self, event: EventDefinition<T>, handler: F) -> SubscriptionId
    where
        T: Any,
        F: Fn(&T) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler = Arc::new(move |payload: &dyn Any| match payload.downcast_ref::<T>() {
            Some(payload) => handler(payload),
            None => Ok(()),
        });

        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                event: event.name(),
                handler,
            });
        trace!(event = event.name(), subscription = id.0, "Subscribed");
        id
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    pub fn subscriber_count<T>(&self, event: EventDefinition<T>) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.event == event.name())
            .count()
    }

    /// Delivers `payload` to every handler of `event`, in registration order.
    pub fn raise<T: Any>(&self, event: EventDefinition<T>, payload: &T) -> Result<(), MonitorError> {
        let handlers: Vec<(SubscriptionId, Handler)> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.event == event.name())
            .map(|s| (s.id, Arc::clone(&s.handler)))
            .collect();

        trace!(event = event.name(), handlers = handlers.len(), "Raising event");

        let mut failed = 0;
        for (id, handler) in handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(payload as &dyn Any)));
            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            failed += 1;
            warn!(event = event.name(), subscription = id.0, %reason, "Subscriber failed");
        }

        if failed == 0 {
            Ok(())
        } else {
            Err(MonitorError::SubscribersFailed {
                event: event.name(),
                failed,
            })
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .subscriptions
            .read()
            .map(|s| s.len())
            .unwrap_or_default();
        f.debug_struct("Monitor")
            .field("subscriptions", &count)
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PING: EventDefinition<u32> = EventDefinition::new("Ping");
    const PONG: EventDefinition<String> = EventDefinition::new("Pong");

    #[test]
    fn test_delivery_in_registration_order() {
        let monitor = Monitor::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            monitor.subscribe(PING, move |value: &u32| {
                seen.lock().unwrap().push(format!("{label}:{value}"));
                Ok(())
            });
        }

        monitor.raise(PING, &7).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:7", "second:7", "third:7"]
        );
    }

    #[test]
    fn test_events_are_isolated_by_name() {
        let monitor = Monitor::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        monitor.subscribe(PONG, move |_: &String| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        monitor.raise(PING, &1).unwrap();
        assert_eq!(*hits.lock().unwrap(), 0);
        monitor.raise(PONG, &"x".to_owned()).unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_faulting_subscribers_do_not_stop_delivery() {
        let monitor = Monitor::new();
        let reached = Arc::new(Mutex::new(false));

        monitor.subscribe(PING, |_: &u32| Err("refused".into()));
        monitor.subscribe(PING, |_: &u32| panic!("boom"));
        let flag = Arc::clone(&reached);
        monitor.subscribe(PING, move |_: &u32| {
            *flag.lock().unwrap() = true;
            Ok(())
        });

        let result = monitor.raise(PING, &1);

        assert_eq!(
            result,
            Err(MonitorError::SubscribersFailed {
                event: "Ping",
                failed: 2
            })
        );
        assert!(*reached.lock().unwrap());
    }

    #[test]
    fn test_unsubscribe() {
        let monitor = Monitor::new();
        let id = monitor.subscribe(PING, |_: &u32| Ok(()));
        assert_eq!(monitor.subscriber_count(PING), 1);
        assert!(monitor.unsubscribe(id));
        assert!(!monitor.unsubscribe(id));
        assert_eq!(monitor.subscriber_count(PING), 0);
    }

    #[test]
    fn test_handler_may_subscribe_during_raise() {
        let monitor = Arc::new(Monitor::new());
        let inner = Arc::clone(&monitor);
        monitor.subscribe(PING, move |_: &u32| {
            inner.subscribe(PONG, |_: &String| Ok(()));
            Ok(())
        });

        monitor.raise(PING, &1).unwrap();
        assert_eq!(monitor.subscriber_count(PONG), 1);
    }
}
