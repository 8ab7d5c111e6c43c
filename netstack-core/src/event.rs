//! Event subscription service.
//!
//! A flat list of `(handler, arg)` pairs, invoked in registration order
//! whenever [`crate::Stack::raise_event`] is called. Used by drivers to
//! signal asynchronous state changes (link up/down, data available on a
//! blocking device) without the driver needing to know who is listening.

use std::any::Any;
use std::sync::Mutex;

/// Handler invoked for an event subscription, receiving the opaque `arg`
/// it was registered with.
pub type EventHandler = Box<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;

struct EventSubscription {
    handler: EventHandler,
    arg: Box<dyn Any + Send + Sync>,
}

/// Append-only table of event subscriptions.
#[derive(Default)]
pub(crate) struct EventService {
    subscriptions: Mutex<Vec<EventSubscription>>,
}

impl EventService {
    pub(crate) fn subscribe(&self, handler: EventHandler, arg: Box<dyn Any + Send + Sync>) {
        let mut subs = self.subscriptions.lock().expect("event list poisoned");
        subs.push(EventSubscription { handler, arg });
    }

    /// Invoke every subscription, in registration order, with its arg.
    pub(crate) fn dispatch(&self) {
        let subs = self.subscriptions.lock().expect("event list poisoned");
        for sub in subs.iter() {
            (sub.handler)(sub.arg.as_ref());
        }
    }
}

#[cfg(test)]
mod event_tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn invokes_subscriptions_in_registration_order() {
        let service = EventService::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3u32 {
            let order = Arc::clone(&order);
            service.subscribe(
                Box::new(move |arg| {
                    let id = *arg.downcast_ref::<u32>().unwrap();
                    order.lock().unwrap().push(id);
                }),
                Box::new(id),
            );
        }

        service.dispatch();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn passes_the_registered_argument() {
        let service = EventService::default();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);

        service.subscribe(
            Box::new(move |arg| {
                seen_clone.store(*arg.downcast_ref::<u32>().unwrap(), Ordering::SeqCst);
            }),
            Box::new(42u32),
        );

        service.dispatch();
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }
}
