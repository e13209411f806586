//! Explicit change notification for state nodes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Rc<dyn Fn()>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    callbacks: RefCell<Vec<(SubscriptionId, Callback)>>,
}

impl Listeners {
    pub(crate) fn subscribe(&self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.callbacks.borrow_mut().push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    /// Call every listener. Listeners may subscribe, unsubscribe or write
    /// to the form while being notified.
    pub(crate) fn notify(&self) {
        let snapshot: Vec<Callback> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in snapshot {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let listeners = Listeners::default();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = listeners.subscribe(Rc::new(move || counter.set(counter.get() + 1)));

        listeners.notify();
        assert!(listeners.unsubscribe(id));
        listeners.notify();
        assert_eq!(hits.get(), 1);
        assert!(!listeners.unsubscribe(id));
    }
}
