//! Ordered observer lists with removable subscriptions.
use std::fmt;

/// Handle returned by a subscribe call; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

/// Listeners for one event type, notified in subscription order.
pub struct Subscribers<E> {
    next_id: u64,
    entries: Vec<(Subscription, Callback<E>)>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(&E) + 'static,
    {
        let handle = Subscription(self.next_id);
        self.next_id += 1;
        self.entries.push((handle, Box::new(callback)));
        handle
    }

    /// Returns false if the handle was already removed or never belonged here.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != handle);
        self.entries.len() != before
    }

    pub fn notify(&mut self, event: &E) {
        for (_, callback) in self.entries.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn notifies_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut subs = Subscribers::<u32>::new();

        let a = Rc::clone(&seen);
        subs.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = Rc::clone(&seen);
        subs.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        subs.notify(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let count = Rc::new(RefCell::new(0));
        let mut subs = Subscribers::<()>::new();

        let c = Rc::clone(&count);
        let first = subs.subscribe(move |_| *c.borrow_mut() += 1);
        let c = Rc::clone(&count);
        subs.subscribe(move |_| *c.borrow_mut() += 10);

        assert!(subs.unsubscribe(first));
        assert!(!subs.unsubscribe(first));
        subs.notify(&());
        assert_eq!(*count.borrow(), 10);
        assert_eq!(subs.len(), 1);
    }
}
