//! Listener lists backing the session's event subscriptions
//!
//! Two primitives with different consumption rules:
//! - `Multicast`: append-only, every emit replays all listeners in
//!   registration order.
//! - `OneShotStack`: listeners are popped and run last-registered first, each
//!   at most once.

use std::cell::RefCell;
use std::rc::Rc;

/// Append-only listener list dispatched first-registered first
pub struct Multicast<F: ?Sized> {
    handlers: RefCell<Vec<Rc<F>>>,
}

impl<F: ?Sized> Multicast<F> {
    pub fn new() -> Self {
        Self { handlers: RefCell::new(Vec::new()) }
    }

    /// Append `handler` and hand it back
    pub fn subscribe(&self, handler: Rc<F>) -> Rc<F> {
        self.handlers.borrow_mut().push(Rc::clone(&handler));
        handler
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Listeners registered so far, in registration order
    ///
    /// Dispatch iterates this snapshot, so a listener subscribing from inside
    /// a dispatch is first called on the next emit.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.handlers.borrow().clone()
    }
}

impl<F: ?Sized> Default for Multicast<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl Multicast<dyn Fn(&str)> {
    /// Call every listener with `line`; returns how many ran
    pub fn emit(&self, line: &str) -> usize {
        let handlers = self.snapshot();
        for handler in &handlers {
            handler(line);
        }
        handlers.len()
    }
}

impl Multicast<dyn Fn(f64, f64)> {
    /// Call every listener with `(current, total)`; returns how many ran
    pub fn emit(&self, current: f64, total: f64) -> usize {
        let handlers = self.snapshot();
        for handler in &handlers {
            handler(current, total);
        }
        handlers.len()
    }
}

/// Stack of one-shot listeners drained last-registered first
pub struct OneShotStack<F: ?Sized> {
    pending: RefCell<Vec<Rc<F>>>,
}

impl<F: ?Sized> OneShotStack<F> {
    pub fn new() -> Self {
        Self { pending: RefCell::new(Vec::new()) }
    }

    /// Push `handler` and hand it back
    pub fn push(&self, handler: Rc<F>) -> Rc<F> {
        self.pending.borrow_mut().push(Rc::clone(&handler));
        handler
    }

    /// Remove the most recently pushed listener
    pub fn pop(&self) -> Option<Rc<F>> {
        self.pending.borrow_mut().pop()
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl<F: ?Sized> Default for OneShotStack<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl OneShotStack<dyn Fn()> {
    /// Pop and run listeners until the stack is empty; returns how many ran
    ///
    /// A listener pushed while draining runs within the same drain.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Some(handler) = self.pop() {
            handler();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Rc<dyn Fn(&str)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |name: &str| -> Rc<dyn Fn(&str)> {
            let sink = Rc::clone(&sink);
            let name = name.to_string();
            Rc::new(move |line: &str| sink.borrow_mut().push(format!("{name}:{line}")))
        };
        (log, make)
    }

    #[test]
    fn test_multicast_dispatches_in_registration_order() {
        let list: Multicast<dyn Fn(&str)> = Multicast::new();
        let (log, make) = recorder();

        list.subscribe(make("h1"));
        list.subscribe(make("h2"));
        list.subscribe(make("h3"));

        assert_eq!(list.emit("boot"), 3);
        assert_eq!(*log.borrow(), vec!["h1:boot", "h2:boot", "h3:boot"]);

        // Listeners persist across emits
        assert_eq!(list.emit("again"), 3);
        assert_eq!(log.borrow().len(), 6);
    }

    #[test]
    fn test_subscribe_returns_same_handler() {
        let list: Multicast<dyn Fn(&str)> = Multicast::new();
        let handler: Rc<dyn Fn(&str)> = Rc::new(|_: &str| {});

        let returned = list.subscribe(Rc::clone(&handler));
        assert!(Rc::ptr_eq(&returned, &handler));
    }

    #[test]
    fn test_subscribe_during_emit_waits_for_next_emit() {
        let list: Rc<Multicast<dyn Fn(&str)>> = Rc::new(Multicast::new());
        let count = Rc::new(RefCell::new(0));

        let inner_list = Rc::clone(&list);
        let inner_count = Rc::clone(&count);
        list.subscribe(Rc::new(move |_: &str| {
            let counter = Rc::clone(&inner_count);
            inner_list.subscribe(Rc::new(move |_: &str| *counter.borrow_mut() += 1));
        }));

        assert_eq!(list.emit("first"), 1);
        assert_eq!(*count.borrow(), 0);
        assert_eq!(list.emit("second"), 2);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_progress_records_pairs_in_order() {
        let list: Multicast<dyn Fn(f64, f64)> = Multicast::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        list.subscribe(Rc::new(move |current: f64, total: f64| sink.borrow_mut().push((current, total))));

        list.emit(0.0, 0.0);
        list.emit(50.0, 100.0);
        list.emit(100.0, 100.0);

        assert_eq!(*seen.borrow(), vec![(0.0, 0.0), (50.0, 100.0), (100.0, 100.0)]);
    }

    #[test]
    fn test_one_shot_stack_drains_lifo_once() {
        let stack: OneShotStack<dyn Fn()> = OneShotStack::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for name in ["h1", "h2", "h3"] {
            let sink = Rc::clone(&log);
            stack.push(Rc::new(move || sink.borrow_mut().push(name)));
        }

        assert_eq!(stack.drain(), 3);
        assert_eq!(*log.borrow(), vec!["h3", "h2", "h1"]);
        assert!(stack.is_empty());

        assert_eq!(stack.drain(), 0);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_push_during_drain_runs_in_same_drain() {
        let stack: Rc<OneShotStack<dyn Fn()>> = Rc::new(OneShotStack::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_stack = Rc::clone(&stack);
        let inner_log = Rc::clone(&log);
        stack.push(Rc::new(move || {
            inner_log.borrow_mut().push("outer");
            let sink = Rc::clone(&inner_log);
            inner_stack.push(Rc::new(move || sink.borrow_mut().push("late")));
        }));

        assert_eq!(stack.drain(), 2);
        assert_eq!(*log.borrow(), vec!["outer", "late"]);
    }

    proptest! {
        #[test]
        fn prop_multicast_preserves_order(count in 0usize..32) {
            let list: Multicast<dyn Fn(&str)> = Multicast::new();
            let order = Rc::new(RefCell::new(Vec::new()));
            for i in 0..count {
                let sink = Rc::clone(&order);
                list.subscribe(Rc::new(move |_: &str| sink.borrow_mut().push(i)));
            }

            prop_assert_eq!(list.emit("x"), count);
            prop_assert_eq!(order.borrow().clone(), (0..count).collect::<Vec<_>>());
        }

        #[test]
        fn prop_one_shot_stack_reverses_order(count in 0usize..32) {
            let stack: OneShotStack<dyn Fn()> = OneShotStack::new();
            let order = Rc::new(RefCell::new(Vec::new()));
            for i in 0..count {
                let sink = Rc::clone(&order);
                stack.push(Rc::new(move || sink.borrow_mut().push(i)));
            }

            prop_assert_eq!(stack.drain(), count);
            prop_assert_eq!(order.borrow().clone(), (0..count).rev().collect::<Vec<_>>());
            prop_assert!(stack.is_empty());
        }
    }
}
