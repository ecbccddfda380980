//! Change propagation between pipeline stages.
//!
//! Each stage owns an `ObserverList`; a mutating operation calls `notify`
//! after it completes, which runs every registered callback exactly once,
//! synchronously, in registration order. This is the only way downstream
//! caches learn they are stale; there is no time-based expiry.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type Callback = Box<dyn FnMut()>;

/// An explicit list of zero-argument change callbacks.
///
/// Cloning yields a handle to the same list, so a component can hand a
/// clone to closures that must fire its notifications.
#[derive(Clone, Default)]
pub struct ObserverList {
    callbacks: Rc<RefCell<Vec<Callback>>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback. Callbacks registered while a notification is
    /// running take part in later notifications, not the current one.
    pub fn subscribe(&self, callback: impl FnMut() + 'static) {
        self.callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Invokes every registered callback once, in registration order.
    pub fn notify(&self) {
        // The list is taken out for the duration of the run so a callback
        // may subscribe without hitting an active borrow.
        let mut running = std::mem::take(&mut *self.callbacks.borrow_mut());
        for callback in running.iter_mut() {
            callback();
        }

        let mut slot = self.callbacks.borrow_mut();
        let added = std::mem::replace(&mut *slot, running);
        slot.extend(added);
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("callbacks", &self.callbacks.borrow().len())
            .finish()
    }
}
