//! Change-notification plumbing shared by menus and action groups.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<E> = Rc<dyn Fn(&E)>;

/// Handler list for one notification kind.
///
/// Emission iterates over a snapshot, so handlers may connect or disconnect
/// (or trigger further emissions) while being called.
pub(crate) struct Handlers<E> {
    next_id: Cell<u64>,
    slots: RefCell<Vec<(u64, Handler<E>)>>,
}

impl<E: 'static> Handlers<E> {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            next_id: Cell::new(0),
            slots: RefCell::new(Vec::new()),
        })
    }

    /// Registers a handler. It stays connected until the returned
    /// [`Subscription`] is dropped.
    pub(crate) fn connect(self: &Rc<Self>, handler: Box<dyn Fn(&E)>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.slots.borrow_mut().push((id, Rc::from(handler)));

        let weak: Weak<Self> = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(handlers) = weak.upgrade() {
                handlers.slots.borrow_mut().retain(|(slot, _)| *slot != id);
            }
        })
    }

    pub(crate) fn emit(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self
            .slots
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in snapshot {
            handler(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.borrow().len()
    }
}

/// Handle for a connected notification handler.
///
/// Dropping it disconnects the handler.
#[must_use = "dropping a Subscription disconnects its handler"]
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// Keeps the handler connected for the lifetime of the source.
    pub fn detach(mut self) {
        self.disconnect = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.disconnect.is_some())
            .finish()
    }
}
