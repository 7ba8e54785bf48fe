//! Change events and the single-threaded subscription machinery.
//!
//! Every config node owns two [`EventSource`]s: one for [`ChangeEvent`]s
//! (persistence-facing, path-aware) and one for [`PropertyChanged`]
//! notifications (UI-facing). Subscribers hold a [`Subscription`] guard;
//! the source only keeps a weak handle back to detach it, so no node ever
//! points at its parent.

use crate::error::Result;
use crate::path;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// One committed mutation somewhere in a config tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Name of the field on the node that emitted this event.
    pub property_name: String,
    /// Dotted path from the observing node to the field that changed,
    /// e.g. `Settings.NestedValue` or `CustomSettings[Item].NestedNumber`.
    pub full_path: String,
    pub old_value: Value,
    pub new_value: Value,
    /// Statically declared type of the field.
    pub value_type: &'static str,
    /// False for fields excluded from auto-save.
    pub auto_save: bool,
}

impl ChangeEvent {
    /// Event for a field changed directly on the emitting node.
    pub fn local(
        property_name: &str,
        old_value: Value,
        new_value: Value,
        value_type: &'static str,
        auto_save: bool,
    ) -> Self {
        Self {
            property_name: property_name.to_string(),
            full_path: property_name.to_string(),
            old_value,
            new_value,
            value_type,
            auto_save,
        }
    }

    /// Rewrite a child's event into the scope of the node holding the child
    /// under `owner_field`. Values, type and auto-save flag carry over.
    pub fn reparent(&self, owner_field: &str, is_collection_item: bool) -> Self {
        Self {
            property_name: owner_field.to_string(),
            full_path: path::build_path(owner_field, self, is_collection_item),
            old_value: self.old_value.clone(),
            new_value: self.new_value.clone(),
            value_type: self.value_type,
            auto_save: self.auto_save,
        }
    }
}

/// UI-facing notification that a named property now has a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyChanged {
    pub property_name: &'static str,
}

type Handler<E> = Rc<dyn Fn(&E) -> Result<()>>;

trait Detach {
    fn detach(&self, id: u64);
}

struct Registry<E> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler<E>)>>,
}

impl<E> Detach for Registry<E> {
    fn detach(&self, id: u64) {
        self.handlers.borrow_mut().retain(|(handler_id, _)| *handler_id != id);
    }
}

/// A list of handlers for events of type `E`.
///
/// Cloning yields another handle to the same list.
pub struct EventSource<E> {
    registry: Rc<Registry<E>>,
}

impl<E: 'static> EventSource<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                next_id: Cell::new(0),
                handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Attach a handler. It stays attached for as long as the returned
    /// guard is alive.
    #[must_use = "dropping the subscription detaches the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) -> Result<()> + 'static,
    {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry
            .handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));

        let registry: Rc<dyn Detach> = self.registry.clone();
        Subscription {
            id,
            source: Some(Rc::downgrade(&registry)),
        }
    }

    /// Deliver `event` to every handler attached when dispatch starts.
    ///
    /// A failing handler does not stop delivery; the first error is
    /// returned once every handler has run.
    pub fn emit(&self, event: &E) -> Result<()> {
        let snapshot: Vec<Handler<E>> = self
            .registry
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        let mut first_error = None;
        for handler in snapshot {
            if let Err(e) = handler(event) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers.borrow().len()
    }
}

impl<E: 'static> Default for EventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventSource<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<E> fmt::Debug for EventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("subscribers", &self.registry.handlers.borrow().len())
            .finish()
    }
}

/// Guard for an attached handler. Detaches on drop.
pub struct Subscription {
    id: u64,
    source: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Detach now instead of waiting for drop.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// True until the guard is detached or the source is dropped.
    pub fn is_active(&self) -> bool {
        self.source
            .as_ref()
            .map(|source| source.strong_count() > 0)
            .unwrap_or(false)
    }

    fn detach(&mut self) {
        if let Some(source) = self.source.take().and_then(|weak| weak.upgrade()) {
            source.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
