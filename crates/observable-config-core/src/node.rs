//! Config nodes and scalar properties.
//!
//! A config type is a plain struct holding a [`NodeCore`] plus one slot per
//! declared field ([`Property`], [`EntityField`](crate::entity::EntityField),
//! [`EntityCollection`](crate::collection::EntityCollection) or
//! [`ValueCollection`](crate::collection::ValueCollection)). Slots use
//! interior mutability so setters take `&self`; this lets a node be shared
//! through `Rc` by its parent and by the persistence layer at once.
//!
//! Events flow strictly child to parent. A handler attached to a node's
//! change stream must not synchronously mutate the node that emitted the
//! event.

use crate::error::{ConfigError, Result};
use crate::event::{ChangeEvent, EventSource, PropertyChanged, Subscription};
use crate::meta::{find_field, FieldMeta};
use crate::path::PathPattern;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Per-node notification state.
///
/// Skipped during (de)serialization; a deserialized node gets a fresh core.
#[derive(Debug, Default)]
pub struct NodeCore {
    changes: EventSource<ChangeEvent>,
    property_changed: EventSource<PropertyChanged>,
    initialized: Rc<Cell<bool>>,
}

impl NodeCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.set(true);
    }

    /// The node's change stream.
    pub fn changes(&self) -> &EventSource<ChangeEvent> {
        &self.changes
    }

    /// Handle for re-emitting child events on this node from inside a
    /// handler attached to the child.
    pub fn forwarder(&self) -> Forwarder {
        Forwarder {
            changes: self.changes.clone(),
            initialized: self.initialized.clone(),
        }
    }

    /// Attach a change handler. Every handler sees every event, in
    /// subscription order; an error from one (such as a failed auto-save)
    /// is reported to the mutating caller after all have run.
    #[must_use = "dropping the subscription detaches the handler"]
    pub fn on_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) -> Result<()> + 'static,
    {
        self.changes.subscribe(handler)
    }

    /// Like [`on_change`](Self::on_change) but only for events whose full
    /// path matches `pattern`.
    #[must_use = "dropping the subscription detaches the handler"]
    pub fn on_path<F>(&self, pattern: PathPattern, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) -> Result<()> + 'static,
    {
        self.changes.subscribe(move |event| {
            if pattern.matches(&event.full_path) {
                handler(event)
            } else {
                Ok(())
            }
        })
    }

    #[must_use = "dropping the subscription detaches the handler"]
    pub fn on_property_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PropertyChanged) + 'static,
    {
        self.property_changed.subscribe(move |event| {
            handler(event);
            Ok(())
        })
    }

    /// Raise property-changed for `meta` and every property it notifies.
    pub fn notify_property_changed(&self, meta: &FieldMeta) {
        self.raise_property_changed(meta.name);
        for &name in meta.notifies {
            self.raise_property_changed(name);
        }
    }

    fn raise_property_changed(&self, property_name: &'static str) {
        // Property-changed handlers are infallible.
        let _ = self
            .property_changed
            .emit(&PropertyChanged { property_name });
    }

    /// Emit a change event if the node is initialized.
    pub fn emit_change(&self, event: ChangeEvent) -> Result<()> {
        if !self.is_initialized() {
            trace!(path = %event.full_path, "node not initialized, change event suppressed");
            return Ok(());
        }
        self.changes.emit(&event)
    }
}

/// Emits on a node's change stream without borrowing the node.
///
/// Subject to the same initialized gate as the node itself.
#[derive(Debug, Clone)]
pub struct Forwarder {
    changes: EventSource<ChangeEvent>,
    initialized: Rc<Cell<bool>>,
}

impl Forwarder {
    pub fn emit(&self, event: ChangeEvent) -> Result<()> {
        if !self.initialized.get() {
            trace!(path = %event.full_path, "owner not initialized, forwarded event suppressed");
            return Ok(());
        }
        self.changes.emit(&event)
    }
}

/// Capability shared by every config object, root or nested.
///
/// Implementors are plain structs whose `Default` impl default-constructs
/// every field and then calls [`finish_nested`] or [`finish_root`].
/// Missing keys are filled per field (`#[serde(default)]` on the field, not
/// the container), so decoding never builds a throwaway default node.
pub trait ConfigNode: Serialize + DeserializeOwned + Default + 'static {
    /// Declared field table, in serialization order. Each entry's
    /// `serialized_name` must match the field's serde key.
    const FIELDS: &'static [FieldMeta];

    /// Metadata of the field named `name`.
    fn field(name: &str) -> Option<&'static FieldMeta> {
        find_field(Self::FIELDS, name)
    }

    fn core(&self) -> &NodeCore;

    /// Attach forwarding from every entity and entity-collection field to
    /// this node's change stream. Must be idempotent.
    fn bind_children(&self) {}

    /// Hook run once the node is initialized.
    fn after_init(&self) {}

    fn is_initialized(&self) -> bool {
        self.core().is_initialized()
    }
}

/// Complete a freshly built nested node: wire children, mark it
/// initialized and run its hook. Nested nodes are initialized from birth.
pub fn finish_nested<T: ConfigNode>(node: T) -> T {
    node.bind_children();
    node.core().mark_initialized();
    node.after_init();
    node
}

/// Complete a freshly built root node. Roots stay uninitialized until the
/// persistence layer calls `Init`, so defaults never trigger a save.
pub fn finish_root<T: ConfigNode>(node: T) -> T {
    node.bind_children();
    node
}

/// Convert a slot value into the document tree carried by change events.
pub(crate) fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Convert a value about to be stored in a `meta` slot, refusing values
/// that would not read back from the document tree. serde_json writes
/// non-finite floats as `null`, which no float field accepts on load.
pub(crate) fn storable_value<T>(meta: &FieldMeta, value: &T) -> Result<Value>
where
    T: Serialize + DeserializeOwned,
{
    let document = to_value(value)?;
    serde_json::from_value::<T>(document.clone()).map_err(|e| ConfigError::Unrepresentable {
        field: meta.name,
        reason: e.to_string(),
    })?;
    Ok(document)
}

/// Equality of slot values. Values unequal to themselves (NaN) compare
/// equal to each other, so re-assigning one is a no-op.
#[allow(clippy::eq_op)]
pub(crate) fn same_value<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b || (a != a && b != b)
}

/// A scalar field slot.
pub struct Property<T> {
    value: RefCell<T>,
}

impl<T> Property<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Store `value` and notify.
    ///
    /// Equal values are a no-op. A value that cannot be stored is rejected
    /// with the slot untouched. Otherwise property-changed fires, and a
    /// change event follows once `owner` is initialized. Returns whether
    /// the value changed; a failing save surfaces here.
    pub fn set(&self, owner: &NodeCore, meta: &FieldMeta, value: T) -> Result<bool> {
        if same_value(&*self.value.borrow(), &value) {
            return Ok(false);
        }
        let new_value = storable_value(meta, &value)?;
        let old = self.value.replace(value);

        owner.notify_property_changed(meta);
        if !owner.is_initialized() {
            return Ok(true);
        }

        let event = ChangeEvent::local(
            meta.name,
            to_value(&old)?,
            new_value,
            std::any::type_name::<T>(),
            meta.auto_save,
        );
        owner.emit_change(event)?;
        Ok(true)
    }
}

impl<T: Default + Clone + PartialEq + Serialize + DeserializeOwned + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.borrow().fmt(f)
    }
}

impl<T: Serialize> Serialize for Property<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.borrow().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Property<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(|value| Self {
            value: RefCell::new(value),
        })
    }
}
