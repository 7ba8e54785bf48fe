//! Nested config node fields.

use crate::error::Result;
use crate::event::{ChangeEvent, Subscription};
use crate::meta::FieldMeta;
use crate::node::{finish_nested, to_value, ConfigNode, NodeCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// A field holding a nested config node.
///
/// The owner subscribes to the child's change stream and re-emits each
/// child event with the field name prefixed to its path. Replacing the
/// child drops the old subscription before the new one is attached.
pub struct EntityField<T> {
    node: RefCell<Rc<T>>,
    forward: RefCell<Option<Subscription>>,
}

impl<T: ConfigNode> EntityField<T> {
    pub fn new(node: T) -> Self {
        Self::from_rc(Rc::new(node))
    }

    pub fn from_rc(node: Rc<T>) -> Self {
        Self {
            node: RefCell::new(node),
            forward: RefCell::new(None),
        }
    }

    /// Shared handle to the current child.
    pub fn get(&self) -> Rc<T> {
        self.node.borrow().clone()
    }

    /// (Re)attach forwarding from the current child to `owner`.
    pub fn bind(&self, owner: &NodeCore, meta: &'static FieldMeta) {
        let subscription = forward(owner, meta, &**self.node.borrow());
        // The previous guard detaches when it is replaced.
        *self.forward.borrow_mut() = Some(subscription);
    }

    /// Replace the child.
    ///
    /// Identity, not content, decides equality: assigning the node already
    /// held is a no-op.
    pub fn set(&self, owner: &NodeCore, meta: &'static FieldMeta, node: Rc<T>) -> Result<bool> {
        if Rc::ptr_eq(&self.node.borrow(), &node) {
            return Ok(false);
        }

        self.forward.borrow_mut().take();
        let old = std::mem::replace(&mut *self.node.borrow_mut(), node);
        self.bind(owner, meta);

        owner.notify_property_changed(meta);
        if !owner.is_initialized() {
            return Ok(true);
        }

        let event = ChangeEvent::local(
            meta.name,
            to_value(&*old)?,
            to_value(&*self.get())?,
            std::any::type_name::<T>(),
            meta.auto_save,
        );
        owner.emit_change(event)?;
        Ok(true)
    }

    pub fn is_bound(&self) -> bool {
        self.forward
            .borrow()
            .as_ref()
            .map(Subscription::is_active)
            .unwrap_or(false)
    }
}

fn forward<T: ConfigNode>(owner: &NodeCore, meta: &'static FieldMeta, child: &T) -> Subscription {
    let parent = owner.forwarder();
    let name = meta.name;
    child.core().on_change(move |event| {
        let event = event.reparent(name, false);
        trace!(path = %event.full_path, "forwarding entity change");
        parent.emit(event)
    })
}

impl<T: ConfigNode> Default for EntityField<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for EntityField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.borrow().fmt(f)
    }
}

impl<T: Serialize> Serialize for EntityField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.node.borrow().serialize(serializer)
    }
}

impl<'de, T: ConfigNode> Deserialize<'de> for EntityField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let node = T::deserialize(deserializer)?;
        Ok(Self::new(finish_nested(node)))
    }
}
