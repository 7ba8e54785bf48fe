//! Observable collections and per-item forwarding.
//!
//! An [`EntityCollection`] keeps exactly one forwarding subscription per
//! member occurrence. Structural changes are reported to the
//! [`CollectionTracker`] as a [`CollectionChange`] delta; the tracker
//! detaches removed items and attaches added ones without rescanning the
//! whole list. Moves keep every subscription in place.
//!
//! Events from a member are re-emitted on the owner as
//! `<field>[Item].<child path>`. The marker carries no index.

use crate::error::Result;
use crate::event::{ChangeEvent, Subscription};
use crate::meta::FieldMeta;
use crate::node::{finish_nested, same_value, storable_value, to_value, ConfigNode, NodeCore};
use serde::de::DeserializeOwned;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Kind of structural change applied to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    Add,
    Remove,
    Replace,
    Move,
    Reset,
}

/// The delta of one structural change.
#[derive(Debug)]
pub struct CollectionChange<'a, T> {
    pub action: CollectionAction,
    pub old_items: &'a [T],
    pub new_items: &'a [T],
}

struct Binding<T> {
    item: Weak<T>,
    _subscription: Subscription,
}

/// Bookkeeping of the forwarding subscriptions of one entity collection.
pub struct CollectionTracker<T> {
    bindings: RefCell<Vec<Binding<T>>>,
}

impl<T: ConfigNode> CollectionTracker<T> {
    pub fn new() -> Self {
        Self {
            bindings: RefCell::new(Vec::new()),
        }
    }

    /// Number of live forwarding subscriptions.
    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn attach(&self, owner: &NodeCore, meta: &'static FieldMeta, item: &Rc<T>) {
        let parent = owner.forwarder();
        let name = meta.name;
        let subscription = item.core().on_change(move |event| {
            let event = event.reparent(name, true);
            trace!(path = %event.full_path, "forwarding collection item change");
            parent.emit(event)
        });
        self.bindings.borrow_mut().push(Binding {
            item: Rc::downgrade(item),
            _subscription: subscription,
        });
    }

    /// Detach one subscription of `item`. Returns false if none was found.
    pub fn detach(&self, item: &Rc<T>) -> bool {
        let removed = {
            let mut bindings = self.bindings.borrow_mut();
            let position = bindings
                .iter()
                .position(|binding| std::ptr::eq(binding.item.as_ptr(), Rc::as_ptr(item)));
            position.map(|index| bindings.remove(index))
        };
        removed.is_some()
    }

    /// Apply the attach/detach rule to a delta.
    pub fn apply(&self, owner: &NodeCore, meta: &'static FieldMeta, change: &CollectionChange<'_, Rc<T>>) {
        if change.action == CollectionAction::Move {
            return;
        }
        for item in change.old_items {
            self.detach(item);
        }
        if change.action != CollectionAction::Remove {
            for item in change.new_items {
                self.attach(owner, meta, item);
            }
        }
    }

    /// Drop every subscription and attach one per item of `items`.
    pub fn rebind(&self, owner: &NodeCore, meta: &'static FieldMeta, items: &[Rc<T>]) {
        let stale = std::mem::take(&mut *self.bindings.borrow_mut());
        drop(stale);
        for item in items {
            self.attach(owner, meta, item);
        }
    }
}

impl<T: ConfigNode> Default for CollectionTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// True if `a` and `b` hold the same nodes, possibly in another order.
fn same_members<T>(a: &[Rc<T>], b: &[Rc<T>]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&Rc<T>> = b.iter().collect();
    a.iter().all(|item| {
        match unmatched.iter().position(|other| Rc::ptr_eq(item, other)) {
            Some(index) => {
                unmatched.swap_remove(index);
                true
            }
            None => false,
        }
    })
}

fn nodes_value<T: Serialize>(items: &[Rc<T>]) -> Result<Value> {
    items
        .iter()
        .map(|item| to_value(&**item))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Old/new payload of an in-place change: absent sides are `Null`.
fn delta_value<T: Serialize>(items: &[Rc<T>]) -> Result<Value> {
    if items.is_empty() {
        Ok(Value::Null)
    } else {
        nodes_value(items)
    }
}

fn emit_collection_change(
    owner: &NodeCore,
    meta: &FieldMeta,
    value_type: &'static str,
    old_value: Value,
    new_value: Value,
) -> Result<()> {
    owner.notify_property_changed(meta);
    owner.emit_change(ChangeEvent::local(
        meta.name,
        old_value,
        new_value,
        value_type,
        meta.auto_save,
    ))
}

/// An ordered list of nested config nodes.
pub struct EntityCollection<T> {
    items: RefCell<Vec<Rc<T>>>,
    tracker: CollectionTracker<T>,
}

impl<T: ConfigNode> EntityCollection<T> {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn from_items(items: Vec<Rc<T>>) -> Self {
        Self {
            items: RefCell::new(items),
            tracker: CollectionTracker::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rc<T>> {
        self.items.borrow().get(index).cloned()
    }

    /// Snapshot of the current members.
    pub fn items(&self) -> Vec<Rc<T>> {
        self.items.borrow().clone()
    }

    pub fn contains(&self, item: &Rc<T>) -> bool {
        self.items.borrow().iter().any(|other| Rc::ptr_eq(item, other))
    }

    pub fn tracker(&self) -> &CollectionTracker<T> {
        &self.tracker
    }

    /// (Re)attach forwarding for every member.
    pub fn bind(&self, owner: &NodeCore, meta: &'static FieldMeta) {
        let items = self.items();
        self.tracker.rebind(owner, meta, &items);
    }

    pub fn push(&self, owner: &NodeCore, meta: &'static FieldMeta, item: Rc<T>) -> Result<()> {
        self.items.borrow_mut().push(item.clone());
        self.commit(owner, meta, CollectionAction::Add, &[], &[item])
    }

    /// Insert at `index`. Returns false if `index > len`.
    pub fn insert(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        index: usize,
        item: Rc<T>,
    ) -> Result<bool> {
        {
            let mut items = self.items.borrow_mut();
            if index > items.len() {
                return Ok(false);
            }
            items.insert(index, item.clone());
        }
        self.commit(owner, meta, CollectionAction::Add, &[], &[item])?;
        Ok(true)
    }

    pub fn remove(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        index: usize,
    ) -> Result<Option<Rc<T>>> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return Ok(None);
            }
            items.remove(index)
        };
        self.commit(owner, meta, CollectionAction::Remove, &[removed.clone()], &[])?;
        Ok(Some(removed))
    }

    /// Remove the first occurrence of `item`.
    pub fn remove_item(&self, owner: &NodeCore, meta: &'static FieldMeta, item: &Rc<T>) -> Result<bool> {
        let position = self
            .items
            .borrow()
            .iter()
            .position(|other| Rc::ptr_eq(item, other));
        match position {
            Some(index) => Ok(self.remove(owner, meta, index)?.is_some()),
            None => Ok(false),
        }
    }

    /// Replace the member at `index`. Assigning the node already there is
    /// a no-op.
    pub fn set(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        index: usize,
        item: Rc<T>,
    ) -> Result<bool> {
        let old = {
            let mut items = self.items.borrow_mut();
            match items.get_mut(index) {
                Some(slot) if !Rc::ptr_eq(slot, &item) => std::mem::replace(slot, item.clone()),
                _ => return Ok(false),
            }
        };
        self.commit(owner, meta, CollectionAction::Replace, &[old], &[item])?;
        Ok(true)
    }

    /// Move a member from one position to another. Subscriptions are left
    /// untouched.
    pub fn move_item(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        from: usize,
        to: usize,
    ) -> Result<bool> {
        let moved = {
            let mut items = self.items.borrow_mut();
            if from >= items.len() || to >= items.len() || from == to {
                return Ok(false);
            }
            let item = items.remove(from);
            items.insert(to, item.clone());
            item
        };
        let moved = [moved];
        self.commit(owner, meta, CollectionAction::Move, &moved, &moved)?;
        Ok(true)
    }

    /// Remove every member. All of them are detached.
    pub fn clear(&self, owner: &NodeCore, meta: &'static FieldMeta) -> Result<bool> {
        let removed = std::mem::take(&mut *self.items.borrow_mut());
        if removed.is_empty() {
            return Ok(false);
        }
        self.commit(owner, meta, CollectionAction::Reset, &removed, &[])?;
        Ok(true)
    }

    /// Replace the whole collection.
    ///
    /// An identical sequence is a no-op. A pure reorder keeps every
    /// subscription; otherwise all old members are detached and all new
    /// ones attached.
    pub fn replace_all(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        items: Vec<Rc<T>>,
    ) -> Result<bool> {
        let old = {
            let current = self.items.borrow();
            let identical = current.len() == items.len()
                && current.iter().zip(&items).all(|(a, b)| Rc::ptr_eq(a, b));
            if identical {
                return Ok(false);
            }
            current.clone()
        };

        if !same_members(&old, &items) {
            self.tracker.rebind(owner, meta, &items);
        }
        *self.items.borrow_mut() = items;

        let new_value = nodes_value(&self.items())?;
        emit_collection_change(
            owner,
            meta,
            std::any::type_name::<Vec<T>>(),
            nodes_value(&old)?,
            new_value,
        )?;
        Ok(true)
    }

    fn commit(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        action: CollectionAction,
        old_items: &[Rc<T>],
        new_items: &[Rc<T>],
    ) -> Result<()> {
        self.tracker.apply(
            owner,
            meta,
            &CollectionChange {
                action,
                old_items,
                new_items,
            },
        );
        emit_collection_change(
            owner,
            meta,
            std::any::type_name::<Vec<T>>(),
            delta_value(old_items)?,
            delta_value(new_items)?,
        )
    }
}

impl<T: ConfigNode> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for EntityCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.borrow().iter()).finish()
    }
}

impl<T: Serialize> Serialize for EntityCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let items = self.items.borrow();
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items.iter() {
            seq.serialize_element(&**item)?;
        }
        seq.end()
    }
}

impl<'de, T: ConfigNode> Deserialize<'de> for EntityCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?
            .into_iter()
            .map(|node| Rc::new(finish_nested(node)))
            .collect();
        Ok(Self::from_items(items))
    }
}

/// An ordered list of plain values. Changes are reported at collection
/// level only.
pub struct ValueCollection<T> {
    items: RefCell<Vec<T>>,
}

impl<T> ValueCollection<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.borrow().get(index).cloned()
    }

    pub fn items(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.borrow().contains(value)
    }

    pub fn push(&self, owner: &NodeCore, meta: &'static FieldMeta, value: T) -> Result<()> {
        storable_value(meta, &value)?;
        self.items.borrow_mut().push(value.clone());
        self.commit(owner, meta, &[], &[value])
    }

    pub fn insert(
        &self,
        owner: &NodeCore,
        meta: &'static FieldMeta,
        index: usize,
        value: T,
    ) -> Result<bool> {
        if index > self.len() {
            return Ok(false);
        }
        storable_value(meta, &value)?;
        self.items.borrow_mut().insert(index, value.clone());
        self.commit(owner, meta, &[], &[value])?;
        Ok(true)
    }

    pub fn remove(&self, owner: &NodeCore, meta: &'static FieldMeta, index: usize) -> Result<Option<T>> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return Ok(None);
            }
            items.remove(index)
        };
        self.commit(owner, meta, &[removed.clone()], &[])?;
        Ok(Some(removed))
    }

    pub fn set(&self, owner: &NodeCore, meta: &'static FieldMeta, index: usize, value: T) -> Result<bool> {
        match self.items.borrow().get(index) {
            Some(slot) if !same_value(slot, &value) => {}
            _ => return Ok(false),
        }
        storable_value(meta, &value)?;
        let old = std::mem::replace(&mut self.items.borrow_mut()[index], value.clone());
        self.commit(owner, meta, &[old], &[value])?;
        Ok(true)
    }

    pub fn move_item(&self, owner: &NodeCore, meta: &'static FieldMeta, from: usize, to: usize) -> Result<bool> {
        let moved = {
            let mut items = self.items.borrow_mut();
            if from >= items.len() || to >= items.len() || from == to {
                return Ok(false);
            }
            let value = items.remove(from);
            items.insert(to, value.clone());
            value
        };
        let moved = [moved];
        self.commit(owner, meta, &moved, &moved)?;
        Ok(true)
    }

    pub fn clear(&self, owner: &NodeCore, meta: &'static FieldMeta) -> Result<bool> {
        let removed = std::mem::take(&mut *self.items.borrow_mut());
        if removed.is_empty() {
            return Ok(false);
        }
        self.commit(owner, meta, &removed, &[])?;
        Ok(true)
    }

    pub fn replace_all(&self, owner: &NodeCore, meta: &'static FieldMeta, values: Vec<T>) -> Result<bool> {
        {
            let items = self.items.borrow();
            if items.len() == values.len() && items.iter().zip(&values).all(|(a, b)| same_value(a, b)) {
                return Ok(false);
            }
        }
        storable_value(meta, &values)?;
        let old = std::mem::replace(&mut *self.items.borrow_mut(), values);
        let new_value = to_value(&*self.items.borrow())?;
        emit_collection_change(
            owner,
            meta,
            std::any::type_name::<Vec<T>>(),
            to_value(&old)?,
            new_value,
        )?;
        Ok(true)
    }

    fn commit(&self, owner: &NodeCore, meta: &'static FieldMeta, old: &[T], new: &[T]) -> Result<()> {
        let side = |values: &[T]| -> Result<Value> {
            if values.is_empty() {
                Ok(Value::Null)
            } else {
                to_value(values)
            }
        };
        emit_collection_change(
            owner,
            meta,
            std::any::type_name::<Vec<T>>(),
            side(old)?,
            side(new)?,
        )
    }
}

impl<T: Clone + PartialEq + Serialize + DeserializeOwned + 'static> Default for ValueCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.borrow().iter()).finish()
    }
}

impl<T: Serialize> Serialize for ValueCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.items.borrow().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ValueCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(|items| Self {
            items: RefCell::new(items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, Leaf, Parent};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parent_with_items(count: usize) -> (Parent, Vec<Rc<Leaf>>) {
        let parent = Parent::new_initialized();
        let items: Vec<Rc<Leaf>> = (0..count).map(|_| Rc::new(Leaf::new())).collect();
        for item in &items {
            parent.push_item(item.clone()).unwrap();
        }
        (parent, items)
    }

    fn total_subscriptions(items: &[Rc<Leaf>]) -> usize {
        items
            .iter()
            .map(|item| item.core().changes().subscriber_count())
            .sum()
    }

    #[test]
    fn test_item_change_uses_item_marker() {
        let (parent, items) = parent_with_items(1);
        let (events, _sub) = record(parent.core());

        items[0].set_count(4).unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].property_name, "Items");
        assert_eq!(events[0].full_path, "Items[Item].Count");
        assert_eq!(events[0].new_value, json!(4));
    }

    #[test]
    fn test_add_emits_raw_items() {
        let parent = Parent::new_initialized();
        let (events, _sub) = record(parent.core());
        let item = Rc::new(Leaf::new());

        parent.push_item(item).unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].full_path, "Items");
        assert_eq!(events[0].property_name, "Items");
        assert_eq!(events[0].old_value, Value::Null);
        assert_eq!(events[0].new_value, json!([{ "Label": "", "Count": 0, "Draft": false, "Ratio": 0.0 }]));
    }

    #[test]
    fn test_removed_item_is_detached() {
        let (parent, items) = parent_with_items(2);
        let (events, _sub) = record(parent.core());

        let removed = parent.remove_item(0).unwrap().unwrap();
        assert!(Rc::ptr_eq(&removed, &items[0]));
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].new_value, Value::Null);

        removed.set_count(9).unwrap();
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(removed.core().changes().subscriber_count(), 0);

        items[1].set_count(9).unwrap();
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_move_keeps_subscriptions() {
        let (parent, items) = parent_with_items(3);
        let before = total_subscriptions(&items);
        let bindings_before = parent.items_field().tracker().binding_count();
        let (events, _sub) = record(parent.core());

        assert!(parent.move_item(0, 2).unwrap());

        assert_eq!(total_subscriptions(&items), before);
        assert_eq!(parent.items_field().tracker().binding_count(), bindings_before);
        assert!(Rc::ptr_eq(&parent.items_field().get(2).unwrap(), &items[0]));
        assert_eq!(events.borrow().len(), 1);

        items[0].set_label("moved").unwrap();
        assert_eq!(events.borrow().len(), 2);
        assert_eq!(events.borrow()[1].full_path, "Items[Item].Label");
    }

    #[test]
    fn test_replace_at_index_swaps_subscription() {
        let (parent, items) = parent_with_items(1);
        let replacement = Rc::new(Leaf::new());

        assert!(parent.set_item(0, replacement.clone()).unwrap());
        assert_eq!(items[0].core().changes().subscriber_count(), 0);
        assert_eq!(replacement.core().changes().subscriber_count(), 1);

        assert!(!parent.set_item(0, replacement.clone()).unwrap());
        assert_eq!(replacement.core().changes().subscriber_count(), 1);
    }

    #[test]
    fn test_clear_detaches_everything() {
        let (parent, items) = parent_with_items(3);

        assert!(parent.clear_items().unwrap());

        assert_eq!(total_subscriptions(&items), 0);
        assert_eq!(parent.items_field().tracker().binding_count(), 0);
        assert!(!parent.clear_items().unwrap());
    }

    #[test]
    fn test_replace_all_rebinds() {
        let (parent, old) = parent_with_items(2);
        let fresh: Vec<Rc<Leaf>> = vec![Rc::new(Leaf::new()), old[1].clone()];
        let (events, _sub) = record(parent.core());

        assert!(parent.replace_items(fresh.clone()).unwrap());

        assert_eq!(old[0].core().changes().subscriber_count(), 0);
        assert_eq!(old[1].core().changes().subscriber_count(), 1);
        assert_eq!(fresh[0].core().changes().subscriber_count(), 1);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].full_path, "Items");
        assert!(events.borrow()[0].old_value.is_array());
    }

    #[test]
    fn test_replace_all_reorder_keeps_subscriptions() {
        let (parent, items) = parent_with_items(3);
        let reordered = vec![items[2].clone(), items[0].clone(), items[1].clone()];
        let before = total_subscriptions(&items);

        assert!(parent.replace_items(reordered.clone()).unwrap());
        assert_eq!(total_subscriptions(&items), before);

        assert!(!parent.replace_items(reordered).unwrap());
    }

    #[test]
    fn test_duplicate_member_is_forwarded_per_occurrence() {
        let parent = Parent::new_initialized();
        let item = Rc::new(Leaf::new());
        parent.push_item(item.clone()).unwrap();
        parent.push_item(item.clone()).unwrap();
        assert_eq!(item.core().changes().subscriber_count(), 2);

        parent.remove_item(0).unwrap();
        assert_eq!(item.core().changes().subscriber_count(), 1);
    }

    #[test]
    fn test_out_of_range_indices_are_rejected() {
        let (parent, _items) = parent_with_items(1);
        assert!(parent.remove_item(3).unwrap().is_none());
        assert!(!parent.move_item(0, 5).unwrap());
        assert!(!parent.set_item(2, Rc::new(Leaf::new())).unwrap());
    }

    #[test]
    fn test_insert_attaches_at_position() {
        let (parent, items) = parent_with_items(2);
        let (events, _sub) = record(parent.core());
        let inserted = Rc::new(Leaf::new());

        assert!(parent.insert_item(1, inserted.clone()).unwrap());
        assert!(Rc::ptr_eq(&parent.items_field().get(1).unwrap(), &inserted));
        assert!(Rc::ptr_eq(&parent.items_field().get(2).unwrap(), &items[1]));
        assert_eq!(inserted.core().changes().subscriber_count(), 1);
        assert_eq!(parent.items_field().tracker().binding_count(), 3);

        assert!(parent.insert_item(3, Rc::new(Leaf::new())).unwrap());
        assert!(!parent.insert_item(9, Rc::new(Leaf::new())).unwrap());
        assert_eq!(parent.items_field().len(), 4);

        inserted.set_label("mid").unwrap();
        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].old_value, Value::Null);
        assert_eq!(events[0].new_value[0]["Label"], json!(""));
        assert_eq!(events[2].full_path, "Items[Item].Label");
    }

    #[test]
    fn test_remove_member_by_identity() {
        let (parent, items) = parent_with_items(2);
        let (events, _sub) = record(parent.core());

        assert!(parent.remove_member(&items[1]).unwrap());
        assert_eq!(items[1].core().changes().subscriber_count(), 0);
        assert_eq!(parent.items_field().len(), 1);
        assert!(!parent.remove_member(&items[1]).unwrap());
        assert!(!parent.remove_member(&Rc::new(Leaf::new())).unwrap());

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert!(events[0].old_value.is_array());
        assert_eq!(events[0].new_value, Value::Null);
    }

    #[test]
    fn test_value_collection_insert_and_remove() {
        let parent = Parent::new_initialized();
        parent.push_tag("wave").unwrap();
        let (events, _sub) = record(parent.core());

        assert!(parent.insert_tag(0, "smile").unwrap());
        assert!(!parent.insert_tag(5, "late").unwrap());
        assert_eq!(parent.remove_tag(1).unwrap(), Some("wave".to_string()));
        assert_eq!(parent.remove_tag(1).unwrap(), None);

        assert_eq!(parent.tags(), vec!["smile".to_string()]);
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].old_value, Value::Null);
        assert_eq!(events[0].new_value, json!(["smile"]));
        assert_eq!(events[1].old_value, json!(["wave"]));
        assert_eq!(events[1].new_value, Value::Null);
    }

    #[test]
    fn test_value_collection_clear_and_replace_all() {
        let parent = Parent::new_initialized();
        let (events, _sub) = record(parent.core());

        assert!(!parent.clear_tags().unwrap());
        assert!(parent.replace_tags(&["a", "b"]).unwrap());
        assert!(!parent.replace_tags(&["a", "b"]).unwrap());
        assert!(parent.clear_tags().unwrap());

        assert!(parent.tags().is_empty());
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].old_value, json!([]));
        assert_eq!(events[0].new_value, json!(["a", "b"]));
        assert_eq!(events[1].old_value, json!(["a", "b"]));
        assert_eq!(events[1].new_value, Value::Null);
    }

    #[test]
    fn test_value_collection_out_of_range() {
        let parent = Parent::new_initialized();
        parent.push_tag("only").unwrap();
        let (events, _sub) = record(parent.core());

        assert!(!parent.set_tag(1, "x").unwrap());
        assert!(!parent.move_tag(0, 1).unwrap());
        assert!(parent.remove_tag(4).unwrap().is_none());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_value_collection_rejects_unstorable_values() {
        let core = NodeCore::new();
        core.mark_initialized();
        let meta = &crate::testing::PARENT_FIELDS[3];
        let ratios = ValueCollection::from_items(vec![f64::NAN, 1.0]);
        let (events, _sub) = record(&core);

        assert!(ratios.push(&core, meta, f64::INFINITY).is_err());
        assert!(ratios.insert(&core, meta, 0, f64::NAN).is_err());
        assert!(ratios.replace_all(&core, meta, vec![2.0, f64::NAN]).is_err());
        assert!(!ratios.set(&core, meta, 0, f64::NAN).unwrap());
        assert!(!ratios.replace_all(&core, meta, vec![f64::NAN, 1.0]).unwrap());

        assert_eq!(ratios.len(), 2);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_value_collection_events() {
        let parent = Parent::new_initialized();
        let (events, _sub) = record(parent.core());

        parent.push_tag("smile").unwrap();
        parent.push_tag("wave").unwrap();
        assert!(!parent.set_tag(0, "smile").unwrap());
        assert!(parent.move_tag(0, 1).unwrap());

        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].full_path, "Tags");
        assert_eq!(events[0].old_value, Value::Null);
        assert_eq!(events[0].new_value, json!(["smile"]));
        assert_eq!(events[2].old_value, json!(["smile"]));
        assert_eq!(parent.tags(), vec!["wave".to_string(), "smile".to_string()]);
    }

    #[test]
    fn test_deserialized_items_are_bound_by_owner() {
        let parent: Parent = serde_json::from_value(json!({
            "Items": [{ "Label": "a" }, { "Label": "b" }],
            "Tags": ["x"]
        }))
        .unwrap();
        parent.bind_children();

        let items = parent.items_field().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].label(), "b");
        assert!(items.iter().all(|item| item.is_initialized()));
        assert!(items.iter().all(|item| item.init_count() == 1));
        assert_eq!(parent.items_field().tracker().binding_count(), 2);
    }
}
