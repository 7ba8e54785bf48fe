//! Small config types used by the unit tests of this crate.

use crate::collection::{EntityCollection, ValueCollection};
use crate::entity::EntityField;
use crate::error::Result;
use crate::event::{ChangeEvent, Subscription};
use crate::meta::{FieldMeta, RootDescriptor};
use crate::node::{finish_nested, finish_root, ConfigNode, NodeCore, Property};
use crate::persistence::RootConfig;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Collect every change event seen on `core`.
pub fn record(core: &NodeCore) -> (Rc<RefCell<Vec<ChangeEvent>>>, Subscription) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    let subscription = core.on_change(move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    (events, subscription)
}

pub const LEAF_FIELDS: &[FieldMeta] = &[
    FieldMeta::scalar("Label"),
    FieldMeta::scalar("Count").notifies(&["CountLabel"]),
    FieldMeta::scalar("Draft").manual_save(),
    FieldMeta::scalar("Ratio"),
];

#[derive(Debug, Serialize, Deserialize)]
pub struct Leaf {
    #[serde(skip)]
    core: NodeCore,
    #[serde(skip)]
    inits: Cell<usize>,
    #[serde(rename = "Label", default)]
    label: Property<String>,
    #[serde(rename = "Count", default)]
    count: Property<i32>,
    #[serde(rename = "Draft", default)]
    draft: Property<bool>,
    #[serde(rename = "Ratio", default)]
    ratio: Property<f64>,
}

impl Leaf {
    pub fn new() -> Self {
        finish_nested(Self {
            core: NodeCore::new(),
            inits: Cell::new(0),
            label: Property::default(),
            count: Property::default(),
            draft: Property::default(),
            ratio: Property::default(),
        })
    }

    /// How many times `after_init` ran on this node.
    pub fn init_count(&self) -> usize {
        self.inits.get()
    }

    pub fn label(&self) -> String {
        self.label.get()
    }

    pub fn set_label(&self, value: impl Into<String>) -> Result<bool> {
        self.label.set(&self.core, &LEAF_FIELDS[0], value.into())
    }

    pub fn count(&self) -> i32 {
        self.count.get()
    }

    pub fn set_count(&self, value: i32) -> Result<bool> {
        self.count.set(&self.core, &LEAF_FIELDS[1], value)
    }

    pub fn set_draft(&self, value: bool) -> Result<bool> {
        self.draft.set(&self.core, &LEAF_FIELDS[2], value)
    }

    pub fn ratio(&self) -> f64 {
        self.ratio.get()
    }

    pub fn set_ratio(&self, value: f64) -> Result<bool> {
        self.ratio.set(&self.core, &LEAF_FIELDS[3], value)
    }
}

impl Default for Leaf {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigNode for Leaf {
    const FIELDS: &'static [FieldMeta] = LEAF_FIELDS;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn after_init(&self) {
        self.inits.set(self.inits.get() + 1);
    }
}

pub const PARENT_FIELDS: &[FieldMeta] = &[
    FieldMeta::scalar("Size"),
    FieldMeta::entity("Settings"),
    FieldMeta::entity_collection("Items"),
    FieldMeta::value_collection("Tags"),
    FieldMeta::scalar("Scratch").alias("scratch_pad").manual_save(),
];

fn default_size() -> Property<i32> {
    Property::new(32)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Parent {
    #[serde(skip)]
    core: NodeCore,
    #[serde(rename = "Size", default = "default_size")]
    size: Property<i32>,
    #[serde(rename = "Settings", default)]
    settings: EntityField<Leaf>,
    #[serde(rename = "Items", default)]
    items: EntityCollection<Leaf>,
    #[serde(rename = "Tags", default)]
    tags: ValueCollection<String>,
    #[serde(rename = "scratch_pad", default)]
    scratch: Property<String>,
}

impl Parent {
    /// A parent initialized as if it were nested.
    pub fn new_initialized() -> Self {
        finish_nested(Self::default())
    }

    pub fn size(&self) -> i32 {
        self.size.get()
    }

    pub fn set_size(&self, value: i32) -> Result<bool> {
        self.size.set(&self.core, &PARENT_FIELDS[0], value)
    }

    pub fn settings(&self) -> Rc<Leaf> {
        self.settings.get()
    }

    pub fn set_settings(&self, value: Rc<Leaf>) -> Result<bool> {
        self.settings.set(&self.core, &PARENT_FIELDS[1], value)
    }

    pub fn items_field(&self) -> &EntityCollection<Leaf> {
        &self.items
    }

    pub fn push_item(&self, item: Rc<Leaf>) -> Result<()> {
        self.items.push(&self.core, &PARENT_FIELDS[2], item)
    }

    pub fn insert_item(&self, index: usize, item: Rc<Leaf>) -> Result<bool> {
        self.items.insert(&self.core, &PARENT_FIELDS[2], index, item)
    }

    pub fn remove_item(&self, index: usize) -> Result<Option<Rc<Leaf>>> {
        self.items.remove(&self.core, &PARENT_FIELDS[2], index)
    }

    pub fn remove_member(&self, item: &Rc<Leaf>) -> Result<bool> {
        self.items.remove_item(&self.core, &PARENT_FIELDS[2], item)
    }

    pub fn set_item(&self, index: usize, item: Rc<Leaf>) -> Result<bool> {
        self.items.set(&self.core, &PARENT_FIELDS[2], index, item)
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<bool> {
        self.items.move_item(&self.core, &PARENT_FIELDS[2], from, to)
    }

    pub fn clear_items(&self) -> Result<bool> {
        self.items.clear(&self.core, &PARENT_FIELDS[2])
    }

    pub fn replace_items(&self, items: Vec<Rc<Leaf>>) -> Result<bool> {
        self.items.replace_all(&self.core, &PARENT_FIELDS[2], items)
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.items()
    }

    pub fn push_tag(&self, tag: &str) -> Result<()> {
        self.tags.push(&self.core, &PARENT_FIELDS[3], tag.to_string())
    }

    pub fn insert_tag(&self, index: usize, tag: &str) -> Result<bool> {
        self.tags.insert(&self.core, &PARENT_FIELDS[3], index, tag.to_string())
    }

    pub fn remove_tag(&self, index: usize) -> Result<Option<String>> {
        self.tags.remove(&self.core, &PARENT_FIELDS[3], index)
    }

    pub fn clear_tags(&self) -> Result<bool> {
        self.tags.clear(&self.core, &PARENT_FIELDS[3])
    }

    pub fn replace_tags(&self, tags: &[&str]) -> Result<bool> {
        let tags = tags.iter().map(|tag| tag.to_string()).collect();
        self.tags.replace_all(&self.core, &PARENT_FIELDS[3], tags)
    }

    pub fn set_tag(&self, index: usize, tag: &str) -> Result<bool> {
        self.tags.set(&self.core, &PARENT_FIELDS[3], index, tag.to_string())
    }

    pub fn move_tag(&self, from: usize, to: usize) -> Result<bool> {
        self.tags.move_item(&self.core, &PARENT_FIELDS[3], from, to)
    }

    pub fn scratch(&self) -> String {
        self.scratch.get()
    }

    pub fn set_scratch(&self, value: &str) -> Result<bool> {
        self.scratch.set(&self.core, &PARENT_FIELDS[4], value.to_string())
    }
}

impl Default for Parent {
    fn default() -> Self {
        finish_root(Self {
            core: NodeCore::new(),
            size: default_size(),
            settings: EntityField::default(),
            items: EntityCollection::default(),
            tags: ValueCollection::default(),
            scratch: Property::default(),
        })
    }
}

impl ConfigNode for Parent {
    const FIELDS: &'static [FieldMeta] = PARENT_FIELDS;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn bind_children(&self) {
        self.settings.bind(&self.core, &PARENT_FIELDS[1]);
        self.items.bind(&self.core, &PARENT_FIELDS[2]);
    }
}

impl RootConfig for Parent {
    const DESCRIPTOR: RootDescriptor = RootDescriptor::new("parent").ext(".json");
}
