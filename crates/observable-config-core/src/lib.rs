//! # observable-config-core
//!
//! Observable, hierarchically nested configuration objects.
//!
//! This crate provides:
//! - Change events with dotted full paths (`Settings.NestedValue`,
//!   `CustomSettings[Item].NestedNumber`)
//! - Field slots for scalars, nested entities and collections, each of
//!   which notifies its owner and forwards child events upward
//! - Collection membership tracking so every item is subscribed exactly
//!   while it is a member
//! - A codec registry keyed by file extension
//! - Load-or-create persistence with synchronous auto-save
//!
//! Everything is single-threaded (`Rc`/`RefCell`) and synchronous. Concrete
//! file formats live in `observable-config-codecs`.

pub mod codec;
pub mod collection;
pub mod entity;
pub mod error;
pub mod event;
pub mod meta;
pub mod node;
pub mod path;
pub mod persistence;
pub mod storage;

#[cfg(test)]
mod testing;

pub use codec::{deserialize_node, serialize_node, Codec, CodecRegistry};
pub use collection::{CollectionAction, CollectionChange, CollectionTracker, EntityCollection, ValueCollection};
pub use entity::EntityField;
pub use error::{CodecError, ConfigError, Result};
pub use event::{ChangeEvent, EventSource, PropertyChanged, Subscription};
pub use meta::{find_field, layout_mismatches, FieldKind, FieldMeta, RootDescriptor};
pub use node::{finish_nested, finish_root, ConfigNode, Forwarder, NodeCore, Property};
pub use path::{PathPattern, PatternError};
pub use persistence::{
    ConfigLocation, LifecycleState, PersistenceContext, PersistenceCoordinator, Persisted, RootConfig,
};
pub use storage::{FileStorage, MemoryStorage, Storage};
