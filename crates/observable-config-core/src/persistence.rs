//! Loading, auto-saving and saving root configs.
//!
//! Each root config type owns one file at
//! `<root folder>/<dir_path>/<file_name><ext>`. The
//! [`PersistenceCoordinator`] resolves that location and the codec for the
//! extension, loads (or creates) the file, then subscribes to the root's
//! change stream and saves synchronously on every auto-save event.
//!
//! Lifecycle: `Unloaded -> Loaded -> Initialized`, passing through
//! `Saving` for the duration of each write.

use crate::codec::{deserialize_node, serialize_node, Codec, CodecRegistry};
use crate::error::{ConfigError, Result};
use crate::event::Subscription;
use crate::meta::RootDescriptor;
use crate::node::ConfigNode;
use crate::storage::{FileStorage, Storage};
use std::cell::Cell;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

/// A config node that owns a persisted file.
pub trait RootConfig: ConfigNode {
    const DESCRIPTOR: RootDescriptor;
}

/// Everything needed to locate and (de)serialize root configs.
///
/// Constructed once at startup and passed to [`load`](Self::load).
#[derive(Clone)]
pub struct PersistenceContext {
    root_folder: Option<PathBuf>,
    codecs: CodecRegistry,
    storage: Rc<dyn Storage>,
}

impl PersistenceContext {
    /// A context without root folder, with no codecs, on the filesystem.
    pub fn new() -> Self {
        Self {
            root_folder: None,
            codecs: CodecRegistry::new(),
            storage: Rc::new(FileStorage),
        }
    }

    pub fn with_root_folder(mut self, root_folder: impl Into<PathBuf>) -> Self {
        self.root_folder = Some(root_folder.into());
        self
    }

    pub fn with_codec<C: Codec + 'static>(mut self, codec: C) -> Self {
        self.codecs.register(codec);
        self
    }

    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn with_storage(mut self, storage: Rc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn root_folder(&self) -> Result<&Path> {
        self.root_folder
            .as_deref()
            .ok_or(ConfigError::RootFolderUnset)
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Resolve where a root config with `descriptor` lives.
    pub fn locate(&self, descriptor: &RootDescriptor) -> Result<ConfigLocation> {
        let dir = self.root_folder()?.join(descriptor.dir_path);
        let file_name = descriptor.file_name_with_ext();
        let path = dir.join(&file_name);
        Ok(ConfigLocation {
            dir,
            file_name,
            path,
        })
    }

    /// Load (or create) the file of `T` and return the initialized root.
    pub fn load<T: RootConfig>(&self) -> Result<Persisted<T>> {
        PersistenceCoordinator::load(self)
    }

    /// Like [`load`](Self::load) with a placement other than the type's
    /// own descriptor, e.g. another extension.
    pub fn load_with<T: RootConfig>(&self, descriptor: &RootDescriptor) -> Result<Persisted<T>> {
        PersistenceCoordinator::load_with(self, descriptor)
    }
}

impl Default for PersistenceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PersistenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceContext")
            .field("root_folder", &self.root_folder)
            .field("codecs", &self.codecs)
            .finish()
    }
}

/// Resolved file location of one root config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    dir: PathBuf,
    file_name: String,
    path: PathBuf,
}

impl ConfigLocation {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Loaded,
    Initialized,
    Saving,
}

/// Owns the file of one root config.
pub struct PersistenceCoordinator {
    location: ConfigLocation,
    codec: Rc<dyn Codec>,
    storage: Rc<dyn Storage>,
    state: Cell<LifecycleState>,
    saves: Cell<usize>,
}

impl PersistenceCoordinator {
    /// Resolve location and codec for `descriptor`.
    ///
    /// Fails fast when the root folder is unset or no codec handles the
    /// extension.
    pub fn new(context: &PersistenceContext, descriptor: &RootDescriptor) -> Result<Self> {
        let location = context.locate(descriptor)?;
        let codec = context.codecs.resolve(descriptor.ext)?;
        debug!(path = %location.path.display(), ext = descriptor.ext, "Resolved config location");
        Ok(Self {
            location,
            codec,
            storage: context.storage.clone(),
            state: Cell::new(LifecycleState::Unloaded),
            saves: Cell::new(0),
        })
    }

    /// `Load` followed by `Init`.
    pub fn load<T: RootConfig>(context: &PersistenceContext) -> Result<Persisted<T>> {
        Self::load_with(context, &T::DESCRIPTOR)
    }

    pub fn load_with<T: RootConfig>(
        context: &PersistenceContext,
        descriptor: &RootDescriptor,
    ) -> Result<Persisted<T>> {
        let coordinator = Rc::new(Self::new(context, descriptor)?);
        let node = coordinator.load_node::<T>()?;
        Ok(Persisted::init(node, coordinator))
    }

    /// Read the file, or construct defaults and write them when it is
    /// missing or unreadable.
    pub fn load_node<T: RootConfig>(&self) -> Result<T> {
        self.storage
            .ensure_dir(&self.location.dir)
            .map_err(|e| ConfigError::io(&self.location.dir, e))?;

        let node = match self.read_existing::<T>() {
            Some(node) => {
                debug!(path = %self.location.path.display(), "Loaded config");
                node
            }
            None => {
                info!(path = %self.location.path.display(), "Creating default config");
                let node = T::default();
                self.save(&node)?;
                node
            }
        };

        self.state.set(LifecycleState::Loaded);
        Ok(node)
    }

    fn read_existing<T: RootConfig>(&self) -> Option<T> {
        let path = &self.location.path;
        let bytes = match self.storage.read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return None;
            }
        };

        match deserialize_node::<T>(&*self.codec, bytes.as_deref()) {
            Ok(node) => node,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode config, using defaults");
                None
            }
        }
    }

    /// Serialize `node` and overwrite the file.
    pub fn save<T: ConfigNode>(&self, node: &T) -> Result<()> {
        let previous = self.state.replace(LifecycleState::Saving);
        let result = self.write(node);
        self.state.set(previous);

        if result.is_ok() {
            self.saves.set(self.saves.get() + 1);
        }
        result
    }

    fn write<T: ConfigNode>(&self, node: &T) -> Result<()> {
        let bytes = serialize_node(&*self.codec, node)?;
        self.storage
            .write(&self.location.path, &bytes)
            .map_err(|e| ConfigError::io(&self.location.path, e))?;
        debug!(path = %self.location.path.display(), bytes = bytes.len(), "Saved config");
        Ok(())
    }

    pub fn location(&self) -> &ConfigLocation {
        &self.location
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Number of successful saves, including the initial one.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl fmt::Debug for PersistenceCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceCoordinator")
            .field("location", &self.location)
            .field("ext", &self.codec.extension())
            .field("state", &self.state.get())
            .field("saves", &self.saves.get())
            .finish()
    }
}

/// An initialized root config bound to its file.
///
/// Dereferences to the root node. Auto-save stays attached for as long as
/// this handle lives.
pub struct Persisted<T: RootConfig> {
    node: Rc<T>,
    coordinator: Rc<PersistenceCoordinator>,
    _auto_save: Subscription,
}

impl<T: RootConfig> Persisted<T> {
    /// `Init`: mark the root initialized, attach auto-save, run the hook.
    fn init(node: T, coordinator: Rc<PersistenceCoordinator>) -> Self {
        let node = Rc::new(node);
        node.core().mark_initialized();

        let weak = Rc::downgrade(&node);
        let saver = coordinator.clone();
        let auto_save = node.core().on_change(move |event| {
            if !event.auto_save {
                trace!(path = %event.full_path, "Change excluded from auto-save");
                return Ok(());
            }
            match weak.upgrade() {
                Some(node) => saver.save(&*node),
                None => Ok(()),
            }
        });

        coordinator.state.set(LifecycleState::Initialized);
        node.after_init();

        Self {
            node,
            coordinator,
            _auto_save: auto_save,
        }
    }

    /// Save now, regardless of auto-save flags.
    pub fn save(&self) -> Result<()> {
        self.coordinator.save(&*self.node)
    }

    /// Shared handle to the root node.
    pub fn node(&self) -> Rc<T> {
        self.node.clone()
    }

    pub fn coordinator(&self) -> &PersistenceCoordinator {
        &self.coordinator
    }

    pub fn state(&self) -> LifecycleState {
        self.coordinator.state()
    }
}

impl<T: RootConfig> Deref for Persisted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: RootConfig + fmt::Debug> fmt::Debug for Persisted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persisted")
            .field("node", &self.node)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
