//! File-format codecs and the extension registry.
//!
//! A codec converts between bytes and a `serde_json::Value` document
//! tree; typed conversion to and from config nodes happens here, so codec
//! implementations stay format-only and object-safe.

use crate::error::{CodecError, ConfigError, Result};
use crate::meta::layout_mismatches;
use crate::node::{finish_root, ConfigNode};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// A file format.
///
/// Decoding must tolerate keys it does not know about.
pub trait Codec {
    /// Extension including the leading dot, e.g. `.yaml`.
    fn extension(&self) -> &str;

    fn encode(&self, document: &Value) -> std::result::Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> std::result::Result<Value, CodecError>;
}

/// Serialize a node through `codec`.
///
/// Debug builds assert that the document carries every field of
/// `T::FIELDS` under its serialized name.
pub fn serialize_node<T: ConfigNode>(codec: &dyn Codec, node: &T) -> Result<Vec<u8>> {
    let document = serde_json::to_value(node)?;
    if cfg!(debug_assertions) {
        let mismatches = layout_mismatches(T::FIELDS, &document);
        debug_assert!(
            mismatches.is_empty(),
            "{} serializes out of step with its field table: {mismatches:?}",
            std::any::type_name::<T>()
        );
    }
    Ok(codec.encode(&document)?)
}

/// Deserialize a root node through `codec`.
///
/// Absent input, or a document that decodes to null (an empty file),
/// yields `Ok(None)`, not an error. The returned node has its children
/// bound but is not initialized.
pub fn deserialize_node<T: ConfigNode>(codec: &dyn Codec, bytes: Option<&[u8]>) -> Result<Option<T>> {
    let Some(bytes) = bytes else {
        return Ok(None);
    };
    let document = codec.decode(bytes)?;
    if document.is_null() {
        return Ok(None);
    }
    let missing: Vec<&str> = T::FIELDS
        .iter()
        .map(|field| field.serialized_name())
        .filter(|key| document.get(key).is_none())
        .collect();
    if !missing.is_empty() {
        debug!(?missing, "Document lacks declared fields, using defaults");
    }
    let node: T = serde_json::from_value(document)?;
    Ok(Some(finish_root(node)))
}

/// Maps file extensions to codecs.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: Vec<Rc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec. A codec already registered for the same
    /// extension is replaced.
    pub fn register<C: Codec + 'static>(&mut self, codec: C) {
        let codec: Rc<dyn Codec> = Rc::new(codec);
        if let Some(slot) = self
            .codecs
            .iter_mut()
            .find(|existing| existing.extension().eq_ignore_ascii_case(codec.extension()))
        {
            warn!(ext = codec.extension(), "Replacing registered codec");
            *slot = codec;
            return;
        }
        debug!(ext = codec.extension(), "Registered codec");
        self.codecs.push(codec);
    }

    pub fn with<C: Codec + 'static>(mut self, codec: C) -> Self {
        self.register(codec);
        self
    }

    /// Find the codec for `ext` (case-insensitive).
    pub fn resolve(&self, ext: &str) -> Result<Rc<dyn Codec>> {
        self.codecs
            .iter()
            .find(|codec| codec.extension().eq_ignore_ascii_case(ext))
            .cloned()
            .ok_or_else(|| ConfigError::UnsupportedExtension(ext.to_string()))
    }

    pub fn extensions(&self) -> Vec<String> {
        self.codecs
            .iter()
            .map(|codec| codec.extension().to_string())
            .collect()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}
