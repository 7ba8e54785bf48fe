//! # observable-config-codecs
//!
//! File formats for `observable-config-core`:
//! - [`JsonCodec`] for `.json`
//! - [`YamlCodec`] for `.yaml`
//!
//! Both decode leniently: unknown keys are kept in the document and
//! ignored when the document is turned into a config node.

pub mod json;
pub mod yaml;

pub use json::JsonCodec;
pub use yaml::YamlCodec;

use observable_config_core::CodecRegistry;

/// A registry with every codec of this crate registered.
pub fn default_registry() -> CodecRegistry {
    CodecRegistry::new().with(YamlCodec).with(JsonCodec::default())
}
