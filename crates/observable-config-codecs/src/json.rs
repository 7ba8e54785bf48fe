//! JSON codec.

use observable_config_core::{Codec, CodecError};
use serde_json::Value;

/// `.json` files, pretty-printed by default.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Single-line output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for JsonCodec {
    fn extension(&self) -> &str {
        ".json"
    }

    fn encode(&self, document: &Value) -> Result<Vec<u8>, CodecError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)
        } else {
            serde_json::to_vec(document)
        };
        bytes.map_err(CodecError::encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        // An empty file reads as an absent document.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(bytes).map_err(CodecError::decode)
    }
}
