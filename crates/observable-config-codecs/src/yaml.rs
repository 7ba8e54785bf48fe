//! YAML codec.

use observable_config_core::{Codec, CodecError};
use serde_json::Value;

/// `.yaml` files.
///
/// Documents go through `serde_json::Value`, so YAML tags, anchors and
/// non-string keys are not preserved.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn extension(&self) -> &str {
        ".yaml"
    }

    fn encode(&self, document: &Value) -> Result<Vec<u8>, CodecError> {
        serde_yaml::to_string(document)
            .map(String::into_bytes)
            .map_err(CodecError::encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_yaml::from_slice(bytes).map_err(CodecError::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_encode_block_style() {
        let document = json!({
            "DefaultEmojiSize": 32,
            "FavoriteEmojis": ["smile", "wave"],
            "Settings": {"NestedValue": "x"}
        });
        let text = String::from_utf8(YamlCodec.encode(&document).unwrap()).unwrap();

        assert!(text.contains("DefaultEmojiSize: 32"));
        assert!(text.contains("- smile"));
        assert!(text.contains("NestedValue: x"));
    }

    #[test]
    fn test_decode_document() {
        let text = "DefaultEmojiSize: 48\nAnimationSpeed: 1.5\nFavoriteEmojis:\n- heart\n";
        let document = YamlCodec.decode(text.as_bytes()).unwrap();

        assert_eq!(document["DefaultEmojiSize"], json!(48));
        assert_eq!(document["AnimationSpeed"], json!(1.5));
        assert_eq!(document["FavoriteEmojis"], json!(["heart"]));
    }

    #[test]
    fn test_decode_empty_is_null() {
        assert_eq!(YamlCodec.decode(b"").unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_invalid() {
        let err = YamlCodec.decode(b"a: [1, 2").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_round_trip_keeps_floats() {
        let document = json!({"AnimationSpeed": 1.0, "Name": "x"});
        let bytes = YamlCodec.encode(&document).unwrap();
        assert_eq!(YamlCodec.decode(&bytes).unwrap(), document);
    }
}
