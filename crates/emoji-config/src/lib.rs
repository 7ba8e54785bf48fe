//! # emoji-config
//!
//! Settings of an emoji picker, persisted as `config/emoji_config.yaml`
//! under the application's root folder.
//!
//! ```text
//! EmojiConfig
//! ├── DefaultEmojiSize, EnableAutoComplete, MaxEmojiHistory,
//! │   DefaultSkinTone, AnimationSpeed
//! ├── Settings: NestedSettings
//! ├── FavoriteEmojis: [String]
//! └── CustomSettings: [NestedSettings]
//! ```

use observable_config_core::{
    finish_nested, finish_root, ConfigNode, EntityCollection, EntityField, FieldMeta, NodeCore,
    Property, Result, RootConfig, RootDescriptor, ValueCollection,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::debug;

pub const NESTED_SETTINGS_FIELDS: &[FieldMeta] = &[
    FieldMeta::scalar("NestedValue").description("Nested value"),
    FieldMeta::scalar("NestedNumber").description("Nested number"),
    FieldMeta::scalar("NestedBoolean").description("Nested flag"),
];

const NESTED_VALUE: &FieldMeta = &NESTED_SETTINGS_FIELDS[0];
const NESTED_NUMBER: &FieldMeta = &NESTED_SETTINGS_FIELDS[1];
const NESTED_BOOLEAN: &FieldMeta = &NESTED_SETTINGS_FIELDS[2];

/// A small group of settings, used both as a single nested entity and as
/// the item type of a collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct NestedSettings {
    #[serde(skip)]
    core: NodeCore,
    #[serde(rename = "NestedValue", default)]
    nested_value: Property<String>,
    #[serde(rename = "NestedNumber", default)]
    nested_number: Property<i32>,
    #[serde(rename = "NestedBoolean", default)]
    nested_boolean: Property<bool>,
}

impl NestedSettings {
    pub fn new() -> Self {
        finish_nested(Self {
            core: NodeCore::new(),
            nested_value: Property::default(),
            nested_number: Property::default(),
            nested_boolean: Property::default(),
        })
    }

    /// Shorthand for a shared node with the given values.
    pub fn shared(value: &str, number: i32) -> Rc<Self> {
        let settings = Self::new();
        // A fresh node has no subscribers, so these setters cannot fail.
        let _ = settings.set_nested_value(value);
        let _ = settings.set_nested_number(number);
        Rc::new(settings)
    }

    pub fn nested_value(&self) -> String {
        self.nested_value.get()
    }

    pub fn set_nested_value(&self, value: impl Into<String>) -> Result<bool> {
        self.nested_value.set(&self.core, NESTED_VALUE, value.into())
    }

    pub fn nested_number(&self) -> i32 {
        self.nested_number.get()
    }

    pub fn set_nested_number(&self, value: i32) -> Result<bool> {
        self.nested_number.set(&self.core, NESTED_NUMBER, value)
    }

    pub fn nested_boolean(&self) -> bool {
        self.nested_boolean.get()
    }

    pub fn set_nested_boolean(&self, value: bool) -> Result<bool> {
        self.nested_boolean.set(&self.core, NESTED_BOOLEAN, value)
    }
}

impl Default for NestedSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigNode for NestedSettings {
    const FIELDS: &'static [FieldMeta] = NESTED_SETTINGS_FIELDS;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn after_init(&self) {
        debug!(
            value = %self.nested_value.borrow(),
            number = self.nested_number.get(),
            "NestedSettings initialized"
        );
    }
}

pub const EMOJI_CONFIG_FIELDS: &[FieldMeta] = &[
    FieldMeta::scalar("DefaultEmojiSize").description("Default emoji size"),
    FieldMeta::scalar("EnableAutoComplete").description("Enable auto-complete"),
    FieldMeta::scalar("MaxEmojiHistory").description("Maximum number of recent emojis"),
    FieldMeta::scalar("DefaultSkinTone").description("Default skin tone"),
    FieldMeta::scalar("AnimationSpeed")
        .description("Animation speed")
        .notifies(&["AnimationDurationMs"]),
    FieldMeta::entity("Settings").description("Emoji settings"),
    FieldMeta::value_collection("FavoriteEmojis").description("Favorite emojis"),
    FieldMeta::entity_collection("CustomSettings").description("Custom settings"),
];

const DEFAULT_EMOJI_SIZE: &FieldMeta = &EMOJI_CONFIG_FIELDS[0];
const ENABLE_AUTO_COMPLETE: &FieldMeta = &EMOJI_CONFIG_FIELDS[1];
const MAX_EMOJI_HISTORY: &FieldMeta = &EMOJI_CONFIG_FIELDS[2];
const DEFAULT_SKIN_TONE: &FieldMeta = &EMOJI_CONFIG_FIELDS[3];
const ANIMATION_SPEED: &FieldMeta = &EMOJI_CONFIG_FIELDS[4];
const SETTINGS: &FieldMeta = &EMOJI_CONFIG_FIELDS[5];
const FAVORITE_EMOJIS: &FieldMeta = &EMOJI_CONFIG_FIELDS[6];
const CUSTOM_SETTINGS: &FieldMeta = &EMOJI_CONFIG_FIELDS[7];

/// Base duration of the picker animation at speed 1.0.
const BASE_ANIMATION_MS: f64 = 200.0;

fn default_emoji_size() -> Property<i32> {
    Property::new(32)
}

fn default_enable_auto_complete() -> Property<bool> {
    Property::new(true)
}

fn default_max_emoji_history() -> Property<i32> {
    Property::new(50)
}

fn default_skin_tone() -> Property<String> {
    Property::new("default".to_string())
}

fn default_animation_speed() -> Property<f64> {
    Property::new(1.0)
}

/// Root settings of the emoji picker.
///
/// Keys missing from the file take the per-field defaults below.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmojiConfig {
    #[serde(skip)]
    core: NodeCore,
    #[serde(rename = "DefaultEmojiSize", default = "default_emoji_size")]
    default_emoji_size: Property<i32>,
    #[serde(rename = "EnableAutoComplete", default = "default_enable_auto_complete")]
    enable_auto_complete: Property<bool>,
    #[serde(rename = "MaxEmojiHistory", default = "default_max_emoji_history")]
    max_emoji_history: Property<i32>,
    #[serde(rename = "DefaultSkinTone", default = "default_skin_tone")]
    default_skin_tone: Property<String>,
    #[serde(rename = "AnimationSpeed", default = "default_animation_speed")]
    animation_speed: Property<f64>,
    #[serde(rename = "Settings", default)]
    settings: EntityField<NestedSettings>,
    #[serde(rename = "FavoriteEmojis", default)]
    favorite_emojis: ValueCollection<String>,
    #[serde(rename = "CustomSettings", default)]
    custom_settings: EntityCollection<NestedSettings>,
}

impl EmojiConfig {
    pub fn default_emoji_size(&self) -> i32 {
        self.default_emoji_size.get()
    }

    pub fn set_default_emoji_size(&self, value: i32) -> Result<bool> {
        self.default_emoji_size.set(&self.core, DEFAULT_EMOJI_SIZE, value)
    }

    pub fn enable_auto_complete(&self) -> bool {
        self.enable_auto_complete.get()
    }

    pub fn set_enable_auto_complete(&self, value: bool) -> Result<bool> {
        self.enable_auto_complete.set(&self.core, ENABLE_AUTO_COMPLETE, value)
    }

    pub fn max_emoji_history(&self) -> i32 {
        self.max_emoji_history.get()
    }

    pub fn set_max_emoji_history(&self, value: i32) -> Result<bool> {
        self.max_emoji_history.set(&self.core, MAX_EMOJI_HISTORY, value)
    }

    pub fn default_skin_tone(&self) -> String {
        self.default_skin_tone.get()
    }

    pub fn set_default_skin_tone(&self, value: impl Into<String>) -> Result<bool> {
        self.default_skin_tone.set(&self.core, DEFAULT_SKIN_TONE, value.into())
    }

    pub fn animation_speed(&self) -> f64 {
        self.animation_speed.get()
    }

    pub fn set_animation_speed(&self, value: f64) -> Result<bool> {
        self.animation_speed.set(&self.core, ANIMATION_SPEED, value)
    }

    /// Derived from `AnimationSpeed`; notified whenever the speed changes.
    pub fn animation_duration_ms(&self) -> u64 {
        let speed = self.animation_speed.get();
        if speed <= 0.0 {
            return 0;
        }
        (BASE_ANIMATION_MS / speed).round() as u64
    }

    pub fn settings(&self) -> Rc<NestedSettings> {
        self.settings.get()
    }

    pub fn set_settings(&self, value: Rc<NestedSettings>) -> Result<bool> {
        self.settings.set(&self.core, SETTINGS, value)
    }

    pub fn favorite_emojis(&self) -> &ValueCollection<String> {
        &self.favorite_emojis
    }

    pub fn add_favorite_emoji(&self, emoji: impl Into<String>) -> Result<()> {
        self.favorite_emojis.push(&self.core, FAVORITE_EMOJIS, emoji.into())
    }

    pub fn remove_favorite_emoji(&self, index: usize) -> Result<Option<String>> {
        self.favorite_emojis.remove(&self.core, FAVORITE_EMOJIS, index)
    }

    pub fn move_favorite_emoji(&self, from: usize, to: usize) -> Result<bool> {
        self.favorite_emojis.move_item(&self.core, FAVORITE_EMOJIS, from, to)
    }

    pub fn clear_favorite_emojis(&self) -> Result<bool> {
        self.favorite_emojis.clear(&self.core, FAVORITE_EMOJIS)
    }

    pub fn set_favorite_emojis(&self, emojis: Vec<String>) -> Result<bool> {
        self.favorite_emojis.replace_all(&self.core, FAVORITE_EMOJIS, emojis)
    }

    pub fn custom_settings(&self) -> &EntityCollection<NestedSettings> {
        &self.custom_settings
    }

    pub fn add_custom_setting(&self, item: Rc<NestedSettings>) -> Result<()> {
        self.custom_settings.push(&self.core, CUSTOM_SETTINGS, item)
    }

    pub fn insert_custom_setting(&self, index: usize, item: Rc<NestedSettings>) -> Result<bool> {
        self.custom_settings.insert(&self.core, CUSTOM_SETTINGS, index, item)
    }

    pub fn remove_custom_setting(&self, index: usize) -> Result<Option<Rc<NestedSettings>>> {
        self.custom_settings.remove(&self.core, CUSTOM_SETTINGS, index)
    }

    pub fn replace_custom_setting(&self, index: usize, item: Rc<NestedSettings>) -> Result<bool> {
        self.custom_settings.set(&self.core, CUSTOM_SETTINGS, index, item)
    }

    pub fn move_custom_setting(&self, from: usize, to: usize) -> Result<bool> {
        self.custom_settings.move_item(&self.core, CUSTOM_SETTINGS, from, to)
    }

    pub fn clear_custom_settings(&self) -> Result<bool> {
        self.custom_settings.clear(&self.core, CUSTOM_SETTINGS)
    }

    pub fn set_custom_settings(&self, items: Vec<Rc<NestedSettings>>) -> Result<bool> {
        self.custom_settings.replace_all(&self.core, CUSTOM_SETTINGS, items)
    }
}

impl Default for EmojiConfig {
    fn default() -> Self {
        finish_root(Self {
            core: NodeCore::new(),
            default_emoji_size: default_emoji_size(),
            enable_auto_complete: default_enable_auto_complete(),
            max_emoji_history: default_max_emoji_history(),
            default_skin_tone: default_skin_tone(),
            animation_speed: default_animation_speed(),
            settings: EntityField::default(),
            favorite_emojis: ValueCollection::default(),
            custom_settings: EntityCollection::default(),
        })
    }
}

impl ConfigNode for EmojiConfig {
    const FIELDS: &'static [FieldMeta] = EMOJI_CONFIG_FIELDS;

    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn bind_children(&self) {
        self.settings.bind(&self.core, SETTINGS);
        self.custom_settings.bind(&self.core, CUSTOM_SETTINGS);
    }

    fn after_init(&self) {
        debug!(
            size = self.default_emoji_size.get(),
            favorites = self.favorite_emojis.len(),
            custom = self.custom_settings.len(),
            "EmojiConfig initialized"
        );
    }
}

impl RootConfig for EmojiConfig {
    const DESCRIPTOR: RootDescriptor = RootDescriptor::new("emoji_config")
        .description("Emoji picker settings")
        .version("1.0.0");
}
