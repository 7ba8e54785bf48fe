//! Static field and file metadata.
//!
//! Every config type declares a `&'static [FieldMeta]` table and every
//! root config a [`RootDescriptor`]. The tables drive property identity,
//! the `auto_save` flag threaded through change events, the persisted key
//! of each field, and the file location of root configs.

use serde::Serialize;
use serde_json::Value;

/// What kind of slot a field is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    /// A plain value compared by equality.
    Scalar,
    /// A nested config node.
    Entity,
    /// An ordered list of nested config nodes.
    EntityCollection,
    /// An ordered list of plain values.
    ValueCollection,
}

impl FieldKind {
    /// Whether `value` has the document shape this kind serializes to.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Scalar => !value.is_object() && !value.is_array(),
            FieldKind::Entity => value.is_object(),
            FieldKind::EntityCollection => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
            FieldKind::ValueCollection => value.is_array(),
        }
    }
}

/// Declared metadata for one field of a config type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    /// Property name used in change events and paths.
    pub name: &'static str,
    /// Key used in the persisted document, if different from `name`.
    pub alias: Option<&'static str>,
    pub description: Option<&'static str>,
    /// Whether a change to this field triggers a save of the root.
    pub auto_save: bool,
    pub kind: FieldKind,
    /// Other properties that get a property-changed notification
    /// whenever this field changes.
    pub notifies: &'static [&'static str],
}

impl FieldMeta {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            alias: None,
            description: None,
            auto_save: true,
            kind,
            notifies: &[],
        }
    }

    pub const fn scalar(name: &'static str) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    pub const fn entity(name: &'static str) -> Self {
        Self::new(name, FieldKind::Entity)
    }

    pub const fn entity_collection(name: &'static str) -> Self {
        Self::new(name, FieldKind::EntityCollection)
    }

    pub const fn value_collection(name: &'static str) -> Self {
        Self::new(name, FieldKind::ValueCollection)
    }

    pub const fn alias(self, alias: &'static str) -> Self {
        Self {
            alias: Some(alias),
            ..self
        }
    }

    pub const fn description(self, description: &'static str) -> Self {
        Self {
            description: Some(description),
            ..self
        }
    }

    /// Exclude this field from auto-save.
    pub const fn manual_save(self) -> Self {
        Self {
            auto_save: false,
            ..self
        }
    }

    pub const fn notifies(self, names: &'static [&'static str]) -> Self {
        Self {
            notifies: names,
            ..self
        }
    }

    /// Key under which the field is persisted.
    pub fn serialized_name(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }
}

/// Look up a field by property name in a metadata table.
pub fn find_field(fields: &'static [FieldMeta], name: &str) -> Option<&'static FieldMeta> {
    fields.iter().find(|field| field.name == name)
}

/// Differences between a field table and a serialized document.
///
/// Each declared field must appear under its [`FieldMeta::serialized_name`]
/// with the shape of its [`FieldKind`]. Extra keys are not reported.
pub fn layout_mismatches(fields: &[FieldMeta], document: &Value) -> Vec<String> {
    let Some(object) = document.as_object() else {
        return vec![format!("expected an object, found {document}")];
    };
    fields
        .iter()
        .filter_map(|field| {
            let key = field.serialized_name();
            match object.get(key) {
                None => Some(format!("{}: no `{key}` key", field.name)),
                Some(value) if !field.kind.accepts(value) => {
                    Some(format!("{}: `{key}` is not {:?}: {value}", field.name, field.kind))
                }
                Some(_) => None,
            }
        })
        .collect()
}

/// File placement and descriptive metadata of a root config type.
///
/// The file lives at `<root folder>/<dir_path>/<file_name><ext>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RootDescriptor {
    pub file_name: &'static str,
    pub dir_path: &'static str,
    /// Extension including the leading dot; selects the codec.
    pub ext: &'static str,
    pub description: Option<&'static str>,
    pub version: Option<&'static str>,
}

impl RootDescriptor {
    pub const DEFAULT_DIR: &'static str = "config";
    pub const DEFAULT_EXT: &'static str = ".yaml";

    pub const fn new(file_name: &'static str) -> Self {
        Self {
            file_name,
            dir_path: Self::DEFAULT_DIR,
            ext: Self::DEFAULT_EXT,
            description: None,
            version: None,
        }
    }

    pub const fn dir_path(self, dir_path: &'static str) -> Self {
        Self { dir_path, ..self }
    }

    pub const fn ext(self, ext: &'static str) -> Self {
        Self { ext, ..self }
    }

    pub const fn description(self, description: &'static str) -> Self {
        Self {
            description: Some(description),
            ..self
        }
    }

    pub const fn version(self, version: &'static str) -> Self {
        Self {
            version: Some(version),
            ..self
        }
    }

    /// File name with extension, e.g. `emoji_config.yaml`.
    pub fn file_name_with_ext(&self) -> String {
        format!("{}{}", self.file_name, self.ext)
    }
}
