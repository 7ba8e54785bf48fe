//! Full-path construction and matching.
//!
//! A full path names a field relative to the node observing the change.
//! Nested entity fields are joined with `.`, members of an entity
//! collection add an `[Item]` marker to the collection's segment:
//!
//! - `DefaultEmojiSize`
//! - `Settings.NestedValue`
//! - `CustomSettings[Item].NestedNumber`
//!
//! The marker carries no index, so a path alone does not tell which
//! member of a collection changed.

use crate::event::ChangeEvent;

/// Marker appended to a collection field's segment for per-item events.
pub const ITEM_MARKER: &str = "[Item]";

/// Build the full path of `child` as seen from the node holding it under
/// `owner_field`.
pub fn build_path(owner_field: &str, child: &ChangeEvent, is_collection_item: bool) -> String {
    let tail = pick(child);
    if is_collection_item {
        format!("{owner_field}{ITEM_MARKER}.{tail}")
    } else {
        format!("{owner_field}.{tail}")
    }
}

fn pick(event: &ChangeEvent) -> &str {
    if event.full_path.is_empty() {
        &event.property_name
    } else {
        &event.full_path
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq)]
enum PatternSegment {
    /// Exact literal match for this segment
    Literal(String),
    /// Single wildcard (*) - matches exactly one segment when mid-path,
    /// or any suffix when at the end
    Wildcard,
}

/// A filter over full paths that may contain wildcards.
///
/// Supported patterns:
/// - Exact: "Settings.NestedValue"
/// - Suffix wildcard: "Settings.*"
/// - Mid-path wildcard: "*.NestedNumber"
/// - Collection members: "CustomSettings[Item].*"
/// - Full wildcard: "*"
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<PatternSegment>,
    /// True if the pattern ends with a wildcard (matches any suffix)
    trailing_wildcard: bool,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let parts: Vec<&str> = segments(pattern).collect();
        if let Some(position) = parts.iter().position(|part| part.is_empty()) {
            return Err(PatternError::EmptySegment(position));
        }

        let trailing_wildcard = parts.last() == Some(&"*");
        let segments = parts
            .iter()
            .map(|&part| match part {
                "*" => PatternSegment::Wildcard,
                literal => PatternSegment::Literal(literal.to_string()),
            })
            .collect();

        Ok(Self {
            raw: pattern.to_string(),
            segments,
            trailing_wildcard,
        })
    }

    /// Check if a full path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = segments(path).collect();

        if self.trailing_wildcard {
            // "Settings.*" needs at least one segment after "Settings",
            // a lone "*" matches anything.
            if parts.len() < self.segments.len() && self.segments.len() > 1 {
                return false;
            }
        } else if parts.len() != self.segments.len() {
            return false;
        }

        for (i, segment) in self.segments.iter().enumerate() {
            if self.trailing_wildcard && i == self.segments.len() - 1 {
                return true;
            }
            match segment {
                PatternSegment::Literal(literal) => {
                    if parts[i] != literal {
                        return false;
                    }
                }
                PatternSegment::Wildcard => {
                    if parts[i].is_empty() {
                        return false;
                    }
                }
            }
        }

        true
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Errors that can occur when creating a path pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Empty pattern")]
    EmptyPattern,

    #[error("Empty segment at position {0}")]
    EmptySegment(usize),
}
