//! Path addressing into nested theme-option trees.
//!
//! Paths are stored as segment vectors rather than delimited strings so a
//! segment containing the delimiter can never corrupt addressing. The dotted
//! form ("palette.primary.main") is only a parse/display convenience.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A path into a nested theme-options tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThemePath(Vec<String>);

#[derive(Debug, Error)]
#[error("Invalid theme path: {0}")]
pub struct InvalidPath(pub String);

impl ThemePath {
    /// Build a path from explicit segments. Empty segments are rejected.
    pub fn new<I, S>(segments: I) -> Result<Self, InvalidPath>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(InvalidPath(segments.join(".")));
        }
        Ok(ThemePath(segments))
    }

    /// Parse a dot-delimited path string.
    pub fn parse(text: &str) -> Result<Self, InvalidPath> {
        if text.is_empty() {
            return Err(InvalidPath(text.to_string()));
        }
        Self::new(text.split('.'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path with one more trailing segment.
    pub fn child(&self, segment: &str) -> Result<Self, InvalidPath> {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self::new(segments)
    }
}

impl std::fmt::Display for ThemePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl std::str::FromStr for ThemePath {
    type Err = InvalidPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThemePath::parse(s)
    }
}

// Serialized as the dotted string so paths read naturally as JSON map keys.
impl Serialize for ThemePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ThemePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ThemePath::parse(&text).map_err(D::Error::custom)
    }
}
