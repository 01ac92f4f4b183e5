//! Dot-separated settings keys

use crate::SettingsError;
use std::fmt;

/// A validated path into the settings document, e.g. `camera.fly_move_speed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingsKey {
    raw: String,
    segments: Vec<String>,
}

impl SettingsKey {
    pub fn parse(raw: &str) -> Result<Self, SettingsError> {
        if raw.is_empty() {
            return Err(SettingsError::InvalidKey {
                key: raw.to_string(),
                reason: "key is empty",
            });
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(SettingsError::InvalidKey {
                key: raw.to_string(),
                reason: "key contains an empty segment",
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Split into parent segments and the leaf name.
    pub fn split_leaf(&self) -> (&[String], &str) {
        // parse() guarantees at least one segment
        match self.segments.split_last() {
            Some((leaf, parents)) => (parents, leaf.as_str()),
            None => (&[], ""),
        }
    }

    /// Append `child`, which may itself contain dots.
    pub fn join(&self, child: &str) -> Result<Self, SettingsError> {
        Self::parse(&format!("{}.{}", self.raw, child))
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for SettingsKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
