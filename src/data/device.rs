use serde::{Serialize, Deserialize};
use std::fmt;

/// A playback endpoint that receives transport commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable device identifier, passed to every transport call
    pub id: String,
    /// Human readable device name
    pub name: String,
    /// Device type as reported by the provider ("Computer", "Smartphone", ...)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Whether this is the currently active device
    #[serde(default)]
    pub is_active: bool,
}

impl Device {
    pub fn new(id: &str, name: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            is_active: false,
        }
    }

    /// Match a user supplied selector against id or (case-insensitive) name
    pub fn matches(&self, selector: &str) -> bool {
        self.id == selector || self.name.eq_ignore_ascii_case(selector.trim())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}
