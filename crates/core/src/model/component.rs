use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ComponentKindError {
    #[error("unknown component type code: {0}")]
    UnknownCode(u8),

    #[error("unknown component type: {0}")]
    UnknownName(String),
}

/// The four content views that make up a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Video,
    KeyConcepts,
    WritingPrompts,
    AdditionalMaterials,
}

impl ComponentKind {
    /// Every kind in the canonical class order.
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Video,
        ComponentKind::KeyConcepts,
        ComponentKind::WritingPrompts,
        ComponentKind::AdditionalMaterials,
    ];

    /// Numeric code used by the progress backend (`1..=4`).
    #[must_use]
    pub fn wire_code(self) -> u8 {
        match self {
            ComponentKind::Video => 1,
            ComponentKind::KeyConcepts => 2,
            ComponentKind::WritingPrompts => 3,
            ComponentKind::AdditionalMaterials => 4,
        }
    }

    /// Parses a backend code.
    ///
    /// # Errors
    ///
    /// Returns `ComponentKindError::UnknownCode` for anything outside `1..=4`.
    pub fn from_wire_code(code: u8) -> Result<Self, ComponentKindError> {
        match code {
            1 => Ok(ComponentKind::Video),
            2 => Ok(ComponentKind::KeyConcepts),
            3 => Ok(ComponentKind::WritingPrompts),
            4 => Ok(ComponentKind::AdditionalMaterials),
            other => Err(ComponentKindError::UnknownCode(other)),
        }
    }

    /// Parses a wire key, which is either the numeric code or the snake_case name.
    ///
    /// # Errors
    ///
    /// Returns `ComponentKindError` when the key matches neither form.
    pub fn from_wire_key(key: &str) -> Result<Self, ComponentKindError> {
        if let Ok(code) = key.trim().parse::<u8>() {
            return Self::from_wire_code(code);
        }
        match key.trim() {
            "video" => Ok(ComponentKind::Video),
            "key_concepts" => Ok(ComponentKind::KeyConcepts),
            "writing_prompts" => Ok(ComponentKind::WritingPrompts),
            "additional_materials" => Ok(ComponentKind::AdditionalMaterials),
            other => Err(ComponentKindError::UnknownName(other.to_owned())),
        }
    }

    /// Human-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::Video => "Video",
            ComponentKind::KeyConcepts => "Key Concepts",
            ComponentKind::WritingPrompts => "Writing Prompts",
            ComponentKind::AdditionalMaterials => "Additional Materials",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}
