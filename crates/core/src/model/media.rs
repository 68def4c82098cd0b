use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("media reference cannot be empty")]
    Empty,
}

//
// ─── MEDIA REFERENCES ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    fn default_folder(self) -> &'static str {
        match self {
            MediaKind::Image => "flashcard/images",
            MediaKind::Audio => "flashcard/audio",
        }
    }
}

/// A stored reference to an image or audio clip.
///
/// References are kept exactly as the deck stores them, either a bare file
/// name (`cat.mp3`) or a path below the static root (`flashcard/audio/cat.mp3`).
/// Use [`MediaRef::resolve`] to get the path the host actually loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaRef(String);

impl MediaRef {
    /// # Errors
    ///
    /// Returns `MediaError::Empty` for blank references.
    pub fn new(raw: impl Into<String>) -> Result<Self, MediaError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MediaError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Reads an optional stored reference, treating blank strings as absent.
    #[must_use]
    pub fn optional(raw: Option<String>) -> Option<Self> {
        raw.and_then(|value| Self::new(value).ok())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public path for this reference.
    ///
    /// Paths are served from `/static/`; bare file names live in the
    /// per-kind flashcard folder.
    #[must_use]
    pub fn resolve(&self, kind: MediaKind) -> String {
        if self.0.contains('/') {
            format!("/static/{}", self.0.trim_start_matches('/'))
        } else {
            format!("/static/{}/{}", kind.default_folder(), self.0)
        }
    }
}

impl TryFrom<String> for MediaRef {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MediaRef> for String {
    fn from(value: MediaRef) -> Self {
        value.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reference_is_rejected() {
        assert_eq!(MediaRef::new("   ").unwrap_err(), MediaError::Empty);
    }

    #[test]
    fn optional_treats_blank_as_absent() {
        assert_eq!(MediaRef::optional(Some(String::new())), None);
        assert_eq!(MediaRef::optional(None), None);
        assert!(MediaRef::optional(Some("dog.mp3".into())).is_some());
    }

    #[test]
    fn bare_names_resolve_into_kind_folder() {
        let clip = MediaRef::new("dog.mp3").unwrap();
        assert_eq!(clip.resolve(MediaKind::Audio), "/static/flashcard/audio/dog.mp3");

        let image = MediaRef::new("dog.png").unwrap();
        assert_eq!(
            image.resolve(MediaKind::Image),
            "/static/flashcard/images/dog.png"
        );
    }

    #[test]
    fn paths_resolve_below_static_root() {
        let clip = MediaRef::new("uploads/audio/dog.mp3").unwrap();
        assert_eq!(clip.resolve(MediaKind::Audio), "/static/uploads/audio/dog.mp3");
    }
}
