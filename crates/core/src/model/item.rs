use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{DeckId, ItemId};
use crate::model::media::MediaRef;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("item label cannot be empty")]
    EmptyLabel,
}

/// One flashcard as the learning modes see it.
///
/// Identity and primary label are always present; the secondary label,
/// image and audio clip are independently optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemRecord", into = "ItemRecord")]
pub struct LearningItem {
    id: ItemId,
    deck_id: DeckId,
    label: String,
    secondary_label: Option<String>,
    image: Option<MediaRef>,
    audio: Option<MediaRef>,
}

impl LearningItem {
    /// # Errors
    ///
    /// Returns `ItemError::EmptyLabel` when the label is blank.
    pub fn new(id: ItemId, deck_id: DeckId, label: impl Into<String>) -> Result<Self, ItemError> {
        let label = label.into().trim().to_owned();
        if label.is_empty() {
            return Err(ItemError::EmptyLabel);
        }
        Ok(Self {
            id,
            deck_id,
            label,
            secondary_label: None,
            image: None,
            audio: None,
        })
    }

    #[must_use]
    pub fn with_secondary_label(mut self, text: impl Into<String>) -> Self {
        let text = text.into().trim().to_owned();
        self.secondary_label = (!text.is_empty()).then_some(text);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: MediaRef) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: MediaRef) -> Self {
        self.audio = Some(audio);
        self
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn secondary_label(&self) -> Option<&str> {
        self.secondary_label.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&MediaRef> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn audio(&self) -> Option<&MediaRef> {
        self.audio.as_ref()
    }
}

/// Shape the site serves cards in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    id: ItemId,
    deck_id: DeckId,
    front_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    back_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
}

impl TryFrom<ItemRecord> for LearningItem {
    type Error = ItemError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let mut item = LearningItem::new(record.id, record.deck_id, record.front_text)?;
        if let Some(text) = record.back_text {
            item = item.with_secondary_label(text);
        }
        item.image = MediaRef::optional(record.image_url);
        item.audio = MediaRef::optional(record.audio_url);
        Ok(item)
    }
}

impl From<LearningItem> for ItemRecord {
    fn from(item: LearningItem) -> Self {
        Self {
            id: item.id,
            deck_id: item.deck_id,
            front_text: item.label,
            back_text: item.secondary_label,
            image_url: item.image.map(String::from),
            audio_url: item.audio.map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_label_is_rejected() {
        let err = LearningItem::new(ItemId::new(1), DeckId::new(1), "  ").unwrap_err();
        assert_eq!(err, ItemError::EmptyLabel);
    }

    #[test]
    fn blank_secondary_label_stays_absent() {
        let item = LearningItem::new(ItemId::new(1), DeckId::new(1), "Con chó")
            .unwrap()
            .with_secondary_label(" ");
        assert_eq!(item.secondary_label(), None);
    }

    #[test]
    fn reads_site_json_with_missing_media() {
        let json = r#"{
            "id": 5,
            "deck_id": 2,
            "front_text": "Con mèo",
            "back_text": "",
            "image_url": "cat.png",
            "audio_url": null
        }"#;
        let item: LearningItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.id(), ItemId::new(5));
        assert_eq!(item.deck_id(), DeckId::new(2));
        assert_eq!(item.label(), "Con mèo");
        assert_eq!(item.secondary_label(), None);
        assert_eq!(item.image().map(MediaRef::as_str), Some("cat.png"));
        assert!(item.audio().is_none());
    }

    #[test]
    fn site_json_with_blank_label_fails() {
        let json = r#"{ "id": 5, "deck_id": 2, "front_text": " " }"#;
        assert!(serde_json::from_str::<LearningItem>(json).is_err());
    }
}
