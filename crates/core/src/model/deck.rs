use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{DeckId, ItemId};
use crate::model::item::LearningItem;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck must contain at least one item")]
    Empty,

    #[error("item {item} belongs to deck {found}, expected deck {expected}")]
    MixedDeck {
        item: ItemId,
        expected: DeckId,
        found: DeckId,
    },

    #[error("item {0} appears more than once")]
    DuplicateItem(ItemId),

    #[error("deck {0} has no items with an audio clip")]
    NoAudioItems(DeckId),
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// An ordered, non-empty collection of items sharing one deck id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    items: Vec<LearningItem>,
}

impl Deck {
    /// Builds a deck, keeping the given item order.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` when the list is empty, an item carries another
    /// deck id, or an item id repeats.
    pub fn new(id: DeckId, items: Vec<LearningItem>) -> Result<Self, DeckError> {
        if items.is_empty() {
            return Err(DeckError::Empty);
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.deck_id() != id {
                return Err(DeckError::MixedDeck {
                    item: item.id(),
                    expected: id,
                    found: item.deck_id(),
                });
            }
            if !seen.insert(item.id()) {
                return Err(DeckError::DuplicateItem(item.id()));
            }
        }

        Ok(Self { id, items })
    }

    /// Builds a deck whose id is taken from its first item.
    ///
    /// # Errors
    ///
    /// Same as [`Deck::new`].
    pub fn from_items(items: Vec<LearningItem>) -> Result<Self, DeckError> {
        let id = items.first().map(LearningItem::deck_id).ok_or(DeckError::Empty)?;
        Self::new(id, items)
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn items(&self) -> &[LearningItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<LearningItem> {
        self.items
    }

    /// Keeps only items that carry an audio clip, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::NoAudioItems` when nothing is left.
    pub fn with_audio_only(self) -> Result<Self, DeckError> {
        let id = self.id;
        let items: Vec<_> = self
            .items
            .into_iter()
            .filter(|item| item.audio().is_some())
            .collect();
        if items.is_empty() {
            return Err(DeckError::NoAudioItems(id));
        }
        Ok(Self { id, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaRef;

    fn item(id: u64, deck: u64) -> LearningItem {
        LearningItem::new(ItemId::new(id), DeckId::new(deck), format!("Item {id}")).unwrap()
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert_eq!(Deck::new(DeckId::new(1), Vec::new()), Err(DeckError::Empty));
        assert_eq!(Deck::from_items(Vec::new()), Err(DeckError::Empty));
    }

    #[test]
    fn items_must_share_deck_id() {
        let err = Deck::new(DeckId::new(1), vec![item(1, 1), item(2, 9)]).unwrap_err();
        assert!(matches!(err, DeckError::MixedDeck { item, .. } if item == ItemId::new(2)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Deck::new(DeckId::new(1), vec![item(1, 1), item(1, 1)]).unwrap_err();
        assert_eq!(err, DeckError::DuplicateItem(ItemId::new(1)));
    }

    #[test]
    fn from_items_takes_first_deck_id() {
        let deck = Deck::from_items(vec![item(1, 4), item(2, 4)]).unwrap();
        assert_eq!(deck.id(), DeckId::new(4));
        assert_eq!(deck.len(), 2);
    }

    #[test]
    fn audio_only_filters_and_rejects_silent_decks() {
        let voiced = item(1, 1).with_audio(MediaRef::new("a.mp3").unwrap());
        let deck = Deck::new(DeckId::new(1), vec![voiced, item(2, 1)]).unwrap();
        let filtered = deck.with_audio_only().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.items()[0].id(), ItemId::new(1));

        let silent = Deck::new(DeckId::new(1), vec![item(3, 1)]).unwrap();
        assert_eq!(
            silent.with_audio_only(),
            Err(DeckError::NoAudioItems(DeckId::new(1)))
        );
    }
}
