use std::collections::HashSet;

use flashcard_core::model::{Deck, DeckId, ItemId, LearningItem};
use rand::seq::SliceRandom;

use super::progress::SessionProgress;
use crate::random::RandomSource;

/// Mutable state of one session, owned by its controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    deck_id: DeckId,
    items: Vec<LearningItem>,
    cursor: usize,
    presented: HashSet<ItemId>,
    score: u32,
    stars: u32,
}

impl SessionState {
    /// Shuffles the deck once; the order is fixed for the session.
    pub fn new(deck: Deck, rng: &mut dyn RandomSource) -> Self {
        let deck_id = deck.id();
        let mut items = deck.into_items();
        items.shuffle(rng.rng());
        Self {
            deck_id,
            items,
            cursor: 0,
            presented: HashSet::new(),
            score: 0,
            stars: 0,
        }
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    /// Items in presentation order.
    #[must_use]
    pub fn items(&self) -> &[LearningItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current(&self) -> &LearningItem {
        &self.items[self.cursor]
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.items.len()
    }

    #[must_use]
    pub fn presented_count(&self) -> usize {
        self.presented.len()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn stars(&self) -> u32 {
        self.stars
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            position: self.cursor + 1,
            total: self.items.len(),
            presented: self.presented.len(),
            stars: self.stars,
        }
    }

    pub(crate) fn mark_presented(&mut self) {
        let id = self.items[self.cursor].id();
        self.presented.insert(id);
    }

    /// Moves forward; false when already on the last item.
    pub(crate) fn step_forward(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Moves back; false when already on the first item.
    pub(crate) fn step_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub(crate) fn award(&mut self, unit: u32) {
        self.score = self.score.saturating_add(unit);
        self.stars = self.stars.saturating_add(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    fn deck(size: u64) -> Deck {
        let items = (1..=size)
            .map(|n| LearningItem::new(ItemId::new(n), DeckId::new(1), format!("Item {n}")).unwrap())
            .collect();
        Deck::new(DeckId::new(1), items).unwrap()
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut state = SessionState::new(deck(2), &mut SeededRandom::new(1));
        assert!(!state.step_back());
        assert!(state.step_forward());
        assert!(state.is_last());
        assert!(!state.step_forward());
        assert_eq!(state.cursor(), 1);
    }

    #[test]
    fn presented_counts_distinct_items() {
        let mut state = SessionState::new(deck(3), &mut SeededRandom::new(1));
        state.mark_presented();
        state.step_forward();
        state.mark_presented();
        state.step_back();
        state.mark_presented();
        assert_eq!(state.presented_count(), 2);
    }

    #[test]
    fn award_moves_score_and_stars_together() {
        let mut state = SessionState::new(deck(1), &mut SeededRandom::new(1));
        state.award(10);
        state.award(10);
        assert_eq!((state.score(), state.stars()), (20, 20));
    }
}
