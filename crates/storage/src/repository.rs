use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashcard_core::model::{Deck, DeckId, DeckProgress, LearnerId, ProgressReport};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("progress report has no learner")]
    AnonymousReport,
}

/// Source of decks for learning sessions.
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Persist a deck, replacing any items previously stored under its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck with its items in stored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck is missing or has no items.
    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError>;

    /// Ids of all stored decks, ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_deck_ids(&self) -> Result<Vec<DeckId>, StorageError>;
}

/// Per-learner deck progress, the local counterpart of the progress endpoint.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        learner: LearnerId,
        deck: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError>;

    /// Fold a completion report into the learner's deck progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AnonymousReport` for reports without a learner,
    /// or other storage errors.
    async fn record_completion(
        &self,
        report: &ProgressReport,
        now: DateTime<Utc>,
    ) -> Result<DeckProgress, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    decks: Arc<Mutex<HashMap<DeckId, Deck>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, DeckId), DeckProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError> {
        let guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_deck_ids(&self) -> Result<Vec<DeckId>, StorageError> {
        let guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut ids: Vec<_> = guard.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        deck: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(learner, deck)).cloned())
    }

    async fn record_completion(
        &self,
        report: &ProgressReport,
        now: DateTime<Utc>,
    ) -> Result<DeckProgress, StorageError> {
        let learner = report.learner_id.ok_or(StorageError::AnonymousReport)?;
        let deck_size = {
            let decks = self
                .decks
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            decks
                .get(&report.deck_id)
                .map_or(0, |deck| u32::try_from(deck.len()).unwrap_or(u32::MAX))
        };

        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let entry = guard
            .entry((learner, report.deck_id))
            .or_insert_with(|| DeckProgress::new(learner, report.deck_id));
        entry.apply(report, deck_size, now);
        Ok(entry.clone())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let decks: Arc<dyn DeckRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { decks, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcard_core::model::{ItemId, LearningItem};
    use flashcard_core::time::fixed_now;

    fn build_deck(id: u64, size: u64) -> Deck {
        let items = (1..=size)
            .map(|n| {
                LearningItem::new(ItemId::new(n), DeckId::new(id), format!("Item {n}")).unwrap()
            })
            .collect();
        Deck::new(DeckId::new(id), items).unwrap()
    }

    fn report(learner: Option<u64>, learned: u32) -> ProgressReport {
        ProgressReport {
            learner_id: learner.map(LearnerId::new),
            deck_id: DeckId::new(1),
            learned_cards: learned,
            score: Some(10),
            stars: 10,
        }
    }

    #[tokio::test]
    async fn round_trips_deck() {
        let repo = InMemoryRepository::new();
        let deck = build_deck(1, 3);
        repo.upsert_deck(&deck).await.unwrap();

        assert_eq!(repo.get_deck(DeckId::new(1)).await.unwrap(), deck);
        assert!(matches!(
            repo.get_deck(DeckId::new(2)).await,
            Err(StorageError::NotFound)
        ));
        assert_eq!(repo.list_deck_ids().await.unwrap(), vec![DeckId::new(1)]);
    }

    #[tokio::test]
    async fn records_completion_against_deck_size() {
        let repo = InMemoryRepository::new();
        repo.upsert_deck(&build_deck(1, 2)).await.unwrap();

        let first = repo.record_completion(&report(Some(9), 1), fixed_now()).await.unwrap();
        assert_eq!(first.completion_date, None);

        let second = repo.record_completion(&report(Some(9), 2), fixed_now()).await.unwrap();
        assert_eq!(second.completion_date, Some(fixed_now()));
        assert_eq!(second.stars, 20);
        assert_eq!(second.total_score, 20);

        let stored = repo
            .get_progress(LearnerId::new(9), DeckId::new(1))
            .await
            .unwrap();
        assert_eq!(stored, Some(second));
    }

    #[tokio::test]
    async fn anonymous_reports_are_rejected() {
        let repo = InMemoryRepository::new();
        let err = repo.record_completion(&report(None, 1), fixed_now()).await.unwrap_err();
        assert!(matches!(err, StorageError::AnonymousReport));
    }
}
