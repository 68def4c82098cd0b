use chrono::{DateTime, Utc};
use flashcard_core::model::{DeckId, DeckProgress, LearnerId, ProgressReport};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_progress_row, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        deck: DeckId,
    ) -> Result<Option<DeckProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, deck_id, learned_cards, total_score, stars,
                   last_studied, completion_date, streak_days
            FROM deck_progress
            WHERE learner_id = ?1 AND deck_id = ?2
            ",
        )
        .bind(id_to_i64("learner_id", learner.value())?)
        .bind(id_to_i64("deck_id", deck.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn record_completion(
        &self,
        report: &ProgressReport,
        now: DateTime<Utc>,
    ) -> Result<DeckProgress, StorageError> {
        let learner = report.learner_id.ok_or(StorageError::AnonymousReport)?;
        let deck_id = id_to_i64("deck_id", report.deck_id.value())?;

        let deck_size: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE deck_id = ?1")
            .bind(deck_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let deck_size = u32::try_from(deck_size).map_err(ser)?;

        let mut progress = self
            .get_progress(learner, report.deck_id)
            .await?
            .unwrap_or_else(|| DeckProgress::new(learner, report.deck_id));
        progress.apply(report, deck_size, now);

        sqlx::query(
            r"
            INSERT INTO deck_progress (
                learner_id, deck_id, learned_cards, total_score, stars,
                last_studied, completion_date, streak_days
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(learner_id, deck_id) DO UPDATE SET
                learned_cards = excluded.learned_cards,
                total_score = excluded.total_score,
                stars = excluded.stars,
                last_studied = excluded.last_studied,
                completion_date = excluded.completion_date,
                streak_days = excluded.streak_days
            ",
        )
        .bind(id_to_i64("learner_id", learner.value())?)
        .bind(deck_id)
        .bind(i64::from(progress.learned_cards))
        .bind(i64::from(progress.total_score))
        .bind(i64::from(progress.stars))
        .bind(progress.last_studied)
        .bind(progress.completion_date)
        .bind(i64::from(progress.streak_days))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(progress)
    }
}
