use chrono::Utc;
use flashcard_core::model::{Deck, DeckId};

use super::SqliteRepository;
use super::mapping::{deck_id_from_i64, id_to_i64, map_item_row, ser};
use crate::repository::{DeckRepository, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let deck_id = id_to_i64("deck_id", deck.id().value())?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO decks (id, updated_at)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at
            ",
        )
        .bind(deck_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM items WHERE deck_id = ?1")
            .bind(deck_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, item) in deck.items().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO items (id, deck_id, position, front_text, back_text, image_url, audio_url)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(id_to_i64("item_id", item.id().value())?)
            .bind(deck_id)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(item.label())
            .bind(item.secondary_label())
            .bind(item.image().map(|m| m.as_str()))
            .bind(item.audio().map(|m| m.as_str()))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, deck_id, front_text, back_text, image_url, audio_url
            FROM items
            WHERE deck_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_to_i64("deck_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if rows.is_empty() {
            return Err(StorageError::NotFound);
        }

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(map_item_row(row)?);
        }
        Deck::new(id, items).map_err(ser)
    }

    async fn list_deck_ids(&self) -> Result<Vec<DeckId>, StorageError> {
        let rows: Vec<i64> = sqlx::query_scalar("SELECT id FROM decks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        rows.into_iter().map(deck_id_from_i64).collect()
    }
}
