use flashcard_core::model::{
    DeckId, DeckProgress, ItemId, LearnerId, LearningItem, MediaRef,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn map_item_row(row: &SqliteRow) -> Result<LearningItem, StorageError> {
    let id = ItemId::new(i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?);
    let deck_id = deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?;
    let label: String = row.try_get("front_text").map_err(ser)?;

    let mut item = LearningItem::new(id, deck_id, label).map_err(ser)?;
    if let Some(text) = row.try_get::<Option<String>, _>("back_text").map_err(ser)? {
        item = item.with_secondary_label(text);
    }
    if let Some(image) = MediaRef::optional(row.try_get("image_url").map_err(ser)?) {
        item = item.with_image(image);
    }
    if let Some(audio) = MediaRef::optional(row.try_get("audio_url").map_err(ser)?) {
        item = item.with_audio(audio);
    }
    Ok(item)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<DeckProgress, StorageError> {
    let learner_id = LearnerId::new(i64_to_u64(
        "learner_id",
        row.try_get::<i64, _>("learner_id").map_err(ser)?,
    )?);
    let deck_id = deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?;

    Ok(DeckProgress {
        learner_id,
        deck_id,
        learned_cards: u32_from_i64(
            "learned_cards",
            row.try_get::<i64, _>("learned_cards").map_err(ser)?,
        )?,
        total_score: u32_from_i64(
            "total_score",
            row.try_get::<i64, _>("total_score").map_err(ser)?,
        )?,
        stars: u32_from_i64("stars", row.try_get::<i64, _>("stars").map_err(ser)?)?,
        last_studied: row.try_get("last_studied").map_err(ser)?,
        completion_date: row.try_get("completion_date").map_err(ser)?,
        streak_days: u32_from_i64(
            "streak_days",
            row.try_get::<i64, _>("streak_days").map_err(ser)?,
        )?,
    })
}
