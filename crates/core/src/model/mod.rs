mod deck;
mod ids;
mod item;
mod media;
mod progress;
mod report;

pub use deck::{Deck, DeckError};
pub use ids::{DeckId, ItemId, LearnerId, ParseIdError};
pub use item::{ItemError, LearningItem};
pub use media::{MediaError, MediaKind, MediaRef};
pub use progress::DeckProgress;
pub use report::{ProgressReport, RewardsLink};
