use thiserror::Error;

use crate::model::{DeckError, ItemError, MediaError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Deck(#[from] DeckError),
}
