#![forbid(unsafe_code)]

pub mod error;
pub mod playback;
pub mod ports;
pub mod progress_sink;
pub mod random;
pub mod sessions;

pub use flashcard_core::Clock;
pub use sessions as session;

pub use error::{ProgressSinkError, SessionError};
pub use playback::PlaybackSlot;
pub use ports::Collaborators;
pub use progress_sink::{
    HttpProgressSink, NullProgressSink, ProgressSinkConfig, StoredProgressSink,
    legacy_child_id_from_env,
};
pub use random::{RandomSource, SeededRandom, ThreadRandom};

pub use sessions::{
    AnswerOutcome, ModeConfig, SessionController, SessionEvent, SessionMode, SessionOutcome,
    SessionSetup, SessionStatus,
};
