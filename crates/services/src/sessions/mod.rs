mod choices;
mod controller;
mod event;
mod mode;
mod progress;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use choices::generate_choice_set;
pub use controller::{
    AnswerOutcome, SessionController, SessionOutcome, SessionSetup, SessionStatus,
};
pub use event::{ScheduledTask, SessionEvent, TimerId};
pub use mode::{ModeConfig, ParseModeError, SessionMode, question_prompt};
pub use progress::SessionProgress;
pub use state::SessionState;
