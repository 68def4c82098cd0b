//! Collaborators a learning session drives.
//!
//! The controller never touches a screen, speaker or network directly; the
//! host hands it these ports and feeds events back through
//! [`SessionController::handle`](crate::sessions::SessionController::handle).

use std::time::Duration;

use flashcard_core::model::{ItemId, LearningItem, ProgressReport, RewardsLink};
use thiserror::Error;

use crate::sessions::{SessionProgress, TimerId};

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// A card shown directly, in flip mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub item: LearningItem,
    /// Resolved image path, if the item has one.
    pub image: Option<String>,
    pub can_go_back: bool,
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// Show the item's picture, answer by label.
    Picture {
        prompt: String,
        image: Option<String>,
    },
    /// Play the item's sound, answer by picture.
    Listen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub item_id: ItemId,
    pub label: String,
    pub image: Option<String>,
}

/// An answer-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub kind: QuestionKind,
    pub choices: Vec<ChoiceView>,
    pub stars: u32,
}

//
// ─── PORTS ─────────────────────────────────────────────────────────────────────
//

pub trait Renderer {
    fn render_card(&mut self, card: &CardView);
    fn render_question(&mut self, question: &QuestionView);
    /// Highlight the submitted choice as right or wrong.
    fn mark_choice(&mut self, item: ItemId, correct: bool);
    /// Make every choice inert until the next question renders.
    fn lock_choices(&mut self);
    fn show_progress(&mut self, progress: &SessionProgress);
}

/// Opaque id of one clip or utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(u64);

impl PlaybackHandle {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaybackError {
    #[error("audio clip unavailable: {0}")]
    ClipUnavailable(String),
    #[error("speech synthesis unavailable")]
    SpeechUnavailable,
}

/// Voice used when a label is spoken instead of played.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeechSettings {
    /// Slower and higher than normal speech, for young children.
    fn default() -> Self {
        Self {
            lang: "vi-VN".into(),
            rate: 0.8,
            pitch: 1.2,
        }
    }
}

pub trait Playback {
    /// Starts a clip from its resolved path.
    ///
    /// # Errors
    ///
    /// `PlaybackError::ClipUnavailable` when the clip cannot be started.
    fn play(&mut self, clip: &str) -> Result<PlaybackHandle, PlaybackError>;

    /// # Errors
    ///
    /// `PlaybackError::SpeechUnavailable` when the host cannot synthesize speech.
    fn speak(&mut self, text: &str, voice: &SpeechSettings) -> Result<PlaybackHandle, PlaybackError>;

    /// Stops every clip and utterance immediately.
    fn stop_all(&mut self);
}

/// Cosmetic reactions to an answer.
pub trait Feedback {
    fn celebrate(&mut self);
    fn shake(&mut self, target: ItemId);
}

/// Deferred callbacks. The host reports expiry as `SessionEvent::TimerFired`.
pub trait Timers {
    fn schedule(&mut self, id: TimerId, delay: Duration);
    fn cancel(&mut self, id: TimerId);
}

/// Hands the learner off once a session is over.
pub trait Navigator {
    fn leave(&mut self, target: &RewardsLink);
}

/// Receives completion reports. Delivery is best effort and never awaited.
pub trait ProgressSink {
    fn submit(&self, report: ProgressReport);
}

/// Everything a session needs from its host.
pub struct Collaborators {
    pub renderer: Box<dyn Renderer>,
    pub playback: Box<dyn Playback>,
    pub feedback: Box<dyn Feedback>,
    pub timers: Box<dyn Timers>,
    pub navigator: Box<dyn Navigator>,
    pub sink: Box<dyn ProgressSink>,
}
