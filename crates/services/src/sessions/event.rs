use std::fmt;

use flashcard_core::model::ItemId;

use crate::ports::PlaybackHandle;

/// Id of one scheduled callback, unique within a session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// Work a session defers until a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Play the current item after it rendered.
    Autoplay,
    /// Move on after an answer's dwell delay.
    AutoAdvance,
}

/// Input a host feeds into a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Next,
    Previous,
    Replay,
    ChoiceSelected(ItemId),
    TimerFired(TimerId),
    PlaybackFailed(PlaybackHandle),
}
