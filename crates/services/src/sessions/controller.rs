use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use flashcard_core::Clock;
use flashcard_core::model::{
    Deck, ItemId, LearnerId, LearningItem, MediaKind, ProgressReport, RewardsLink,
};
use tracing::{Span, debug, info, info_span};
use uuid::Uuid;

use super::choices::generate_choice_set;
use super::event::{ScheduledTask, SessionEvent, TimerId};
use super::mode::{ModeConfig, SessionMode, question_prompt};
use super::progress::SessionProgress;
use super::state::SessionState;
use crate::error::SessionError;
use crate::playback::PlaybackSlot;
use crate::ports::{
    CardView, ChoiceView, Collaborators, QuestionKind, QuestionView, SpeechSettings,
};
use crate::random::RandomSource;

//
// ─── SETUP ─────────────────────────────────────────────────────────────────────
//

/// How a session is launched.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub mode: SessionMode,
    pub config: ModeConfig,
    pub learner: Option<LearnerId>,
    pub voice: SpeechSettings,
    pub clock: Clock,
}

impl SessionSetup {
    #[must_use]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            config: mode.default_config(),
            learner: None,
            voice: SpeechSettings::default(),
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_learner(mut self, learner: Option<LearnerId>) -> Self {
        self.learner = learner;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ModeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: SpeechSettings) -> Self {
        self.voice = voice;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

//
// ─── STATUS / OUTCOMES ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Presenting(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// The question was already answered, or the id is not one of its choices.
    Ignored,
}

/// What a finished session reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub report: ProgressReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Question {
    expected: ItemId,
    choices: Vec<ItemId>,
    answered: bool,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Runs one learning session over one deck.
///
/// Single-threaded and event driven: the host calls [`handle`](Self::handle)
/// with renderer input and timer expiries, one at a time. Deferred work is
/// registered through the `Timers` port; each transition cancels whatever
/// was pending, and firings for stale timers are ignored.
pub struct SessionController {
    id: Uuid,
    mode: SessionMode,
    config: ModeConfig,
    learner: Option<LearnerId>,
    state: SessionState,
    status: SessionStatus,
    question: Option<Question>,
    pending: Option<(TimerId, ScheduledTask)>,
    timer_seq: u64,
    playback: PlaybackSlot,
    ports: Collaborators,
    rng: Box<dyn RandomSource>,
    clock: Clock,
    started_at: DateTime<Utc>,
    outcome: Option<SessionOutcome>,
    span: Span,
}

impl SessionController {
    /// Shuffles the deck and presents the first item.
    pub fn start(
        deck: Deck,
        setup: SessionSetup,
        ports: Collaborators,
        mut rng: Box<dyn RandomSource>,
    ) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!("session", %id, deck = %deck.id(), mode = %setup.mode);
        let state = SessionState::new(deck, rng.as_mut());

        let mut controller = Self {
            id,
            mode: setup.mode,
            config: setup.config,
            learner: setup.learner,
            state,
            status: SessionStatus::Presenting(0),
            question: None,
            pending: None,
            timer_seq: 0,
            playback: PlaybackSlot::new(setup.voice),
            ports,
            rng,
            clock: setup.clock,
            started_at: setup.clock.now(),
            outcome: None,
            span,
        };

        {
            let span = controller.span.clone();
            let _enter = span.enter();
            info!(items = controller.state.len(), learner = ?controller.learner, "session started");
            controller.present_current();
        }
        controller
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.state.progress()
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&LearningItem> {
        match self.status {
            SessionStatus::Presenting(_) => Some(self.state.current()),
            SessionStatus::Finished => None,
        }
    }

    /// Ids of the current choice set, in display order.
    #[must_use]
    pub fn current_choices(&self) -> Option<&[ItemId]> {
        self.question.as_ref().map(|q| q.choices.as_slice())
    }

    #[must_use]
    pub fn pending_timer(&self) -> Option<(TimerId, ScheduledTask)> {
        self.pending
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Dispatches one host event.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` after the session ended, and
    /// `SessionError::BackNotAllowed` for `Previous` outside flip mode.
    pub fn handle(&mut self, event: SessionEvent) -> Result<SessionStatus, SessionError> {
        if self.is_finished() {
            debug!(parent: &self.span, ?event, "event after finish ignored");
            return Err(SessionError::Finished);
        }

        match event {
            SessionEvent::Next => {
                if self.mode.uses_choices() {
                    debug!(parent: &self.span, "next ignored, answer modes advance on their own");
                    return Ok(self.status);
                }
                self.advance()
            }
            SessionEvent::Previous => self.go_back(),
            SessionEvent::Replay => self.replay().map(|()| self.status),
            SessionEvent::ChoiceSelected(item) => self.submit_answer(item).map(|_| self.status),
            SessionEvent::TimerFired(id) => {
                self.on_timer(id);
                Ok(self.status)
            }
            SessionEvent::PlaybackFailed(handle) => {
                self.playback
                    .clip_failed(self.ports.playback.as_mut(), handle);
                Ok(self.status)
            }
        }
    }

    /// Renders the current item and starts its sound.
    ///
    /// Re-presenting the same step shows the same item and choice set; an
    /// already answered question stays locked.
    pub fn present_current(&mut self) {
        if self.is_finished() {
            return;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        if matches!(self.pending, Some((_, ScheduledTask::Autoplay))) {
            self.cancel_pending();
        }
        self.playback.stop(self.ports.playback.as_mut());
        self.state.mark_presented();

        let item = self.state.current().clone();
        debug!(position = self.state.cursor(), item = %item.id(), "presenting");

        if self.mode.uses_choices() {
            if self.question.is_none() {
                self.question = Some(self.new_question(&item));
            }
            let view = self.question_view(&item);
            self.ports.renderer.render_question(&view);
            if self.question.as_ref().is_some_and(|q| q.answered) {
                self.ports.renderer.lock_choices();
                self.ports.renderer.show_progress(&self.state.progress());
                return;
            }
        } else {
            let view = CardView {
                image: item.image().map(|m| m.resolve(MediaKind::Image)),
                can_go_back: self.config.allow_back && self.state.cursor() > 0,
                is_last: self.state.is_last(),
                item,
            };
            self.ports.renderer.render_card(&view);
        }
        self.ports.renderer.show_progress(&self.state.progress());

        match self.config.autoplay {
            None => {}
            Some(delay) if delay.is_zero() => self.play_current(),
            Some(delay) => self.schedule(ScheduledTask::Autoplay, delay),
        }
    }

    /// Moves to the next item, or finishes after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` once the session is over.
    pub fn advance(&mut self) -> Result<SessionStatus, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        let span = self.span.clone();
        let _enter = span.enter();

        self.cancel_pending();
        self.playback.stop(self.ports.playback.as_mut());

        if self.state.step_forward() {
            self.question = None;
            self.status = SessionStatus::Presenting(self.state.cursor());
            self.present_current();
        } else {
            self.finish();
        }
        Ok(self.status)
    }

    /// Steps back one card in flip mode. A no-op on the first card.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::BackNotAllowed` in answer modes and
    /// `SessionError::Finished` once the session is over.
    pub fn go_back(&mut self) -> Result<SessionStatus, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        if !self.config.allow_back {
            return Err(SessionError::BackNotAllowed);
        }
        if self.state.cursor() == 0 {
            return Ok(self.status);
        }
        let span = self.span.clone();
        let _enter = span.enter();

        self.cancel_pending();
        self.playback.stop(self.ports.playback.as_mut());

        if self.state.step_back() {
            self.status = SessionStatus::Presenting(self.state.cursor());
            self.present_current();
        }
        Ok(self.status)
    }

    /// Plays the current item's sound again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` once the session is over.
    pub fn replay(&mut self) -> Result<(), SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        if matches!(self.pending, Some((_, ScheduledTask::Autoplay))) {
            self.cancel_pending();
        }
        self.play_current();
        Ok(())
    }

    /// Grades a choice for the current question. Only the first submission
    /// per question counts; choices lock immediately and the session moves
    /// on by itself after the dwell delay.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestion` in flip mode and
    /// `SessionError::Finished` once the session is over.
    pub fn submit_answer(&mut self, chosen: ItemId) -> Result<AnswerOutcome, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        let span = self.span.clone();
        let _enter = span.enter();

        let question = self.question.as_mut().ok_or(SessionError::NoQuestion)?;
        if question.answered {
            debug!(%chosen, "question already answered");
            return Ok(AnswerOutcome::Ignored);
        }
        if !question.choices.contains(&chosen) {
            debug!(%chosen, "choice is not part of the current question");
            return Ok(AnswerOutcome::Ignored);
        }
        question.answered = true;
        let correct = question.expected == chosen;

        self.cancel_pending();
        self.ports.renderer.lock_choices();
        self.ports.renderer.mark_choice(chosen, correct);

        let phrase = if correct {
            self.state.award(self.config.unit);
            self.ports.feedback.celebrate();
            self.config.correct_phrase.clone()
        } else {
            self.ports.feedback.shake(chosen);
            self.config.incorrect_phrase.clone()
        };
        // Without a phrase the item's own clip keeps playing.
        if let Some(phrase) = phrase {
            self.playback.say(self.ports.playback.as_mut(), &phrase);
        }

        self.ports.renderer.show_progress(&self.state.progress());
        self.schedule(ScheduledTask::AutoAdvance, self.config.dwell);

        debug!(%chosen, correct, stars = self.state.stars(), "answer graded");
        Ok(if correct {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect
        })
    }

    /// Runs the task behind a fired timer. Stale ids are ignored.
    pub fn on_timer(&mut self, id: TimerId) {
        let task = match self.pending {
            Some((pending, task)) if pending == id => task,
            _ => {
                debug!(parent: &self.span, ?id, "stale timer ignored");
                return;
            }
        };
        self.pending = None;

        match task {
            ScheduledTask::Autoplay => self.play_current(),
            ScheduledTask::AutoAdvance => {
                // Only fails once finished, and a finished session has no pending timer.
                let _ = self.advance();
            }
        }
    }

    fn play_current(&mut self) {
        if self.is_finished() {
            return;
        }
        let item = self.state.current().clone();
        self.playback.play_item(self.ports.playback.as_mut(), &item);
    }

    fn finish(&mut self) {
        self.status = SessionStatus::Finished;
        self.cancel_pending();
        self.playback.stop(self.ports.playback.as_mut());
        self.question = None;

        let report = self.build_report();
        let finished_at = self.clock.now();
        info!(
            learned_cards = report.learned_cards,
            stars = report.stars,
            score = ?report.score,
            elapsed_secs = self.clock.elapsed_since(self.started_at).num_seconds(),
            "session finished"
        );

        self.ports.sink.submit(report.clone());
        self.ports.navigator.leave(&RewardsLink::for_report(&report));

        self.outcome = Some(SessionOutcome {
            report,
            started_at: self.started_at,
            finished_at,
        });
    }

    fn build_report(&self) -> ProgressReport {
        let total = u32::try_from(self.state.len()).unwrap_or(u32::MAX);
        match self.mode {
            SessionMode::Flip => {
                let learned = u32::try_from(self.state.presented_count()).unwrap_or(u32::MAX);
                ProgressReport {
                    learner_id: self.learner,
                    deck_id: self.state.deck_id(),
                    learned_cards: learned,
                    score: None,
                    stars: learned.saturating_mul(self.config.unit),
                }
            }
            SessionMode::Quiz | SessionMode::AudioMatch => ProgressReport {
                learner_id: self.learner,
                deck_id: self.state.deck_id(),
                learned_cards: total,
                score: Some(self.state.score()),
                stars: self.state.stars(),
            },
        }
    }

    fn new_question(&mut self, item: &LearningItem) -> Question {
        let size = self.config.choice_count.max(1);
        let choices = generate_choice_set(self.state.items(), item, size, self.rng.as_mut())
            .into_iter()
            .map(LearningItem::id)
            .collect();
        Question {
            expected: item.id(),
            choices,
            answered: false,
        }
    }

    fn question_view(&self, item: &LearningItem) -> QuestionView {
        let choices = self
            .question
            .as_ref()
            .map(|q| {
                q.choices
                    .iter()
                    .filter_map(|id| self.state.items().iter().find(|c| c.id() == *id))
                    .map(|c| ChoiceView {
                        item_id: c.id(),
                        label: c.label().to_owned(),
                        image: c.image().map(|m| m.resolve(MediaKind::Image)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let kind = match self.mode {
            SessionMode::AudioMatch => QuestionKind::Listen,
            SessionMode::Quiz | SessionMode::Flip => QuestionKind::Picture {
                prompt: question_prompt(item.label()),
                image: item.image().map(|m| m.resolve(MediaKind::Image)),
            },
        };

        QuestionView {
            kind,
            choices,
            stars: self.state.stars(),
        }
    }

    fn schedule(&mut self, task: ScheduledTask, delay: Duration) {
        self.cancel_pending();
        self.timer_seq += 1;
        let id = TimerId::new(self.timer_seq);
        self.ports.timers.schedule(id, delay);
        self.pending = Some((id, task));
    }

    fn cancel_pending(&mut self) {
        if let Some((id, _)) = self.pending.take() {
            self.ports.timers.cancel(id);
        }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("cursor", &self.state.cursor())
            .field("items", &self.state.len())
            .field("stars", &self.state.stars())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
