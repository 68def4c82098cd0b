//! Terminal host for a learning session: prints what a screen would show
//! and stands in for the speaker.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use flashcard_core::model::{ItemId, RewardsLink};
use services::ports::{
    CardView, Feedback, Navigator, Playback, PlaybackError, PlaybackHandle, QuestionKind,
    QuestionView, Renderer, SpeechSettings,
};
use services::session::SessionProgress;
use tracing::{info, warn};

/// Prints cards, questions and progress to stdout.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    locked: bool,
}

impl Renderer for TerminalRenderer {
    fn render_card(&mut self, card: &CardView) {
        println!();
        println!("  ┌─ {}", card.item.label());
        if let Some(secondary) = card.item.secondary_label() {
            println!("  │  {secondary}");
        }
        if let Some(image) = &card.image {
            println!("  │  [{image}]");
        }
        let back = if card.can_go_back { "[p] back  " } else { "" };
        let next = if card.is_last { "[n] finish" } else { "[n] next" };
        println!("  └─ {back}[r] replay  {next}");
    }

    fn render_question(&mut self, question: &QuestionView) {
        self.locked = false;
        println!();
        match &question.kind {
            QuestionKind::Picture { prompt, image } => {
                println!("  {prompt}");
                if let Some(image) = image {
                    println!("  [{image}]");
                }
            }
            QuestionKind::Listen => println!("  Nghe và chọn hình đúng ([r] nghe lại)"),
        }
        for (index, choice) in question.choices.iter().enumerate() {
            match &choice.image {
                Some(image) => println!("    {}) {}  [{image}]", index + 1, choice.label),
                None => println!("    {}) {}", index + 1, choice.label),
            }
        }
    }

    fn mark_choice(&mut self, item: ItemId, correct: bool) {
        if correct {
            println!("  ✔ {item}");
        } else {
            println!("  ✘ {item}");
        }
    }

    fn lock_choices(&mut self) {
        self.locked = true;
    }

    fn show_progress(&mut self, progress: &SessionProgress) {
        let lock = if self.locked { "  (đợi...)" } else { "" };
        println!(
            "  {}  {}%  ★ {}{lock}",
            progress.counter(),
            progress.percent(),
            progress.stars
        );
    }
}

/// Announces clips and speech instead of playing them.
///
/// With a media root, clips are looked up on disk first and missing files
/// fail like an unreachable clip would.
#[derive(Debug, Default)]
pub struct TerminalPlayback {
    media_root: Option<PathBuf>,
    next: u64,
}

impl TerminalPlayback {
    #[must_use]
    pub fn new(media_root: Option<PathBuf>) -> Self {
        Self {
            media_root,
            next: 0,
        }
    }

    fn issue(&mut self) -> PlaybackHandle {
        self.next += 1;
        PlaybackHandle::new(self.next)
    }
}

impl Playback for TerminalPlayback {
    fn play(&mut self, clip: &str) -> Result<PlaybackHandle, PlaybackError> {
        if let Some(root) = &self.media_root {
            let path = root.join(clip.trim_start_matches('/'));
            if !path.is_file() {
                return Err(PlaybackError::ClipUnavailable(clip.to_owned()));
            }
        }
        println!("  ♪ {clip}");
        Ok(self.issue())
    }

    fn speak(&mut self, text: &str, voice: &SpeechSettings) -> Result<PlaybackHandle, PlaybackError> {
        println!("  🔊 \"{text}\" ({})", voice.lang);
        Ok(self.issue())
    }

    fn stop_all(&mut self) {}
}

#[derive(Debug, Default)]
pub struct TerminalFeedback;

impl Feedback for TerminalFeedback {
    fn celebrate(&mut self) {
        println!("  🎉");
    }

    fn shake(&mut self, target: ItemId) {
        println!("  ~~ {target} ~~");
    }
}

/// Prints the rewards page the learner is sent to and remembers it.
#[derive(Debug, Clone)]
pub struct TerminalNavigator {
    base_url: String,
    left_to: Rc<RefCell<Option<String>>>,
}

impl TerminalNavigator {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            left_to: Rc::default(),
        }
    }

    #[must_use]
    pub fn destination(&self) -> Option<String> {
        self.left_to.borrow().clone()
    }
}

impl Navigator for TerminalNavigator {
    fn leave(&mut self, target: &RewardsLink) {
        match target.to_url(&self.base_url) {
            Ok(url) => {
                println!();
                println!("  ★ {} → {url}", target.stars);
                info!(%url, "leaving session");
                *self.left_to.borrow_mut() = Some(url.to_string());
            }
            Err(err) => warn!(base = %self.base_url, error = %err, "invalid rewards base url"),
        }
    }
}
