use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three ways a deck can be worked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Cards shown one by one with their sound; free forward/back navigation.
    Flip,
    /// Picture shown, pick the matching label.
    Quiz,
    /// Sound played, pick the matching picture.
    AudioMatch,
}

impl SessionMode {
    #[must_use]
    pub fn uses_choices(self) -> bool {
        !matches!(self, SessionMode::Flip)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Flip => "flip",
            SessionMode::Quiz => "quiz",
            SessionMode::AudioMatch => "audio",
        }
    }

    #[must_use]
    pub fn default_config(self) -> ModeConfig {
        match self {
            SessionMode::Flip => ModeConfig {
                allow_back: true,
                autoplay: Some(Duration::from_millis(500)),
                dwell: Duration::ZERO,
                unit: 10,
                choice_count: 0,
                correct_phrase: None,
                incorrect_phrase: None,
            },
            SessionMode::Quiz => ModeConfig {
                allow_back: false,
                autoplay: Some(Duration::from_millis(500)),
                dwell: Duration::from_secs(2),
                unit: 10,
                choice_count: 3,
                correct_phrase: Some("Đúng rồi! Giỏi lắm!".into()),
                incorrect_phrase: Some("Chưa đúng, thử lại nhé!".into()),
            },
            SessionMode::AudioMatch => ModeConfig {
                allow_back: false,
                autoplay: Some(Duration::ZERO),
                dwell: Duration::from_secs(2),
                unit: 10,
                choice_count: 3,
                correct_phrase: Some("Đúng rồi!".into()),
                incorrect_phrase: None,
            },
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode: {0} (expected flip, quiz or audio)")]
pub struct ParseModeError(String);

impl FromStr for SessionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flip" | "flash" | "learn" => Ok(SessionMode::Flip),
            "quiz" => Ok(SessionMode::Quiz),
            "audio" | "audio_match" | "listen" => Ok(SessionMode::AudioMatch),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}

/// Tunable behavior of one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeConfig {
    pub allow_back: bool,
    /// Delay between rendering an item and playing it. `None` disables
    /// autoplay, `Some(ZERO)` plays right after rendering.
    pub autoplay: Option<Duration>,
    /// Pause after an answer before moving on.
    pub dwell: Duration,
    /// Stars per correct answer, and per distinct card in flip mode.
    pub unit: u32,
    /// Size of the choice set, capped by deck size.
    pub choice_count: usize,
    pub correct_phrase: Option<String>,
    pub incorrect_phrase: Option<String>,
}

impl ModeConfig {
    #[must_use]
    pub fn with_autoplay(mut self, autoplay: Option<Duration>) -> Self {
        self.autoplay = autoplay;
        self
    }

    #[must_use]
    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }
}

/// Question text for a picture quiz, guessed from the label's leading word.
#[must_use]
pub fn question_prompt(label: &str) -> String {
    let lower = label.to_lowercase();
    let category = if lower.starts_with("con ") {
        "con vật"
    } else if lower.starts_with("quả ") || lower.starts_with("trái ") {
        "trái cây"
    } else if lower.starts_with("màu ") {
        "màu sắc"
    } else if lower.starts_with("số ") {
        "con số"
    } else if lower.starts_with("chữ ") {
        "chữ cái"
    } else {
        "hình"
    };
    format!("Đây là {category} gì?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_names() {
        assert_eq!("flip".parse::<SessionMode>(), Ok(SessionMode::Flip));
        assert_eq!(" Quiz ".parse::<SessionMode>(), Ok(SessionMode::Quiz));
        assert_eq!("audio".parse::<SessionMode>(), Ok(SessionMode::AudioMatch));
        let err = "memory".parse::<SessionMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown mode: memory (expected flip, quiz or audio)"
        );
    }

    #[test]
    fn only_flip_goes_back() {
        assert!(SessionMode::Flip.default_config().allow_back);
        assert!(!SessionMode::Quiz.default_config().allow_back);
        assert!(!SessionMode::AudioMatch.default_config().allow_back);
    }

    #[test]
    fn autoplay_defaults_differ_per_mode() {
        assert_eq!(
            SessionMode::Quiz.default_config().autoplay,
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            SessionMode::AudioMatch.default_config().autoplay,
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn prompt_follows_label_category() {
        assert_eq!(question_prompt("Con Mèo"), "Đây là con vật gì?");
        assert_eq!(question_prompt("Quả táo"), "Đây là trái cây gì?");
        assert_eq!(question_prompt("trái cam"), "Đây là trái cây gì?");
        assert_eq!(question_prompt("Màu đỏ"), "Đây là màu sắc gì?");
        assert_eq!(question_prompt("Số 3"), "Đây là con số gì?");
        assert_eq!(question_prompt("Chữ A"), "Đây là chữ cái gì?");
        assert_eq!(question_prompt("Ô tô"), "Đây là hình gì?");
    }
}
