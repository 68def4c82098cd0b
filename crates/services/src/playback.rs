use flashcard_core::model::{LearningItem, MediaKind};
use tracing::debug;

use crate::ports::{Playback, PlaybackError, PlaybackHandle, SpeechSettings};

#[derive(Debug, Clone)]
struct ActivePlayback {
    handle: PlaybackHandle,
    /// Label to speak if this clip later fails to load.
    fallback: Option<String>,
}

/// Owns the single playback a session may have running.
///
/// Every start stops whatever was playing first. Clips degrade to speech
/// of the item label; missing speech is a silent no-op.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSlot {
    voice: SpeechSettings,
    active: Option<ActivePlayback>,
}

impl PlaybackSlot {
    #[must_use]
    pub fn new(voice: SpeechSettings) -> Self {
        Self {
            voice,
            active: None,
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<PlaybackHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    pub fn stop(&mut self, port: &mut dyn Playback) {
        port.stop_all();
        self.active = None;
    }

    /// Plays the item's clip, or speaks its label when there is none or the
    /// clip cannot start.
    pub fn play_item(
        &mut self,
        port: &mut dyn Playback,
        item: &LearningItem,
    ) -> Option<PlaybackHandle> {
        self.stop(port);

        if let Some(clip) = item.audio() {
            let path = clip.resolve(MediaKind::Audio);
            match port.play(&path) {
                Ok(handle) => {
                    self.active = Some(ActivePlayback {
                        handle,
                        fallback: Some(item.label().to_owned()),
                    });
                    return Some(handle);
                }
                Err(err) => debug!(%path, error = %err, "clip failed to start, speaking label"),
            }
        }

        self.start_speech(port, item.label())
    }

    /// Speaks a phrase, replacing anything currently playing.
    pub fn say(&mut self, port: &mut dyn Playback, text: &str) -> Option<PlaybackHandle> {
        self.stop(port);
        self.start_speech(port, text)
    }

    /// Handles a late load failure of a clip.
    ///
    /// Only the active clip degrades; failures of clips that were already
    /// replaced are ignored.
    pub fn clip_failed(
        &mut self,
        port: &mut dyn Playback,
        handle: PlaybackHandle,
    ) -> Option<PlaybackHandle> {
        let fallback = match &mut self.active {
            Some(active) if active.handle == handle => active.fallback.take(),
            _ => None,
        }?;
        debug!(handle = handle.value(), "clip failed to load, speaking label");
        self.say(port, &fallback)
    }

    fn start_speech(&mut self, port: &mut dyn Playback, text: &str) -> Option<PlaybackHandle> {
        match port.speak(text, &self.voice) {
            Ok(handle) => {
                self.active = Some(ActivePlayback {
                    handle,
                    fallback: None,
                });
                Some(handle)
            }
            Err(PlaybackError::SpeechUnavailable) => {
                debug!("speech synthesis unavailable, staying silent");
                None
            }
            Err(err) => {
                debug!(error = %err, "speech failed, staying silent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcard_core::model::{DeckId, ItemId, MediaRef};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(String),
        Speak(String),
        StopAll,
    }

    #[derive(Default)]
    struct FakePlayback {
        calls: Vec<Call>,
        next: u64,
        clips_fail: bool,
        speech_missing: bool,
        playing: usize,
    }

    impl Playback for FakePlayback {
        fn play(&mut self, clip: &str) -> Result<PlaybackHandle, PlaybackError> {
            self.calls.push(Call::Play(clip.to_owned()));
            if self.clips_fail {
                return Err(PlaybackError::ClipUnavailable(clip.to_owned()));
            }
            self.next += 1;
            self.playing += 1;
            Ok(PlaybackHandle::new(self.next))
        }

        fn speak(
            &mut self,
            text: &str,
            _voice: &SpeechSettings,
        ) -> Result<PlaybackHandle, PlaybackError> {
            self.calls.push(Call::Speak(text.to_owned()));
            if self.speech_missing {
                return Err(PlaybackError::SpeechUnavailable);
            }
            self.next += 1;
            self.playing += 1;
            Ok(PlaybackHandle::new(self.next))
        }

        fn stop_all(&mut self) {
            self.calls.push(Call::StopAll);
            self.playing = 0;
        }
    }

    fn item(audio: Option<&str>) -> LearningItem {
        let item = LearningItem::new(ItemId::new(1), DeckId::new(1), "Con chó").unwrap();
        match audio {
            Some(a) => item.with_audio(MediaRef::new(a).unwrap()),
            None => item,
        }
    }

    #[test]
    fn plays_resolved_clip_after_stopping() {
        let mut port = FakePlayback::default();
        let mut slot = PlaybackSlot::default();

        let handle = slot.play_item(&mut port, &item(Some("dog.mp3")));

        assert_eq!(
            port.calls,
            vec![
                Call::StopAll,
                Call::Play("/static/flashcard/audio/dog.mp3".into())
            ]
        );
        assert_eq!(slot.active(), handle);
        assert_eq!(port.playing, 1);
    }

    #[test]
    fn item_without_clip_is_spoken() {
        let mut port = FakePlayback::default();
        let mut slot = PlaybackSlot::default();

        slot.play_item(&mut port, &item(None));

        assert_eq!(port.calls, vec![Call::StopAll, Call::Speak("Con chó".into())]);
    }

    #[test]
    fn clip_that_cannot_start_degrades_to_speech() {
        let mut port = FakePlayback {
            clips_fail: true,
            ..FakePlayback::default()
        };
        let mut slot = PlaybackSlot::default();

        let handle = slot.play_item(&mut port, &item(Some("dog.mp3")));

        assert!(handle.is_some());
        assert_eq!(port.calls.last(), Some(&Call::Speak("Con chó".into())));
    }

    #[test]
    fn late_failure_of_active_clip_speaks_once() {
        let mut port = FakePlayback::default();
        let mut slot = PlaybackSlot::default();
        let clip = slot.play_item(&mut port, &item(Some("dog.mp3"))).unwrap();

        let spoken = slot.clip_failed(&mut port, clip);
        assert!(spoken.is_some());
        assert_eq!(port.calls.last(), Some(&Call::Speak("Con chó".into())));
        assert_eq!(port.playing, 1);

        // The speech handle has no fallback of its own.
        assert_eq!(slot.clip_failed(&mut port, spoken.unwrap()), None);
    }

    #[test]
    fn failure_of_replaced_clip_is_ignored() {
        let mut port = FakePlayback::default();
        let mut slot = PlaybackSlot::default();
        let old = slot.play_item(&mut port, &item(Some("dog.mp3"))).unwrap();
        slot.play_item(&mut port, &item(Some("cat.mp3")));
        let calls_before = port.calls.len();

        assert_eq!(slot.clip_failed(&mut port, old), None);
        assert_eq!(port.calls.len(), calls_before);
    }

    #[test]
    fn missing_speech_is_silent() {
        let mut port = FakePlayback {
            speech_missing: true,
            ..FakePlayback::default()
        };
        let mut slot = PlaybackSlot::default();

        assert_eq!(slot.play_item(&mut port, &item(None)), None);
        assert_eq!(slot.active(), None);
    }

    #[test]
    fn at_most_one_playback_is_active() {
        let mut port = FakePlayback::default();
        let mut slot = PlaybackSlot::default();
        slot.play_item(&mut port, &item(Some("dog.mp3")));
        slot.say(&mut port, "Đúng rồi!");
        slot.play_item(&mut port, &item(None));
        assert_eq!(port.playing, 1);
    }
}
