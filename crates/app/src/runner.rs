use services::{SessionController, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Everything that can wake the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Event(SessionEvent),
    /// 1-based position in the displayed choice list.
    Choice(usize),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Finished,
    Quit,
}

/// Maps one line typed by the learner. `None` for anything unrecognized.
#[must_use]
pub fn parse_line(line: &str) -> Option<Input> {
    match line.trim().to_lowercase().as_str() {
        "" | "n" | "next" => Some(Input::Event(SessionEvent::Next)),
        "p" | "b" | "back" => Some(Input::Event(SessionEvent::Previous)),
        "r" | "replay" => Some(Input::Event(SessionEvent::Replay)),
        "q" | "quit" | "exit" => Some(Input::Quit),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(Input::Choice),
    }
}

/// Forwards stdin lines into the input channel; end of input quits.
pub fn spawn_stdin(events: UnboundedSender<Input>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_line(&line) {
                Some(input) => {
                    if events.send(input).is_err() {
                        return;
                    }
                }
                None => println!("  ? n / p / r / 1-3 / q"),
            }
        }
        let _ = events.send(Input::Quit);
    });
}

/// Feeds inputs to the session until it finishes or the learner quits.
pub async fn drive(
    session: &mut SessionController,
    inputs: &mut UnboundedReceiver<Input>,
) -> LoopExit {
    while !session.is_finished() {
        let Some(input) = inputs.recv().await else {
            return LoopExit::Quit;
        };
        let event = match input {
            Input::Quit => {
                info!(position = session.progress().position, "session abandoned");
                return LoopExit::Quit;
            }
            Input::Event(event) => event,
            Input::Choice(n) => {
                let chosen = n
                    .checked_sub(1)
                    .and_then(|index| session.current_choices()?.get(index).copied());
                match chosen {
                    Some(item) => SessionEvent::ChoiceSelected(item),
                    None => {
                        debug!(n, "no such choice");
                        continue;
                    }
                }
            }
        };
        if let Err(err) = session.handle(event) {
            println!("  {err}");
        }
    }
    LoopExit::Finished
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::{TerminalFeedback, TerminalNavigator, TerminalPlayback, TerminalRenderer};
    use crate::timers::TokioTimers;
    use flashcard_core::model::{Deck, DeckId, ItemId, LearningItem};
    use services::{Collaborators, NullProgressSink, SeededRandom, SessionMode, SessionSetup};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn deck(size: u64) -> Deck {
        let items = (1..=size)
            .map(|n| LearningItem::new(ItemId::new(n), DeckId::new(1), format!("Con {n}")).unwrap())
            .collect();
        Deck::new(DeckId::new(1), items).unwrap()
    }

    fn session(
        mode: SessionMode,
        size: u64,
        tx: UnboundedSender<Input>,
    ) -> (SessionController, TerminalNavigator) {
        let navigator = TerminalNavigator::new("http://localhost:5000");
        let config = mode
            .default_config()
            .with_autoplay(None)
            .with_dwell(Duration::from_millis(10));
        let ports = Collaborators {
            renderer: Box::new(TerminalRenderer::default()),
            playback: Box::new(TerminalPlayback::default()),
            feedback: Box::new(TerminalFeedback),
            timers: Box::new(TokioTimers::new(tx)),
            navigator: Box::new(navigator.clone()),
            sink: Box::new(NullProgressSink),
        };
        let controller = SessionController::start(
            deck(size),
            SessionSetup::new(mode).with_config(config),
            ports,
            Box::new(SeededRandom::new(3)),
        );
        (controller, navigator)
    }

    #[test]
    fn parses_learner_input() {
        assert_eq!(parse_line(""), Some(Input::Event(SessionEvent::Next)));
        assert_eq!(parse_line(" P "), Some(Input::Event(SessionEvent::Previous)));
        assert_eq!(parse_line("r"), Some(Input::Event(SessionEvent::Replay)));
        assert_eq!(parse_line("2"), Some(Input::Choice(2)));
        assert_eq!(parse_line("0"), None);
        assert_eq!(parse_line("q"), Some(Input::Quit));
        assert_eq!(parse_line("hello"), None);
    }

    #[tokio::test]
    async fn flip_session_finishes_on_next() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut controller, navigator) = session(SessionMode::Flip, 2, tx.clone());
        tx.send(Input::Event(SessionEvent::Next)).unwrap();
        tx.send(Input::Event(SessionEvent::Next)).unwrap();

        assert_eq!(drive(&mut controller, &mut rx).await, LoopExit::Finished);
        assert_eq!(
            navigator.destination().as_deref(),
            Some("http://localhost:5000/flashcards/rewards?child_id=&deck_id=1&stars=20")
        );
    }

    #[tokio::test]
    async fn quiz_advances_when_the_dwell_timer_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut controller, _navigator) = session(SessionMode::Quiz, 1, tx.clone());
        tx.send(Input::Choice(5)).unwrap();
        tx.send(Input::Choice(1)).unwrap();

        assert_eq!(drive(&mut controller, &mut rx).await, LoopExit::Finished);
        assert_eq!(controller.outcome().unwrap().report.stars, 10);
    }

    #[tokio::test]
    async fn quitting_leaves_without_report() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut controller, navigator) = session(SessionMode::Flip, 3, tx.clone());
        tx.send(Input::Quit).unwrap();

        assert_eq!(drive(&mut controller, &mut rx).await, LoopExit::Quit);
        assert!(controller.outcome().is_none());
        assert_eq!(navigator.destination(), None);
    }
}
