mod runner;
mod terminal;
mod timers;

use std::fmt;
use std::path::PathBuf;

use flashcard_core::Clock;
use flashcard_core::model::{Deck, DeckId, LearnerId, LearningItem};
use services::ports::ProgressSink;
use services::{
    Collaborators, HttpProgressSink, ProgressSinkConfig, RandomSource, SeededRandom,
    SessionController, SessionMode, SessionSetup, StoredProgressSink, ThreadRandom,
    legacy_child_id_from_env,
};
use storage::repository::Storage;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::runner::LoopExit;
use crate::terminal::{TerminalFeedback, TerminalNavigator, TerminalPlayback, TerminalRenderer};
use crate::timers::TokioTimers;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidMode(String),
    MissingFile,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMode(msg) => write!(f, "{msg}"),
            ArgsError::MissingFile => write!(f, "seed requires --file <deck.json>"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id(flag: &'static str, value: &str) -> Result<u64, ArgsError> {
    value.trim().parse().map_err(|_| ArgsError::InvalidId {
        flag,
        raw: value.to_string(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- learn [--mode flip|quiz|audio] [--deck-id <id>] [--learner <id>]");
    eprintln!("                            [--db <sqlite_url>] [--report-url <url>] [--base-url <url>]");
    eprintln!("                            [--media-root <dir>] [--seed <n>] [--verbose]");
    eprintln!("  cargo run -p app -- seed  --file <deck.json> [--db <sqlite_url>] [--verbose]");
    eprintln!();
    eprintln!("Defaults for learn:");
    eprintln!("  --mode flip");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --deck-id 1");
    eprintln!("  --base-url http://localhost:5000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FLASHCARD_DB_URL, FLASHCARD_DECK_ID, FLASHCARD_LEARNER_ID,");
    eprintln!("  FLASHCARD_REPORT_URL, FLASHCARD_REPORT_CHILD_ID, FLASHCARD_BASE_URL,");
    eprintln!("  FLASHCARD_MEDIA_ROOT, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Learn,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "learn" => Some(Self::Learn),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    deck_id: DeckId,
    learner: Option<LearnerId>,
    mode: SessionMode,
    report: Option<ProgressSinkConfig>,
    base_url: String,
    media_root: Option<PathBuf>,
    seed: Option<u64>,
    file: Option<PathBuf>,
    verbose: bool,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Args {
    fn from_env() -> Self {
        Self {
            db_url: env_value("FLASHCARD_DB_URL")
                .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url),
            deck_id: env_value("FLASHCARD_DECK_ID")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map_or_else(|| DeckId::new(1), DeckId::new),
            learner: env_value("FLASHCARD_LEARNER_ID")
                .and_then(|value| value.parse::<LearnerId>().ok()),
            mode: SessionMode::Flip,
            report: ProgressSinkConfig::from_env(),
            base_url: env_value("FLASHCARD_BASE_URL")
                .unwrap_or_else(|| "http://localhost:5000".into()),
            media_root: env_value("FLASHCARD_MEDIA_ROOT").map(PathBuf::from),
            seed: None,
            file: None,
            verbose: false,
        }
    }

    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::from_env();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--deck-id" => {
                    let value = require_value(args, "--deck-id")?;
                    parsed.deck_id = DeckId::new(parse_id("--deck-id", &value)?);
                }
                "--learner" => {
                    let value = require_value(args, "--learner")?;
                    parsed.learner = Some(LearnerId::new(parse_id("--learner", &value)?));
                }
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    parsed.mode = value
                        .parse()
                        .map_err(|e: services::session::ParseModeError| {
                            ArgsError::InvalidMode(e.to_string())
                        })?;
                }
                "--report-url" => {
                    let url = require_value(args, "--report-url")?;
                    parsed.report = Some(
                        ProgressSinkConfig::new(url).with_legacy_child_id(legacy_child_id_from_env()),
                    );
                }
                "--base-url" => parsed.base_url = require_value(args, "--base-url")?,
                "--media-root" => {
                    parsed.media_root = Some(PathBuf::from(require_value(args, "--media-root")?));
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    parsed.seed = Some(parse_id("--seed", &value)?);
                }
                "--file" if cmd == Command::Seed => {
                    parsed.file = Some(PathBuf::from(require_value(args, "--file")?));
                }
                "--verbose" | "-v" => parsed.verbose = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Seed && parsed.file.is_none() {
            return Err(ArgsError::MissingFile);
        }
        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so the session output stays readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The sink a session reports into, kept so pending deliveries can be awaited.
#[derive(Clone)]
enum AppSink {
    Http(HttpProgressSink),
    Stored(StoredProgressSink),
}

impl AppSink {
    fn boxed(&self) -> Box<dyn ProgressSink> {
        match self {
            AppSink::Http(sink) => Box::new(sink.clone()),
            AppSink::Stored(sink) => Box::new(sink.clone()),
        }
    }

    async fn flush(&self) {
        match self {
            AppSink::Http(sink) => sink.flush().await,
            AppSink::Stored(sink) => sink.flush().await,
        }
    }
}

async fn learn(parsed: Args, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let mut deck = storage.decks.get_deck(parsed.deck_id).await?;
    if parsed.mode == SessionMode::AudioMatch {
        deck = deck.with_audio_only()?;
    }

    let clock = Clock::default();
    let sink = match parsed.report {
        Some(config) => AppSink::Http(HttpProgressSink::new(Some(config), Handle::current())),
        None => AppSink::Stored(StoredProgressSink::new(
            storage.progress.clone(),
            clock,
            Handle::current(),
        )),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let navigator = TerminalNavigator::new(parsed.base_url);
    let ports = Collaborators {
        renderer: Box::new(TerminalRenderer::default()),
        playback: Box::new(TerminalPlayback::new(parsed.media_root)),
        feedback: Box::new(TerminalFeedback),
        timers: Box::new(TokioTimers::new(tx.clone())),
        navigator: Box::new(navigator.clone()),
        sink: sink.boxed(),
    };
    let rng: Box<dyn RandomSource> = match parsed.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom::new()),
    };

    let setup = SessionSetup::new(parsed.mode)
        .with_learner(parsed.learner)
        .with_clock(clock);
    let mut session = SessionController::start(deck, setup, ports, rng);

    runner::spawn_stdin(tx);
    let exit = runner::drive(&mut session, &mut rx).await;
    sink.flush().await;

    let rewards = navigator.destination().unwrap_or_default();
    match (exit, session.outcome()) {
        (LoopExit::Finished, Some(outcome)) => info!(
            stars = outcome.report.stars,
            learned_cards = outcome.report.learned_cards,
            %rewards,
            "done"
        ),
        _ => info!("session ended early, nothing reported"),
    }
    Ok(())
}

async fn seed(parsed: Args, storage: Storage) -> Result<(), Box<dyn std::error::Error>> {
    let path = parsed.file.ok_or(ArgsError::MissingFile)?;
    let raw = std::fs::read_to_string(&path)?;
    let items: Vec<LearningItem> = serde_json::from_str(&raw)?;
    let deck = Deck::from_items(items)?;

    storage.decks.upsert_deck(&deck).await?;
    info!(deck = %deck.id(), items = deck.len(), file = %path.display(), "deck imported");
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means learn.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Learn,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Learn,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing(parsed.verbose);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Learn => learn(parsed, storage).await,
        Command::Seed => seed(parsed, storage).await,
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            // At this layer (binary glue), printing once is fine.
            eprintln!("{err}");
            2
        }
    };
    // A pending stdin read would otherwise keep the runtime from shutting down.
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn parses_learn_flags() {
        let args = parse(
            Command::Learn,
            &[
                "--mode", "quiz", "--deck-id", "4", "--learner", "9", "--seed", "7", "--db",
                "sqlite::memory:",
            ],
        )
        .unwrap();
        assert_eq!(args.mode, SessionMode::Quiz);
        assert_eq!(args.deck_id, DeckId::new(4));
        assert_eq!(args.learner, Some(LearnerId::new(9)));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(Command::Learn, &["--mode", "memory"]),
            Err(ArgsError::InvalidMode(_))
        ));
        assert!(matches!(
            parse(Command::Learn, &["--deck-id", "x"]),
            Err(ArgsError::InvalidId { flag: "--deck-id", .. })
        ));
        assert!(matches!(
            parse(Command::Learn, &["--learner"]),
            Err(ArgsError::MissingValue { flag: "--learner" })
        ));
        assert!(matches!(
            parse(Command::Learn, &["--file", "deck.json"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn report_url_flag_selects_the_http_endpoint() {
        let args = parse(Command::Learn, &["--report-url", "http://site.test/"]).unwrap();
        let config = args.report.unwrap();
        assert_eq!(
            config.endpoint(),
            "http://site.test/flashcards/api/update-deck-progress"
        );
    }

    #[test]
    fn seed_needs_a_file() {
        assert!(matches!(parse(Command::Seed, &[]), Err(ArgsError::MissingFile)));
        let args = parse(Command::Seed, &["--file", "deck.json"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("deck.json")));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/dev.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/dev.sqlite3"));
    }
}
