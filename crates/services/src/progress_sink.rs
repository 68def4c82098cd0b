//! Where completion reports go once a session ends.

use std::env;
use std::sync::{Arc, Mutex};

use flashcard_core::Clock;
use flashcard_core::model::ProgressReport;
use reqwest::Client;
use serde_json::Value;
use storage::repository::ProgressRepository;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ProgressSinkError;
use crate::ports::ProgressSink;

/// Path of the progress endpoint, relative to the site root.
pub const PROGRESS_PATH: &str = "/flashcards/api/update-deck-progress";

/// Set to `1` or `true` to post the learner under the older `child_id` key.
pub const LEGACY_CHILD_ID_ENV: &str = "FLASHCARD_REPORT_CHILD_ID";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressSinkConfig {
    pub base_url: String,
    /// Post `child_id` instead of `learner_id`, for sites still on the old
    /// endpoint.
    pub legacy_child_id: bool,
}

impl ProgressSinkConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            legacy_child_id: false,
        }
    }

    #[must_use]
    pub fn with_legacy_child_id(mut self, legacy: bool) -> Self {
        self.legacy_child_id = legacy;
        self
    }

    /// Reads `FLASHCARD_REPORT_URL`; unset or blank disables HTTP reporting.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("FLASHCARD_REPORT_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url.trim()).with_legacy_child_id(legacy_child_id_from_env()))
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{PROGRESS_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// The JSON body for one report under the configured field names.
    ///
    /// # Errors
    ///
    /// Returns `ProgressSinkError::Encode` if the report cannot be serialized.
    pub fn body(&self, report: &ProgressReport) -> Result<Value, ProgressSinkError> {
        let mut body = serde_json::to_value(report)?;
        if let Some(fields) = body.as_object_mut().filter(|_| self.legacy_child_id) {
            let learner = fields.remove("learner_id").unwrap_or(Value::Null);
            fields.insert("child_id".to_owned(), learner);
        }
        Ok(body)
    }
}

#[must_use]
pub fn legacy_child_id_from_env() -> bool {
    env::var(LEGACY_CHILD_ID_ENV)
        .is_ok_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Background deliveries still in flight.
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<Vec<JoinHandle<()>>>>);

impl InFlight {
    fn push(&self, task: JoinHandle<()>) {
        if let Ok(mut guard) = self.0.lock() {
            guard.retain(|t| !t.is_finished());
            guard.push(task);
        }
    }

    async fn drain(&self) {
        let tasks = self
            .0
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "progress delivery task aborted");
            }
        }
    }
}

//
// ─── HTTP ──────────────────────────────────────────────────────────────────────
//

/// Posts reports as JSON to the site's progress endpoint.
///
/// `submit` never waits: the request runs on the runtime handle and any
/// failure is logged and dropped.
#[derive(Clone)]
pub struct HttpProgressSink {
    client: Client,
    config: Option<ProgressSinkConfig>,
    runtime: Handle,
    in_flight: InFlight,
}

impl HttpProgressSink {
    #[must_use]
    pub fn from_env(runtime: Handle) -> Self {
        Self::new(ProgressSinkConfig::from_env(), runtime)
    }

    #[must_use]
    pub fn new(config: Option<ProgressSinkConfig>, runtime: Handle) -> Self {
        Self {
            client: Client::new(),
            config,
            runtime,
            in_flight: InFlight::default(),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Send one report and wait for the answer.
    ///
    /// # Errors
    ///
    /// Returns `ProgressSinkError` when the sink is disabled, the request
    /// fails, or the endpoint answers with a non-success status.
    pub async fn send(&self, report: &ProgressReport) -> Result<(), ProgressSinkError> {
        let config = self.config.as_ref().ok_or(ProgressSinkError::Disabled)?;

        let response = self
            .client
            .post(config.endpoint())
            .json(&config.body(report)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProgressSinkError::HttpStatus(response.status()));
        }
        Ok(())
    }

    /// Waits for every report submitted so far.
    pub async fn flush(&self) {
        self.in_flight.drain().await;
    }
}

impl ProgressSink for HttpProgressSink {
    fn submit(&self, report: ProgressReport) {
        if !self.enabled() {
            debug!(deck = %report.deck_id, "progress endpoint not configured, report dropped");
            return;
        }
        let sink = self.clone();
        let task = self.runtime.spawn(async move {
            match sink.send(&report).await {
                Ok(()) => info!(deck = %report.deck_id, stars = report.stars, "progress reported"),
                Err(err) => warn!(deck = %report.deck_id, error = %err, "progress report dropped"),
            }
        });
        self.in_flight.push(task);
    }
}

//
// ─── LOCAL ─────────────────────────────────────────────────────────────────────
//

/// Folds reports into a local progress repository.
#[derive(Clone)]
pub struct StoredProgressSink {
    repo: Arc<dyn ProgressRepository>,
    clock: Clock,
    runtime: Handle,
    in_flight: InFlight,
}

impl StoredProgressSink {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>, clock: Clock, runtime: Handle) -> Self {
        Self {
            repo,
            clock,
            runtime,
            in_flight: InFlight::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressSinkError::Storage` when the repository rejects the report.
    pub async fn record(&self, report: &ProgressReport) -> Result<(), ProgressSinkError> {
        let progress = self.repo.record_completion(report, self.clock.now()).await?;
        info!(
            deck = %progress.deck_id,
            learner = %progress.learner_id,
            total_score = progress.total_score,
            streak_days = progress.streak_days,
            "progress stored"
        );
        Ok(())
    }

    pub async fn flush(&self) {
        self.in_flight.drain().await;
    }
}

impl ProgressSink for StoredProgressSink {
    fn submit(&self, report: ProgressReport) {
        if report.learner_id.is_none() {
            debug!(deck = %report.deck_id, "anonymous session, progress not stored");
            return;
        }
        let sink = self.clone();
        let task = self.runtime.spawn(async move {
            if let Err(err) = sink.record(&report).await {
                warn!(deck = %report.deck_id, error = %err, "progress not stored");
            }
        });
        self.in_flight.push(task);
    }
}

/// Drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn submit(&self, report: ProgressReport) {
        debug!(deck = %report.deck_id, "progress reporting disabled");
    }
}
