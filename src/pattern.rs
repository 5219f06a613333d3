// ============================================================================
// PATTERN LOADING – JSON schemes from HTTP or disk
// ============================================================================
//
// A pattern document is either one cell map
//     {"22,3": "#bfbfbf", "21,4": "#bfbfbf"}
// or an ordered array of them, one per step
//     [{"22,3": "#bfbfbf"}, {"20,4": "#bfbfbf"}]
//
// Loads never touch editor state themselves: callers get a Result and
// decide. The background loader serialises requests, so at most one fetch
// is in flight and results arrive in request order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::cells::PaintedCells;

/// Network timeout for a single pattern fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed pattern JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pattern must be an object or an array of objects (found {found})")]
    Shape { found: &'static str },
}

/// Where a pattern comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternSource {
    Url(String),
    File(PathBuf),
}

impl PatternSource {
    /// `http://` / `https://` strings are URLs, everything else is a path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            PatternSource::Url(raw.to_string())
        } else {
            PatternSource::File(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSource::Url(url) => write!(f, "{}", url),
            PatternSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parse a pattern document into its ordered steps.
pub fn parse_pattern(text: &str) -> Result<Vec<PaintedCells>, PatternError> {
    let doc: Value = serde_json::from_str(text)?;
    match doc {
        Value::Object(_) => Ok(vec![serde_json::from_value(doc)?]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(_) => Ok(serde_json::from_value(item)?),
                other => Err(PatternError::Shape { found: json_kind(&other) }),
            })
            .collect(),
        other => Err(PatternError::Shape { found: json_kind(&other) }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn read_pattern_file(path: &Path) -> Result<Vec<PaintedCells>, PatternError> {
    let text = std::fs::read_to_string(path)?;
    parse_pattern(&text)
}

/// Blocking GET. Non-2xx responses are errors.
pub fn fetch_pattern_url(url: &str) -> Result<Vec<PaintedCells>, PatternError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()?;
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(PatternError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.text()?;
    parse_pattern(&body)
}

pub fn fetch_pattern(source: &PatternSource) -> Result<Vec<PaintedCells>, PatternError> {
    match source {
        PatternSource::Url(url) => fetch_pattern_url(url),
        PatternSource::File(path) => read_pattern_file(path),
    }
}

// ============================================================================
// BACKGROUND LOADER
// ============================================================================

/// A finished load, tagged with what was requested.
#[derive(Debug)]
pub struct LoadOutcome {
    pub source: PatternSource,
    pub result: Result<Vec<PaintedCells>, PatternError>,
}

/// Runs one fetch at a time on the rayon pool; the UI polls each frame.
#[derive(Default)]
pub struct PatternLoader {
    pending: Option<(PatternSource, Receiver<LoadOutcome>)>,
}

impl PatternLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// The source currently being fetched, if any.
    pub fn pending_source(&self) -> Option<&PatternSource> {
        self.pending.as_ref().map(|(s, _)| s)
    }

    /// Start a fetch. Rejected (returns `false`) while another is in flight.
    pub fn request(&mut self, source: PatternSource) -> bool {
        if self.is_busy() {
            log_warn!("Pattern load for {} ignored: another load is in progress", source);
            return false;
        }
        log_info!("Loading pattern from {}", source);
        let (tx, rx) = mpsc::channel();
        let job_source = source.clone();
        rayon::spawn(move || {
            let result = fetch_pattern(&job_source);
            let _ = tx.send(LoadOutcome { source: job_source, result });
        });
        self.pending = Some((source, rx));
        true
    }

    /// Non-blocking check for a finished load.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let (_, rx) = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.pending = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.abandon(),
        }
    }

    /// Block up to `timeout` for the in-flight load.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        let (_, rx) = self.pending.as_ref()?;
        match rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.pending = None;
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.abandon(),
        }
    }

    /// The worker vanished without answering (it panicked).
    fn abandon(&mut self) -> Option<LoadOutcome> {
        if let Some((source, _)) = self.pending.take() {
            log_err!("Pattern load for {} ended without a result", source);
        }
        None
    }
}
