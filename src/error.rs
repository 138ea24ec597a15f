//! Error types shared by the quiz core and the browser glue.

use thiserror::Error;

/// Failure while fetching or parsing grade / word data.
///
/// A load failure aborts only the requested operation; records that were
/// already loaded stay intact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed: {url} (HTTP {status})")]
    Http { url: String, status: u16 },

    #[error("fetch failed: {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} is not valid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{url} is not a JSON array")]
    NotJsonArray { url: String },

    #[error("failed to parse words CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("words CSV missing required column \"{column}\". Found: {found}")]
    MissingColumn { column: &'static str, found: String },

    #[error("no data file for grade {0}")]
    UnknownGrade(u8),
}

/// Precondition failure when starting a game. No game state is mutated.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Enable at least one grade in Settings.")]
    NoGradesEnabled,

    #[error("Not enough kanji in selected pool ({size}, need {required}). Enable more grades.")]
    PoolTooSmall { size: usize, required: usize },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Input rejected by the session state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("no game in progress")]
    NotActive,

    #[error("input is locked until the next question")]
    Locked,

    #[error("answers are disabled while peeking")]
    PeekActive,

    #[error("the current question does not accept this action")]
    WrongQuestionKind,

    #[error("peek is not available for drag-word questions")]
    PeekUnsupported,

    #[error("choice index {0} is out of range")]
    OutOfRange(usize),

    #[error("a drag gesture is already active")]
    DragInProgress,

    #[error("no drag gesture is active")]
    NoActiveDrag,

    #[error("pointer {got} does not own the active drag (owner {owner})")]
    PointerMismatch { owner: i32, got: i32 },

    #[error("history entry {0} does not exist")]
    NoHistoryEntry(usize),
}

/// Failure inside the offline cache layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("network request for {key} failed: {message}")]
    Network { key: String, message: String },

    #[error("network request for {key} returned HTTP {status}")]
    Status { key: String, status: u16 },

    #[error("cache storage failure: {0}")]
    Storage(String),
}
