use crate::model::InboxView;
use thiserror::Error;

/// Errors that may clear up on their own if the operation is attempted again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Failures of the low-level page primitives.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not ready")]
    NotReady,

    #[error("Launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Execution context unavailable: {0}")]
    Context(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// True when the requested element was not on the page, either immediately or
    /// after waiting for it.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::ElementNotFound(_) | Self::Timeout(_))
    }
}

impl Transient for BackendError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Context(_) | Self::Navigation(_)
        )
    }
}

/// Failures of the external text-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Completion service not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion service returned no content")]
    Empty,
}

impl Transient for GenerationError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Request(err) => err.is_timeout() || err.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured(_) | Self::Empty => false,
        }
    }
}

/// Run-level failures. Only `AuthenticationFailure` ends a run; everything else is
/// scoped to a single conversation or inbox view.
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Missing element '{selector}' while {context}")]
    MissingElement { selector: String, context: String },

    #[error("Malformed unread count {text:?} on {view} conversation #{index}")]
    MalformedCount {
        view: InboxView,
        index: usize,
        text: String,
    },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("A run is already in progress")]
    AlreadyRunning,
}

impl InboxError {
    pub fn missing(selector: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingElement {
            selector: selector.into(),
            context: context.into(),
        }
    }
}

impl Transient for InboxError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_transient(),
            Self::Generation(err) => err.is_transient(),
            _ => false,
        }
    }
}
