//! Error types for arplace-rs.

use thiserror::Error;

/// The main error type for arplace-rs operations.
#[derive(Error, Debug)]
pub enum ArError {
    /// The host exposes no immersive-AR session interface, or the support query rejected.
    #[error("immersive AR is not supported: {0}")]
    UnsupportedEnvironment(String),

    /// The host rejected the session request (device busy, permission denied, ...).
    #[error("session request failed: {0}")]
    SessionRequestFailed(String),

    /// The reference space could not be obtained. Fatal to the session.
    #[error("reference space request failed: {0}")]
    ReferenceSpaceFailed(String),

    /// A hit-test request rejected.
    #[error("hit test failed: {0}")]
    HitTestFailed(String),

    /// The host refused to schedule the next animation frame.
    #[error("frame scheduling failed: {0}")]
    SchedulingFailed(String),

    /// The session has already ended.
    #[error("session has ended")]
    SessionEnded,

    /// Options failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for arplace-rs operations.
pub type Result<T> = std::result::Result<T, ArError>;
