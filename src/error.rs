use thiserror::Error;

/// Everything that can go wrong while boosting a listing.
///
/// Variants carry display-ready messages so the orchestrator can surface them
/// verbatim in its error field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoostError {
    #[error("Please log in first.")]
    AuthRequired,
    #[error("{0}")]
    Load(String),
    #[error("{0}")]
    Initiation(String),
    #[error("Payment failed")]
    Widget,
    #[error("{0}")]
    PollCheck(String),
    #[error("Timed out waiting for the boost to activate. Please check the franchise details.")]
    PollTimeout,
    #[error("Unknown boost package '{0}' (expected 7, 14 or 30)")]
    UnknownPackage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BoostError>;
