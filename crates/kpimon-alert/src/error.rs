/// Errors surfaced by the alerting subsystem.
///
/// # Examples
///
/// ```rust
/// use kpimon_alert::error::AlertError;
///
/// let err = AlertError::Validation("'threshold' is required".to_string());
/// assert!(err.to_string().contains("threshold"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// A rule-creation or rule-update request is missing a required field
    /// or carries a malformed value. Raised before any store access.
    #[error("alert: invalid rule: {0}")]
    Validation(String),

    /// The referenced rule ID does not exist.
    #[error("alert: {0}")]
    NotFound(String),

    /// The rule or history store failed.
    #[error("alert: storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Convenience `Result` alias for alerting operations.
pub type Result<T> = std::result::Result<T, AlertError>;
