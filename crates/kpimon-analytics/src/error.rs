/// Errors surfaced by the analytics engine.
///
/// Zero-denominator cases are never errors: they resolve locally to `0.0`
/// inside the calculators. Only store failures and blown deadlines reach
/// this type, and they always carry the stage that failed so a partial
/// aggregate is never passed off as a complete one.
///
/// # Examples
///
/// ```rust
/// use kpimon_analytics::error::AnalyticsError;
///
/// let err = AnalyticsError::Upstream {
///     stage: "revenue_trend",
///     source: anyhow::anyhow!("connection reset"),
/// };
/// assert!(err.to_string().contains("revenue_trend"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// A store query backing one aggregation stage failed.
    #[error("analytics: '{stage}' query failed: {source}")]
    Upstream {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The overall request deadline elapsed before every stage finished.
    #[error("analytics: request deadline exceeded after {timeout_secs}s")]
    DeadlineExceeded { timeout_secs: u64 },
}

impl AnalyticsError {
    pub(crate) fn upstream(stage: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| AnalyticsError::Upstream { stage, source }
    }
}

/// Convenience `Result` alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
