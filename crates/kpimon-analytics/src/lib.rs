//! Business-health analytics engine.
//!
//! Turns raw behavioral and transactional records (funnel events, sessions,
//! purchases) into scalar health metrics, cohort retention curves, and
//! revenue trends. Pure window math lives in [`calculator`] and [`cohort`];
//! the store-backed aggregations live in [`revenue`] and are orchestrated
//! by [`service::AnalyticsService`] under a single request deadline.

pub mod calculator;
pub mod cohort;
pub mod error;
pub mod revenue;
pub mod service;

#[cfg(test)]
mod tests;

pub use calculator::funnel_counts;
pub use cohort::{retention_curves, CohortRow, RETENTION_OFFSETS};
pub use error::{AnalyticsError, Result};
pub use revenue::{MonthRevenue, RefundSummary, RevenueReport};
pub use service::{AnalyticsConfig, AnalyticsOverview, AnalyticsService, EmailSummary};
