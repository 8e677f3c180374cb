//! Alert rule evaluation and trigger bookkeeping.
//!
//! Rules are admin-defined threshold conditions over the funnel health
//! metrics. A check run loads every enabled rule, evaluates it against one
//! [`MetricSnapshot`](kpimon_common::types::MetricSnapshot), and records
//! each trigger (history row + rule counters) in a single transaction.

pub mod checker;
pub mod error;
pub mod evaluator;
pub mod rules;

#[cfg(test)]
mod tests;

pub use checker::AlertChecker;
pub use error::{AlertError, Result};
pub use evaluator::{evaluate_condition, evaluate_rule, render_message, Evaluation};
