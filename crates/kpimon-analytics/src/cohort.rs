use chrono::Datelike;
use kpimon_storage::SessionRow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Number of month offsets reported per cohort (offsets `0..=6`).
pub const RETENTION_OFFSETS: usize = 7;

/// How many trailing cohort months are returned.
const MAX_COHORTS: usize = 6;

/// One signup-month cohort with its retention curve.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CohortRow {
    /// 注册月份（%Y-%m）
    pub cohort: String,
    /// 该月注册的去重用户数
    pub initial_size: u64,
    /// 各月偏移的留存率（%），下标 0..=6
    pub retention_rates: Vec<f64>,
}

/// Computes per-cohort retention curves from the full session history.
///
/// Users are bucketed by the calendar month of their signup. A user whose
/// last activity is `m` 30-day periods after signup counts as retained at
/// every offset in `[0, m]`, not just at `m`: one late activity fills all
/// intervening offsets. Offset 0 is therefore 100% for every non-empty
/// cohort. Only the most recent six cohort months are returned, oldest
/// first.
pub fn retention_curves(sessions: &[SessionRow]) -> Vec<CohortRow> {
    // cohort key -> (users, retained[offset] -> users)
    type Bucket = (HashSet<String>, Vec<HashSet<String>>);
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

    for session in sessions {
        let key = format!(
            "{:04}-{:02}",
            session.created_at.year(),
            session.created_at.month()
        );
        let (users, retained) = buckets
            .entry(key)
            .or_insert_with(|| (HashSet::new(), vec![HashSet::new(); RETENTION_OFFSETS]));

        users.insert(session.email.clone());

        let months_diff = (session.updated_at - session.created_at).num_days().max(0) / 30;
        let last_offset = (months_diff as usize).min(RETENTION_OFFSETS - 1);
        for slot in retained.iter_mut().take(last_offset + 1) {
            slot.insert(session.email.clone());
        }
    }

    // BTreeMap iterates keys ascending; "%Y-%m" sorts chronologically.
    let skip = buckets.len().saturating_sub(MAX_COHORTS);
    buckets
        .into_iter()
        .skip(skip)
        .map(|(cohort, (users, retained))| {
            let size = users.len();
            let retention_rates = retained
                .iter()
                .map(|r| {
                    if size == 0 {
                        0.0
                    } else {
                        r.len() as f64 / size as f64 * 100.0
                    }
                })
                .collect();
            CohortRow {
                cohort,
                initial_size: size as u64,
                retention_rates,
            }
        })
        .collect()
}
