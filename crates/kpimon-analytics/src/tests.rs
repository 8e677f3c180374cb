use crate::cohort::{retention_curves, RETENTION_OFFSETS};
use crate::revenue::trend_windows;
use chrono::{DateTime, Duration, TimeZone, Utc};
use kpimon_common::types::{FunnelCounts, MetricKind, MetricSnapshot};
use kpimon_storage::SessionRow;

fn make_session(email: &str, signup: DateTime<Utc>, last: DateTime<Utc>) -> SessionRow {
    SessionRow {
        id: kpimon_common::id::next_id(),
        email: email.to_string(),
        completed: true,
        exit_step: None,
        created_at: signup,
        updated_at: last,
    }
}

// ---- metric snapshot ----

#[test]
fn snapshot_matches_known_funnel() {
    // 10 sessions, 4 completed, 2 orders
    let snap = MetricSnapshot::from_counts(FunnelCounts {
        total_sessions: 10,
        completed_sessions: 4,
        total_orders: 2,
    });
    assert_eq!(snap.completion_rate, 40.0);
    assert_eq!(snap.abandoned_rate, 60.0);
    assert_eq!(snap.conversion_rate, 50.0);
}

#[test]
fn snapshot_rates_are_complementary() {
    for total in 1..50u64 {
        for completed in 0..=total {
            let snap = MetricSnapshot::from_counts(FunnelCounts {
                total_sessions: total,
                completed_sessions: completed,
                total_orders: 0,
            });
            let sum = snap.completion_rate + snap.abandoned_rate;
            assert!(
                (sum - 100.0).abs() < 1e-9,
                "completion + abandoned = {sum} for {completed}/{total}"
            );
        }
    }
}

#[test]
fn snapshot_empty_window_is_all_zeros() {
    let snap = MetricSnapshot::from_counts(FunnelCounts::default());
    for kind in MetricKind::ALL {
        let value = snap.value(kind);
        assert_eq!(value, 0.0, "{kind} should be 0 on an empty window");
        assert!(value.is_finite());
    }
}

#[test]
fn snapshot_no_completions_zeroes_conversion() {
    let snap = MetricSnapshot::from_counts(FunnelCounts {
        total_sessions: 5,
        completed_sessions: 0,
        total_orders: 3,
    });
    assert_eq!(snap.conversion_rate, 0.0);
    assert!(!snap.conversion_rate.is_nan());
}

#[test]
fn daily_sessions_uses_fixed_divisor() {
    let snap = MetricSnapshot::from_counts(FunnelCounts {
        total_sessions: 14,
        completed_sessions: 0,
        total_orders: 0,
    });
    assert_eq!(snap.daily_sessions, 2.0);
}

// ---- cohort retention ----

#[test]
fn retention_offset_zero_is_always_full() {
    let signup = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let sessions: Vec<SessionRow> = (0..5)
        .map(|i| make_session(&format!("u{i}@x.com"), signup, signup))
        .collect();

    let curves = retention_curves(&sessions);
    assert_eq!(curves.len(), 1);
    assert_eq!(curves[0].cohort, "2026-03");
    assert_eq!(curves[0].initial_size, 5);
    assert_eq!(curves[0].retention_rates.len(), RETENTION_OFFSETS);
    assert_eq!(curves[0].retention_rates[0], 100.0);
}

#[test]
fn retention_backfills_intervening_offsets() {
    // 10 users signed up in one month; 3 were last active exactly two
    // 30-day periods later, 7 never came back.
    let signup = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
    let mut sessions = Vec::new();
    for i in 0..3 {
        sessions.push(make_session(
            &format!("active{i}@x.com"),
            signup,
            signup + Duration::days(60),
        ));
    }
    for i in 0..7 {
        sessions.push(make_session(&format!("gone{i}@x.com"), signup, signup));
    }

    let curves = retention_curves(&sessions);
    assert_eq!(curves.len(), 1);
    let rates = &curves[0].retention_rates;
    assert_eq!(rates[0], 100.0);
    // The late activity marks offsets 1 and 2, not just 2
    assert_eq!(rates[1], 30.0);
    assert_eq!(rates[2], 30.0);
    assert_eq!(rates[3], 0.0);
    assert_eq!(rates[6], 0.0);
}

#[test]
fn retention_dedupes_users_by_email() {
    let signup = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let sessions = vec![
        make_session("a@x.com", signup, signup),
        make_session("a@x.com", signup + Duration::days(3), signup + Duration::days(40)),
        make_session("b@x.com", signup, signup),
    ];

    let curves = retention_curves(&sessions);
    assert_eq!(curves[0].initial_size, 2);
    assert_eq!(curves[0].retention_rates[1], 50.0);
}

#[test]
fn retention_keeps_only_six_most_recent_cohorts() {
    let mut sessions = Vec::new();
    for month in 1..=9u32 {
        let signup = Utc.with_ymd_and_hms(2026, month, 1, 0, 0, 0).unwrap();
        sessions.push(make_session(&format!("u{month}@x.com"), signup, signup));
    }

    let curves = retention_curves(&sessions);
    assert_eq!(curves.len(), 6);
    assert_eq!(curves.first().unwrap().cohort, "2026-04");
    assert_eq!(curves.last().unwrap().cohort, "2026-09");
}

#[test]
fn retention_caps_offsets_at_curve_length() {
    // Activity two years out must not index past the curve
    let signup = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let sessions = vec![make_session("a@x.com", signup, signup + Duration::days(730))];

    let curves = retention_curves(&sessions);
    assert_eq!(curves[0].retention_rates.len(), RETENTION_OFFSETS);
    assert!(curves[0].retention_rates.iter().all(|r| *r == 100.0));
}

#[test]
fn retention_empty_input_is_empty() {
    assert!(retention_curves(&[]).is_empty());
}

// ---- revenue trend windows ----

#[test]
fn trend_windows_cover_twelve_months_oldest_first() {
    let now = Utc.with_ymd_and_hms(2026, 8, 6, 15, 30, 0).unwrap();
    let windows = trend_windows(now);
    assert_eq!(windows.len(), 12);
    assert_eq!(windows.first().unwrap().0, "2025-09");
    assert_eq!(windows.last().unwrap().0, "2026-08");

    for (label, start, end) in &windows {
        assert!(start < end, "window {label} must be non-empty");
    }

    // Windows tile exactly: each month ends where the next begins
    for pair in windows.windows(2) {
        assert_eq!(pair[0].2, pair[1].1);
    }
}

#[test]
fn trend_windows_handle_year_boundary() {
    let now = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let windows = trend_windows(now);
    assert_eq!(windows.first().unwrap().0, "2025-02");
    assert_eq!(windows.last().unwrap().0, "2026-01");
}
