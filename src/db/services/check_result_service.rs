//! Read side of the probe history: raw history windows and aggregated metrics.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;

use crate::db::entities::{check_result, prelude::*};

/// Window applied to history requests that do not carry an explicit range.
pub const DEFAULT_HISTORY_WINDOW_HOURS: i64 = 24;

/// Optional bounds on a history query; a missing bound is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Both bounds must be given to use an explicit range; otherwise the last
    /// 24 hours ending at `now` are used.
    pub fn for_history(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Self {
                start: Some(start),
                end: Some(end),
            },
            _ => Self {
                start: Some(now - Duration::hours(DEFAULT_HISTORY_WINDOW_HOURS)),
                end: None,
            },
        }
    }

    /// Metrics use an explicit range only when both bounds are present and
    /// the full history otherwise.
    pub fn for_metrics(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Self {
                start: Some(start),
                end: Some(end),
            },
            _ => Self {
                start: None,
                end: None,
            },
        }
    }
}

pub async fn get_results_for_check(
    db: &DatabaseConnection,
    check_id: i32,
    range: TimeRange,
    limit: Option<u64>,
) -> Result<Vec<check_result::Model>, DbErr> {
    let mut query = CheckResult::find().filter(check_result::Column::CheckId.eq(check_id));
    if let Some(start) = range.start {
        query = query.filter(check_result::Column::Timestamp.gte(start));
    }
    if let Some(end) = range.end {
        query = query.filter(check_result::Column::Timestamp.lte(end));
    }

    query
        .order_by_asc(check_result::Column::Timestamp)
        .limit(limit)
        .all(db)
        .await
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMetrics {
    /// Percentage of successful probes.
    pub uptime: f64,
    pub avg_latency: f64,
    /// Percentage of unsuccessful probes.
    pub error_rate: f64,
    pub total_checks: usize,
    pub successful_checks: usize,
    pub results: Vec<check_result::Model>,
}

impl CheckMetrics {
    pub fn from_results(results: Vec<check_result::Model>) -> Self {
        let total_checks = results.len();
        let successful_checks = results
            .iter()
            .filter(|r| is_successful_status(&r.status))
            .count();

        let (uptime, avg_latency, error_rate) = if total_checks == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let total = total_checks as f64;
            let latency_sum: i64 = results.iter().map(|r| r.latency_ms).sum();
            (
                successful_checks as f64 / total * 100.0,
                latency_sum as f64 / total,
                (total_checks - successful_checks) as f64 / total * 100.0,
            )
        };

        Self {
            uptime,
            avg_latency,
            error_rate,
            total_checks,
            successful_checks,
            results,
        }
    }
}

/// A stored status counts as up when it is a 2xx/3xx code or a reachability reply.
pub fn is_successful_status(status: &str) -> bool {
    if status == crate::monitor::outcome::REACHABLE_STATUS {
        return true;
    }
    matches!(status.parse::<u16>(), Ok(code) if (200..400).contains(&code))
}

pub async fn get_metrics_for_check(
    db: &DatabaseConnection,
    check_id: i32,
    range: TimeRange,
) -> Result<CheckMetrics, DbErr> {
    let results = get_results_for_check(db, check_id, range, None).await?;
    Ok(CheckMetrics::from_results(results))
}
