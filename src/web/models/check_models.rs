use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::entities::check::MIN_INTERVAL_SECONDS;
use crate::db::enums::CheckType;

pub const DEFAULT_HISTORY_LIMIT: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheck {
    pub site_id: i32,
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub interval: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCheck {
    #[serde(rename = "type")]
    pub check_type: Option<CheckType>,
    pub interval: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl CreateCheck {
    pub fn validate(&self) -> Result<(), String> {
        validate_interval(self.interval)
    }
}

impl UpdateCheck {
    pub fn validate(&self) -> Result<(), String> {
        validate_interval(self.interval)
    }
}

pub fn validate_interval(interval: Option<i32>) -> Result<(), String> {
    match interval {
        Some(seconds) if seconds < MIN_INTERVAL_SECONDS => Err(format!(
            "Check interval must be at least {MIN_INTERVAL_SECONDS} seconds, got {seconds}"
        )),
        _ => Ok(()),
    }
}
