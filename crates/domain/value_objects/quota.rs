use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::value_objects::plans::Limit;

/// First day of the UTC calendar month containing `now`; the quota period key.
pub fn period_month(now: DateTime<Utc>) -> NaiveDate {
    let date = now.date_naive();
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureQuota {
    pub max: Limit,
    pub used: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserQuota {
    pub plan_name: String,
    pub resume: FeatureQuota,
    pub ats_check: FeatureQuota,
    pub interview: FeatureQuota,
}
