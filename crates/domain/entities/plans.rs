use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::value_objects::plans::{DEFAULT_DURATION_DAYS, Limit, PlanLimits},
    infra::db::postgres::schema::plans,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub duration_days: Option<i32>,
    pub limits: PlanLimits,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PlanEntity {
    pub fn duration_days_or_default(&self) -> i32 {
        match self.duration_days {
            Some(days) if days > 0 => days,
            _ => DEFAULT_DURATION_DAYS,
        }
    }

    /// Free plans are granted out of band and cannot be bought.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.price > 0
    }
}

/// Raw row used for Diesel queries. Limit columns are decoded into `PlanLimits`.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub duration_days: Option<i32>,
    pub max_resumes: Option<i32>,
    pub max_ats_checks: Option<i32>,
    pub max_interviews: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PlanRow> for PlanEntity {
    fn from(value: PlanRow) -> Self {
        Self {
            id: value.id,
            name: value.name,
            display_name: value.display_name,
            price: value.price,
            duration_days: value.duration_days,
            limits: PlanLimits {
                max_resumes: Limit::from_column(value.max_resumes),
                max_ats_checks: Limit::from_column(value.max_ats_checks),
                max_interviews: Limit::from_column(value.max_interviews),
            },
            is_active: value.is_active,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = plans)]
pub struct InsertPlanEntity {
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub duration_days: Option<i32>,
    pub max_resumes: Option<i32>,
    pub max_ats_checks: Option<i32>,
    pub max_interviews: Option<i32>,
    pub is_active: bool,
}

/// Full replacement of the editable columns; `None` writes `NULL`.
#[derive(Debug, Clone, AsChangeset, PartialEq)]
#[diesel(table_name = plans, treat_none_as_null = true)]
pub struct PlanChangeset {
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub duration_days: Option<i32>,
    pub max_resumes: Option<i32>,
    pub max_ats_checks: Option<i32>,
    pub max_interviews: Option<i32>,
    pub is_active: bool,
}

impl From<&PlanEntity> for PlanChangeset {
    fn from(value: &PlanEntity) -> Self {
        Self {
            name: value.name.clone(),
            display_name: value.display_name.clone(),
            price: value.price,
            duration_days: value.duration_days,
            max_resumes: value.limits.max_resumes.to_column(),
            max_ats_checks: value.limits.max_ats_checks.to_column(),
            max_interviews: value.limits.max_interviews.to_column(),
            is_active: value.is_active,
        }
    }
}
