use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::usage;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = usage)]
pub struct UsageEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feature: String,
    pub period_month: NaiveDate,
    pub count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = usage)]
pub struct InsertUsageEntity {
    pub user_id: Uuid,
    pub feature: String,
    pub period_month: NaiveDate,
    pub count: i32,
}
