use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::transaction_statuses::TransactionStatus,
    infra::db::postgres::schema::transactions,
};

/// One payment attempt. Gateway bookkeeping columns are kept out of API responses.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Serialize, PartialEq)]
#[diesel(table_name = transactions)]
pub struct TransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub order_id: String,
    #[serde(skip)]
    pub gateway_transaction_id: Option<String>,
    pub gross_amount: i64,
    pub payment_type: Option<String>,
    pub payment_method: Option<String>,
    pub status: String,
    #[serde(skip)]
    pub gateway_transaction_status: Option<String>,
    #[serde(skip)]
    pub fraud_status: Option<String>,
    #[serde(skip)]
    pub session_token: Option<String>,
    pub redirect_url: Option<String>,
    #[serde(skip)]
    pub gateway_raw_response: Option<serde_json::Value>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionEntity {
    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = transactions)]
pub struct InsertTransactionEntity {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub order_id: String,
    pub gross_amount: i64,
    pub status: String,
    pub session_token: Option<String>,
    pub redirect_url: Option<String>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// Fields written by one reconciliation pass. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, AsChangeset, PartialEq)]
#[diesel(table_name = transactions)]
pub struct ReconcileTransactionEntity {
    pub status: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub gateway_transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub gateway_raw_response: Option<serde_json::Value>,
    pub paid_at: Option<DateTime<Utc>>,
    pub subscription_id: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}
