use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::transactions::TransactionEntity;

/// Purchase request body. Carries no amount: the price always comes from the plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTransactionModel {
    pub plan_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTransactionResponse {
    pub transaction: TransactionEntity,
    pub session_token: String,
    pub redirect_url: String,
    /// Public key the front-end hands to the Snap popup.
    pub client_key: String,
}
