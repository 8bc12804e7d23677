use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            cache::CacheRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
            transactions::TransactionRepository,
        },
        value_objects::transactions::CreateTransactionModel,
    },
    infra::{
        cache::AppCache,
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                plans::PlanPostgres, subscriptions::SubscriptionPostgres,
                transactions::TransactionPostgres,
            },
        },
    },
    payments::midtrans_client::MidtransClient,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        payment_gateway::PaymentGateway,
        plan_catalog::PlanCatalog,
        reconciliation::{ReconciliationUseCase, WebhookOutcome},
        transactions::{Buyer, TransactionError, TransactionResult, TransactionUseCase},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    cache: Arc<AppCache>,
    cache_ttl: Duration,
    gateway: Arc<MidtransClient>,
) -> Router {
    let plan_catalog = Arc::new(PlanCatalog::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        cache,
        cache_ttl,
    ));
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let transaction_repository = Arc::new(TransactionPostgres::new(Arc::clone(&db_pool)));

    let reconciliation_usecase = Arc::new(ReconciliationUseCase::new(
        Arc::clone(&plan_catalog),
        Arc::clone(&subscription_repository),
        Arc::clone(&transaction_repository),
        Arc::clone(&gateway),
    ));
    let transactions_usecase = TransactionUseCase::new(
        plan_catalog,
        subscription_repository,
        transaction_repository,
        gateway,
        Arc::clone(&reconciliation_usecase),
    );

    let webhook = Router::new()
        .route("/webhook", post(payment_webhook))
        .with_state(reconciliation_usecase);

    Router::new()
        .route("/", post(create_transaction).get(list_transactions))
        .route("/:transaction_id", get(get_transaction))
        .route("/:transaction_id/status", get(check_status))
        .with_state(Arc::new(transactions_usecase))
        .merge(webhook)
}

pub async fn create_transaction<P, S, T, C, G>(
    State(transactions_usecase): State<Arc<TransactionUseCase<P, S, T, C, G>>>,
    auth: AuthUser,
    Json(create_transaction_model): Json<CreateTransactionModel>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let buyer = Buyer {
        user_id: auth.user_id,
        name: auth.name,
        email: auth.email,
    };
    let response = transactions_usecase
        .create_transaction(buyer, create_transaction_model)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_transactions<P, S, T, C, G>(
    State(transactions_usecase): State<Arc<TransactionUseCase<P, S, T, C, G>>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let transactions = transactions_usecase
        .list_transactions(auth.user_id, query.page, query.limit)
        .await?;

    Ok(Json(transactions))
}

pub async fn get_transaction<P, S, T, C, G>(
    State(transactions_usecase): State<Arc<TransactionUseCase<P, S, T, C, G>>>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let transaction = transactions_usecase
        .get_transaction(auth.user_id, transaction_id)
        .await?;

    Ok(Json(transaction))
}

pub async fn check_status<P, S, T, C, G>(
    State(transactions_usecase): State<Arc<TransactionUseCase<P, S, T, C, G>>>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let transaction = transactions_usecase
        .check_status(auth.user_id, transaction_id)
        .await?;

    Ok(Json(transaction))
}

/// Unauthenticated; trust comes from the payload signature and the gateway
/// re-query.
pub async fn payment_webhook<P, S, T, C, G>(
    State(reconciliation_usecase): State<Arc<ReconciliationUseCase<P, S, T, C, G>>>,
    body: Bytes,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "payment_webhook: body is not JSON");
            return webhook_response(Err(TransactionError::InvalidWebhook(err.to_string())));
        }
    };

    webhook_response(reconciliation_usecase.handle_webhook(payload).await)
}

/// Anything other than a bad request or a bad signature is acknowledged
/// with 200 so the gateway stops retrying.
pub fn webhook_response(result: TransactionResult<WebhookOutcome>) -> (StatusCode, Json<Value>) {
    match result {
        Ok(outcome) => {
            info!(outcome = ?outcome, "payment_webhook: handled");
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
        Err(TransactionError::TransactionNotFound) => {
            (StatusCode::OK, Json(json!({ "status": "ignored" })))
        }
        Err(TransactionError::InvalidSignature) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": "error", "message": "invalid signature" })),
        ),
        Err(TransactionError::InvalidWebhook(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": message })),
        ),
        Err(err) => {
            error!(error = ?err, "payment_webhook: processing failed");
            (StatusCode::OK, Json(json!({ "status": "error" })))
        }
    }
}
