use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crates::{
    domain::{
        entities::transactions::{InsertTransactionEntity, TransactionEntity},
        repositories::{
            cache::CacheRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
            transactions::TransactionRepository,
        },
        value_objects::{
            enums::transaction_statuses::TransactionStatus,
            pagination::{PageRequest, Paginated, Pagination},
            transactions::{CreateTransactionModel, CreateTransactionResponse},
        },
    },
    payments::midtrans_client::{SnapCustomerDetail, SnapItemDetail, SnapTransactionRequest},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    payment_gateway::PaymentGateway, plan_catalog::PlanCatalog,
    reconciliation::ReconciliationUseCase,
};

/// How long a hosted payment session stays payable.
pub const TRANSACTION_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("plan is not available for purchase")]
    PlanNotAvailable,
    #[error("an active subscription for this plan already exists")]
    ActiveSubscriptionExists,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TransactionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            TransactionError::PlanNotAvailable | TransactionError::InvalidWebhook(_) => {
                StatusCode::BAD_REQUEST
            }
            TransactionError::ActiveSubscriptionExists => StatusCode::CONFLICT,
            TransactionError::TransactionNotFound => StatusCode::NOT_FOUND,
            TransactionError::InvalidSignature => StatusCode::UNAUTHORIZED,
            TransactionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type TransactionResult<T> = std::result::Result<T, TransactionError>;

/// The authenticated caller making a purchase.
#[derive(Debug, Clone)]
pub struct Buyer {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// `CAREERLY-{plan prefix}-{user prefix}-{unix millis}`.
pub fn order_id_for(plan_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> String {
    let plan = plan_id.simple().to_string();
    let user = user_id.simple().to_string();
    format!(
        "CAREERLY-{}-{}-{}",
        &plan[..8],
        &user[..8],
        now.timestamp_millis()
    )
}

pub struct TransactionUseCase<P, S, T, C, G>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    plan_catalog: Arc<PlanCatalog<P, C>>,
    subscription_repo: Arc<S>,
    transaction_repo: Arc<T>,
    gateway: Arc<G>,
    reconciliation: Arc<ReconciliationUseCase<P, S, T, C, G>>,
}

impl<P, S, T, C, G> TransactionUseCase<P, S, T, C, G>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    T: TransactionRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        plan_catalog: Arc<PlanCatalog<P, C>>,
        subscription_repo: Arc<S>,
        transaction_repo: Arc<T>,
        gateway: Arc<G>,
        reconciliation: Arc<ReconciliationUseCase<P, S, T, C, G>>,
    ) -> Self {
        Self {
            plan_catalog,
            subscription_repo,
            transaction_repo,
            gateway,
            reconciliation,
        }
    }

    pub async fn create_transaction(
        &self,
        buyer: Buyer,
        model: CreateTransactionModel,
    ) -> TransactionResult<CreateTransactionResponse> {
        self.create_transaction_at(buyer, model, Utc::now()).await
    }

    /// The amount sent to the gateway and stored is always the plan's price.
    pub async fn create_transaction_at(
        &self,
        buyer: Buyer,
        model: CreateTransactionModel,
        now: DateTime<Utc>,
    ) -> TransactionResult<CreateTransactionResponse> {
        let user_id = buyer.user_id;
        let plan_id = model.plan_id;

        let plan = self
            .plan_catalog
            .get(plan_id)
            .await
            .map_err(|err| {
                error!(%user_id, %plan_id, db_error = ?err, "transactions: failed to load plan");
                TransactionError::Internal(err)
            })?
            .filter(|plan| plan.is_purchasable())
            .ok_or_else(|| {
                info!(%user_id, %plan_id, "transactions: plan not purchasable");
                TransactionError::PlanNotAvailable
            })?;

        let active = self
            .subscription_repo
            .find_active_by_user_id(user_id, now)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "transactions: failed to load active subscription");
                TransactionError::Internal(err)
            })?;
        if active.is_some_and(|subscription| subscription.plan_id == plan.id) {
            info!(%user_id, %plan_id, "transactions: plan already active for user");
            return Err(TransactionError::ActiveSubscriptionExists);
        }

        let order_id = order_id_for(plan.id, user_id, now);
        let request = SnapTransactionRequest {
            order_id: order_id.clone(),
            gross_amount: plan.price,
            item_details: vec![SnapItemDetail {
                id: plan.id.to_string(),
                name: plan.display_name.clone(),
                price: plan.price,
                quantity: 1,
            }],
            customer_details: SnapCustomerDetail {
                first_name: buyer.name,
                email: buyer.email,
            },
        };

        let session = self
            .gateway
            .create_hosted_session(request)
            .await
            .map_err(|err| {
                error!(%user_id, %order_id, gateway_error = ?err, "transactions: failed to create payment session");
                TransactionError::Internal(err)
            })?;

        let transaction = self
            .transaction_repo
            .insert(InsertTransactionEntity {
                user_id,
                plan_id: plan.id,
                order_id: order_id.clone(),
                gross_amount: plan.price,
                status: TransactionStatus::Pending.to_string(),
                session_token: Some(session.token.clone()),
                redirect_url: Some(session.redirect_url.clone()),
                expired_at: Some(now + Duration::hours(TRANSACTION_TTL_HOURS)),
            })
            .await
            .map_err(|err| {
                error!(%user_id, %order_id, db_error = ?err, "transactions: failed to insert transaction");
                TransactionError::Internal(err)
            })?;

        info!(
            %user_id,
            %order_id,
            transaction_id = %transaction.id,
            gross_amount = transaction.gross_amount,
            "transactions: transaction created"
        );

        Ok(CreateTransactionResponse {
            transaction,
            session_token: session.token,
            redirect_url: session.redirect_url,
            client_key: self.gateway.client_key(),
        })
    }

    /// Another user's transaction is reported as missing.
    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> TransactionResult<TransactionEntity> {
        let transaction = self
            .transaction_repo
            .find_by_id(transaction_id)
            .await
            .map_err(|err| {
                error!(%user_id, %transaction_id, db_error = ?err, "transactions: failed to load transaction");
                TransactionError::Internal(err)
            })?
            .ok_or(TransactionError::TransactionNotFound)?;

        if transaction.user_id != user_id {
            warn!(%user_id, %transaction_id, "transactions: transaction owned by another user");
            return Err(TransactionError::TransactionNotFound);
        }

        Ok(transaction)
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> TransactionResult<Paginated<TransactionEntity>> {
        let page = PageRequest::normalize(page, limit);

        let total = self
            .transaction_repo
            .count_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "transactions: failed to count transactions");
                TransactionError::Internal(err)
            })?;

        let items = self
            .transaction_repo
            .list_by_user_id(user_id, page.limit, page.offset())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "transactions: failed to list transactions");
                TransactionError::Internal(err)
            })?;

        Ok(Paginated {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Ownership-checked live poll of the gateway.
    pub async fn check_status(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> TransactionResult<TransactionEntity> {
        let transaction = self.get_transaction(user_id, transaction_id).await?;
        self.reconciliation.refresh(transaction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::{
        payment_gateway::MockPaymentGateway,
        test_support::{CLIENT_KEY, FakeGateway, InMemoryCache, InMemoryStore, sample_plan},
    };
    use chrono::TimeZone;
    use crates::{
        domain::value_objects::enums::subscription_statuses::SubscriptionStatus,
        payments::midtrans_client::SnapSession,
    };

    type StoreTransactions<G> =
        TransactionUseCase<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryCache, G>;

    fn transaction_usecase<G>(store: &Arc<InMemoryStore>, gateway: Arc<G>) -> StoreTransactions<G>
    where
        G: PaymentGateway + Send + Sync + 'static,
    {
        let catalog = Arc::new(PlanCatalog::new(
            Arc::clone(store),
            Arc::new(InMemoryCache::default()),
            std::time::Duration::from_secs(300),
        ));
        let reconciliation = Arc::new(ReconciliationUseCase::new(
            Arc::clone(&catalog),
            Arc::clone(store),
            Arc::clone(store),
            Arc::clone(&gateway),
        ));
        TransactionUseCase::new(
            catalog,
            Arc::clone(store),
            Arc::clone(store),
            gateway,
            reconciliation,
        )
    }

    fn buyer(user_id: Uuid) -> Buyer {
        Buyer {
            user_id,
            name: Some("Ayu".into()),
            email: Some("ayu@example.com".into()),
        }
    }

    #[tokio::test]
    async fn gateway_is_asked_for_the_stored_price() {
        let plan = sample_plan("pro", 150000, None);
        let plan_id = plan.id;
        let store = Arc::new(InMemoryStore::new().with_plan(plan));
        let user_id = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_hosted_session()
            .withf(|request| {
                request.gross_amount == 150000
                    && request.item_details.len() == 1
                    && request.item_details[0].price == 150000
                    && request.item_details[0].quantity == 1
            })
            .times(1)
            .returning(|request| {
                Ok(SnapSession {
                    token: "snap-token".into(),
                    redirect_url: format!("https://pay.test/{}", request.order_id),
                })
            });
        gateway
            .expect_client_key()
            .return_const("SB-Mid-client-abc".to_string());

        let usecase = transaction_usecase(&store, Arc::new(gateway));
        let response = usecase
            .create_transaction_at(buyer(user_id), CreateTransactionModel { plan_id }, now)
            .await
            .unwrap();

        let transaction = response.transaction;
        assert_eq!(transaction.gross_amount, 150000);
        assert_eq!(transaction.status(), TransactionStatus::Pending);
        assert_eq!(transaction.expired_at, Some(now + Duration::hours(24)));
        assert_eq!(response.session_token, "snap-token");
        assert_eq!(response.client_key, "SB-Mid-client-abc");
        assert_eq!(
            transaction.order_id,
            order_id_for(plan_id, user_id, now)
        );
        assert_eq!(store.transactions().len(), 1);
    }

    #[test]
    fn purchase_request_accepts_no_amount() {
        let plan_id = Uuid::new_v4();
        let with_amount = serde_json::json!({ "plan_id": plan_id, "gross_amount": 1 });

        assert!(serde_json::from_value::<CreateTransactionModel>(with_amount).is_err());
        assert!(
            serde_json::from_value::<CreateTransactionModel>(serde_json::json!({ "plan_id": plan_id }))
                .is_ok()
        );
    }

    #[test]
    fn order_id_embeds_prefixes_and_millis() {
        let plan_id = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000000").unwrap();
        let user_id = Uuid::parse_str("5e6f7a8b-0000-4000-8000-000000000000").unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        assert_eq!(
            order_id_for(plan_id, user_id, now),
            "CAREERLY-1a2b3c4d-5e6f7a8b-1700000000000"
        );
    }

    #[tokio::test]
    async fn free_inactive_and_unknown_plans_are_not_sold() {
        let free = sample_plan("free", 0, Some(1));
        let mut retired = sample_plan("legacy", 90000, None);
        retired.is_active = false;
        let (free_id, retired_id) = (free.id, retired.id);
        let store = Arc::new(InMemoryStore::new().with_plan(free).with_plan(retired));
        let gateway = Arc::new(FakeGateway::new());
        let usecase = transaction_usecase(&store, Arc::clone(&gateway));

        for plan_id in [free_id, retired_id, Uuid::new_v4()] {
            let result = usecase
                .create_transaction(buyer(Uuid::new_v4()), CreateTransactionModel { plan_id })
                .await;
            assert!(matches!(result, Err(TransactionError::PlanNotAvailable)));
        }

        assert!(gateway.sessions().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn same_plan_cannot_be_bought_twice() {
        let basic = sample_plan("basic", 50000, None);
        let pro = sample_plan("pro", 150000, None);
        let (basic_id, pro_id) = (basic.id, pro.id);
        let store = Arc::new(InMemoryStore::new().with_plan(basic).with_plan(pro));
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        store.add_subscription(user_id, basic_id, now - Duration::days(1), now + Duration::days(29));
        let usecase = transaction_usecase(&store, Arc::new(FakeGateway::new()));

        let same = usecase
            .create_transaction(buyer(user_id), CreateTransactionModel { plan_id: basic_id })
            .await;
        assert!(matches!(same, Err(TransactionError::ActiveSubscriptionExists)));

        let upgrade = usecase
            .create_transaction(buyer(user_id), CreateTransactionModel { plan_id: pro_id })
            .await;
        assert!(upgrade.is_ok());
    }

    #[tokio::test]
    async fn purchase_response_carries_the_popup_client_key() {
        let plan = sample_plan("pro", 150000, None);
        let plan_id = plan.id;
        let store = Arc::new(InMemoryStore::new().with_plan(plan));
        let usecase = transaction_usecase(&store, Arc::new(FakeGateway::new()));

        let response = usecase
            .create_transaction(buyer(Uuid::new_v4()), CreateTransactionModel { plan_id })
            .await
            .unwrap();

        assert_eq!(response.client_key, CLIENT_KEY);
        assert_eq!(response.session_token, format!("token-{}", response.transaction.order_id));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_no_transaction() {
        let plan = sample_plan("pro", 150000, None);
        let plan_id = plan.id;
        let store = Arc::new(InMemoryStore::new().with_plan(plan));
        let gateway = Arc::new(FakeGateway::new());
        gateway.fail_sessions();
        let usecase = transaction_usecase(&store, gateway);

        let result = usecase
            .create_transaction(buyer(Uuid::new_v4()), CreateTransactionModel { plan_id })
            .await;

        assert!(matches!(result, Err(TransactionError::Internal(_))));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn foreign_transaction_is_not_found() {
        let plan = sample_plan("pro", 150000, None);
        let plan_id = plan.id;
        let store = Arc::new(InMemoryStore::new().with_plan(plan));
        let owner = Uuid::new_v4();
        let usecase = transaction_usecase(&store, Arc::new(FakeGateway::new()));

        let created = usecase
            .create_transaction(buyer(owner), CreateTransactionModel { plan_id })
            .await
            .unwrap();
        let transaction_id = created.transaction.id;

        assert!(usecase.get_transaction(owner, transaction_id).await.is_ok());
        assert!(matches!(
            usecase.get_transaction(Uuid::new_v4(), transaction_id).await,
            Err(TransactionError::TransactionNotFound)
        ));
        assert!(matches!(
            usecase.check_status(Uuid::new_v4(), transaction_id).await,
            Err(TransactionError::TransactionNotFound)
        ));
    }

    #[tokio::test]
    async fn lists_only_own_transactions_paginated() {
        let basic = sample_plan("basic", 50000, None);
        let pro = sample_plan("pro", 150000, None);
        let (basic_id, pro_id) = (basic.id, pro.id);
        let store = Arc::new(InMemoryStore::new().with_plan(basic).with_plan(pro));
        let user_id = Uuid::new_v4();
        let usecase = transaction_usecase(&store, Arc::new(FakeGateway::new()));
        let start = Utc::now();

        for (offset, plan_id) in [basic_id, pro_id, basic_id].into_iter().enumerate() {
            usecase
                .create_transaction_at(
                    buyer(user_id),
                    CreateTransactionModel { plan_id },
                    start + Duration::milliseconds(offset as i64),
                )
                .await
                .unwrap();
        }
        usecase
            .create_transaction(buyer(Uuid::new_v4()), CreateTransactionModel { plan_id: pro_id })
            .await
            .unwrap();

        let page = usecase
            .list_transactions(user_id, Some(1), Some(2))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.items.iter().all(|t| t.user_id == user_id));
    }

    #[tokio::test]
    async fn status_poll_activates_paid_subscription() {
        let plan = sample_plan("pro", 150000, Some(5));
        let plan_id = plan.id;
        let store = Arc::new(InMemoryStore::new().with_plan(plan));
        let gateway = Arc::new(FakeGateway::new());
        let user_id = Uuid::new_v4();
        let usecase = transaction_usecase(&store, Arc::clone(&gateway));

        let created = usecase
            .create_transaction(buyer(user_id), CreateTransactionModel { plan_id })
            .await
            .unwrap();
        let transaction_id = created.transaction.id;

        let pending = usecase.check_status(user_id, transaction_id).await.unwrap();
        assert_eq!(pending.status(), TransactionStatus::Pending);
        assert!(pending.subscription_id.is_none());

        gateway.set_status(&created.transaction.order_id, "settlement", "");
        let paid = usecase.check_status(user_id, transaction_id).await.unwrap();

        assert_eq!(paid.status(), TransactionStatus::Success);
        assert!(paid.paid_at.is_some());
        let subscriptions = store.subscriptions_for(user_id);
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].status(), SubscriptionStatus::Active);
        assert_eq!(paid.subscription_id, Some(subscriptions[0].id));
    }
}
