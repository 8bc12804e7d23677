//! In-memory doubles shared by the use-case tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crates::{
    domain::{
        entities::{
            plans::{InsertPlanEntity, PlanChangeset, PlanEntity},
            subscriptions::SubscriptionEntity,
            transactions::{InsertTransactionEntity, ReconcileTransactionEntity, TransactionEntity},
            usages::UsageEntity,
        },
        repositories::{
            cache::CacheRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
            transactions::TransactionRepository, usages::UsageRepository,
        },
        value_objects::{
            enums::{features::Feature, subscription_statuses::SubscriptionStatus},
            plans::{Limit, PlanLimits},
            subscriptions::{ActivationOutcome, SubscriptionActivation},
        },
    },
    payments::midtrans_client::{
        GatewayTransactionStatus, MidtransClient, MidtransConfig, SnapSession,
        SnapTransactionRequest,
    },
};
use uuid::Uuid;

use crate::usecases::payment_gateway::PaymentGateway;

pub const SERVER_KEY: &str = "SB-Mid-server-test";
pub const CLIENT_KEY: &str = "SB-Mid-client-test";

pub fn sample_plan(name: &str, price: i64, max_resumes: Option<i32>) -> PlanEntity {
    PlanEntity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        display_name: name.to_uppercase(),
        price,
        duration_days: Some(30),
        limits: PlanLimits {
            max_resumes: Limit::from_column(max_resumes),
            max_ats_checks: Limit::Unlimited,
            max_interviews: Limit::Unlimited,
        },
        is_active: true,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
struct StoreState {
    plans: HashMap<Uuid, PlanEntity>,
    deleted_plans: Vec<Uuid>,
    subscriptions: Vec<SubscriptionEntity>,
    usage: HashMap<(Uuid, Feature, NaiveDate), UsageEntity>,
    transactions: Vec<TransactionEntity>,
}

/// One store behind every repository trait, so scenario tests observe the
/// same state the use cases mutate.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    writes: AtomicUsize,
    fail_next_reconciliation: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(self, plan: PlanEntity) -> Self {
        self.state.lock().unwrap().plans.insert(plan.id, plan);
        self
    }

    pub fn add_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> SubscriptionEntity {
        let subscription = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            start_date,
            end_date,
            status: SubscriptionStatus::Active.to_string(),
            created_at: start_date,
        };
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .push(subscription.clone());
        subscription
    }

    pub fn subscriptions_for(&self, user_id: Uuid) -> Vec<SubscriptionEntity> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn transactions(&self) -> Vec<TransactionEntity> {
        self.state.lock().unwrap().transactions.clone()
    }

    pub fn transaction(&self, transaction_id: Uuid) -> Option<TransactionEntity> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned()
    }

    pub fn usage_count(&self, user_id: Uuid, feature: Feature, period_month: NaiveDate) -> i32 {
        self.state
            .lock()
            .unwrap()
            .usage
            .get(&(user_id, feature, period_month))
            .map(|u| u.count)
            .unwrap_or(0)
    }

    /// Number of mutating calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_next_reconciliation(&self) {
        self.fail_next_reconciliation.store(true, Ordering::SeqCst);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlanRepository for InMemoryStore {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let state = self.state.lock().unwrap();
        if state.deleted_plans.contains(&plan_id) {
            return Ok(None);
        }
        Ok(state.plans.get(&plan_id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PlanEntity>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .plans
            .values()
            .find(|p| p.name == name && !state.deleted_plans.contains(&p.id))
            .cloned())
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
        include_inactive: bool,
    ) -> Result<Vec<PlanEntity>> {
        let state = self.state.lock().unwrap();
        let mut plans: Vec<PlanEntity> = state
            .plans
            .values()
            .filter(|p| !state.deleted_plans.contains(&p.id))
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));

        Ok(plans
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, include_inactive: bool) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .plans
            .values()
            .filter(|p| !state.deleted_plans.contains(&p.id))
            .filter(|p| include_inactive || p.is_active)
            .count() as i64)
    }

    async fn insert(&self, insert_plan_entity: InsertPlanEntity) -> Result<PlanEntity> {
        self.record_write();
        let plan = PlanEntity {
            id: Uuid::new_v4(),
            name: insert_plan_entity.name,
            display_name: insert_plan_entity.display_name,
            price: insert_plan_entity.price,
            duration_days: insert_plan_entity.duration_days,
            limits: PlanLimits {
                max_resumes: Limit::from_column(insert_plan_entity.max_resumes),
                max_ats_checks: Limit::from_column(insert_plan_entity.max_ats_checks),
                max_interviews: Limit::from_column(insert_plan_entity.max_interviews),
            },
            is_active: insert_plan_entity.is_active,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .unwrap()
            .plans
            .insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, plan_id: Uuid, changeset: PlanChangeset) -> Result<Option<PlanEntity>> {
        self.record_write();
        let mut state = self.state.lock().unwrap();
        if state.deleted_plans.contains(&plan_id) {
            return Ok(None);
        }
        let Some(plan) = state.plans.get_mut(&plan_id) else {
            return Ok(None);
        };

        plan.name = changeset.name;
        plan.display_name = changeset.display_name;
        plan.price = changeset.price;
        plan.duration_days = changeset.duration_days;
        plan.limits = PlanLimits {
            max_resumes: Limit::from_column(changeset.max_resumes),
            max_ats_checks: Limit::from_column(changeset.max_ats_checks),
            max_interviews: Limit::from_column(changeset.max_interviews),
        };
        plan.is_active = changeset.is_active;

        Ok(Some(plan.clone()))
    }

    async fn soft_delete(&self, plan_id: Uuid) -> Result<bool> {
        self.record_write();
        let mut state = self.state.lock().unwrap();
        if !state.plans.contains_key(&plan_id) || state.deleted_plans.contains(&plan_id) {
            return Ok(false);
        }
        state.deleted_plans.push(plan_id);
        Ok(true)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_active_by_user_id(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active_at(now))
            .max_by_key(|s| s.start_date)
            .cloned())
    }

    async fn activate_for_transaction(
        &self,
        activation: SubscriptionActivation,
    ) -> Result<ActivationOutcome> {
        self.record_write();
        let mut state = self.state.lock().unwrap();

        let stamped = state
            .transactions
            .iter()
            .find(|t| t.id == activation.transaction_id)
            .ok_or_else(|| anyhow!("transaction {} not found", activation.transaction_id))?
            .subscription_id;

        if let Some(subscription_id) = stamped {
            return Ok(ActivationOutcome {
                subscription_id,
                superseded_subscription_id: None,
                newly_created: false,
            });
        }

        let mut superseded = None;
        for subscription in state.subscriptions.iter_mut().filter(|s| {
            s.user_id == activation.user_id && s.status() == SubscriptionStatus::Active
        }) {
            subscription.status = SubscriptionStatus::Canceled.to_string();
            superseded.get_or_insert(subscription.id);
        }

        let subscription = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: activation.user_id,
            plan_id: activation.plan_id,
            start_date: activation.start_date,
            end_date: activation.end_date,
            status: SubscriptionStatus::Active.to_string(),
            created_at: activation.start_date,
        };
        let subscription_id = subscription.id;
        state.subscriptions.push(subscription);

        if let Some(transaction) = state
            .transactions
            .iter_mut()
            .find(|t| t.id == activation.transaction_id)
        {
            transaction.subscription_id = Some(subscription_id);
        }

        Ok(ActivationOutcome {
            subscription_id,
            superseded_subscription_id: superseded,
            newly_created: true,
        })
    }
}

#[async_trait]
impl UsageRepository for InMemoryStore {
    async fn find_or_create(
        &self,
        user_id: Uuid,
        feature: Feature,
        period_month: NaiveDate,
    ) -> Result<UsageEntity> {
        let mut state = self.state.lock().unwrap();
        let usage = state
            .usage
            .entry((user_id, feature, period_month))
            .or_insert_with(|| UsageEntity {
                id: Uuid::new_v4(),
                user_id,
                feature: feature.to_string(),
                period_month,
                count: 0,
                created_at: Utc::now(),
            });
        Ok(usage.clone())
    }

    async fn increment_within_limit(
        &self,
        user_id: Uuid,
        feature: Feature,
        period_month: NaiveDate,
        limit: Limit,
    ) -> Result<Option<i32>> {
        self.record_write();
        let mut state = self.state.lock().unwrap();
        let Some(usage) = state.usage.get_mut(&(user_id, feature, period_month)) else {
            return Ok(None);
        };

        if !limit.admits(usage.count) {
            return Ok(None);
        }
        usage.count += 1;
        Ok(Some(usage.count))
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert(
        &self,
        insert_transaction_entity: InsertTransactionEntity,
    ) -> Result<TransactionEntity> {
        self.record_write();
        let mut state = self.state.lock().unwrap();
        if state
            .transactions
            .iter()
            .any(|t| t.order_id == insert_transaction_entity.order_id)
        {
            return Err(anyhow!("duplicate order id"));
        }

        let now = Utc::now();
        let transaction = TransactionEntity {
            id: Uuid::new_v4(),
            user_id: insert_transaction_entity.user_id,
            plan_id: insert_transaction_entity.plan_id,
            subscription_id: None,
            order_id: insert_transaction_entity.order_id,
            gateway_transaction_id: None,
            gross_amount: insert_transaction_entity.gross_amount,
            payment_type: None,
            payment_method: None,
            status: insert_transaction_entity.status,
            gateway_transaction_status: None,
            fraud_status: None,
            session_token: insert_transaction_entity.session_token,
            redirect_url: insert_transaction_entity.redirect_url,
            gateway_raw_response: None,
            paid_at: None,
            expired_at: insert_transaction_entity.expired_at,
            created_at: now,
            updated_at: now,
        };
        state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>> {
        Ok(self.transaction(transaction_id))
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<TransactionEntity>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .find(|t| t.order_id == order_id)
            .cloned())
    }

    async fn list_by_user_id(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionEntity>> {
        let mut transactions: Vec<TransactionEntity> = self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(transactions
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_user_id(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .count() as i64)
    }

    async fn apply_reconciliation(
        &self,
        transaction_id: Uuid,
        changes: ReconcileTransactionEntity,
    ) -> Result<Option<TransactionEntity>> {
        self.record_write();
        if self.fail_next_reconciliation.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("simulated store outage"));
        }

        let mut state = self.state.lock().unwrap();
        let Some(transaction) = state.transactions.iter_mut().find(|t| t.id == transaction_id)
        else {
            return Ok(None);
        };
        if transaction.status().is_terminal() {
            return Ok(None);
        }

        if let Some(status) = changes.status {
            transaction.status = status;
        }
        if changes.gateway_transaction_id.is_some() {
            transaction.gateway_transaction_id = changes.gateway_transaction_id;
        }
        if changes.payment_type.is_some() {
            transaction.payment_type = changes.payment_type;
        }
        if changes.gateway_transaction_status.is_some() {
            transaction.gateway_transaction_status = changes.gateway_transaction_status;
        }
        if changes.fraud_status.is_some() {
            transaction.fraud_status = changes.fraud_status;
        }
        if changes.gateway_raw_response.is_some() {
            transaction.gateway_raw_response = changes.gateway_raw_response;
        }
        if changes.paid_at.is_some() {
            transaction.paid_at = changes.paid_at;
        }
        if changes.subscription_id.is_some() {
            transaction.subscription_id = changes.subscription_id;
        }
        if let Some(updated_at) = changes.updated_at {
            transaction.updated_at = updated_at;
        }

        Ok(Some(transaction.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
    failing: bool,
}

impl InMemoryCache {
    /// Every call errors, as if the cache server were unreachable.
    pub fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            failing: true,
        }
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(anyhow!("cache unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheRepository for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String, _ttl: Duration) -> Result<()> {
        self.check()?;
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

/// Recording gateway. Status answers are configured per order id; signatures
/// use the real algorithm with [`SERVER_KEY`].
pub struct FakeGateway {
    signer: MidtransClient,
    sessions: Mutex<Vec<SnapTransactionRequest>>,
    statuses: Mutex<HashMap<String, (String, String)>>,
    status_queries: AtomicUsize,
    fail_sessions: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        let signer = MidtransClient::new(MidtransConfig {
            server_key: SERVER_KEY.to_string(),
            client_key: CLIENT_KEY.to_string(),
            ..Default::default()
        })
        .unwrap();

        Self {
            signer,
            sessions: Mutex::default(),
            statuses: Mutex::default(),
            status_queries: AtomicUsize::new(0),
            fail_sessions: AtomicBool::new(false),
        }
    }

    pub fn set_status(&self, order_id: &str, transaction_status: &str, fraud_status: &str) {
        self.statuses.lock().unwrap().insert(
            order_id.to_string(),
            (transaction_status.to_string(), fraud_status.to_string()),
        );
    }

    pub fn fail_sessions(&self) {
        self.fail_sessions.store(true, Ordering::SeqCst);
    }

    pub fn sign(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        self.signer.signature_for(order_id, status_code, gross_amount)
    }

    pub fn sessions(&self) -> Vec<SnapTransactionRequest> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_hosted_session(
        &self,
        request: SnapTransactionRequest,
    ) -> Result<SnapSession> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(anyhow!("gateway unavailable"));
        }

        let session = SnapSession {
            token: format!("token-{}", request.order_id),
            redirect_url: format!("https://pay.test/{}", request.order_id),
        };
        self.sessions.lock().unwrap().push(request);
        Ok(session)
    }

    async fn query_status(&self, order_id: &str) -> Result<GatewayTransactionStatus> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        let (transaction_status, fraud_status) = self
            .statuses
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .unwrap_or_else(|| ("pending".to_string(), String::new()));

        Ok(GatewayTransactionStatus {
            transaction_id: format!("gw-{order_id}"),
            order_id: order_id.to_string(),
            raw: serde_json::json!({
                "order_id": order_id,
                "transaction_status": transaction_status,
                "fraud_status": fraud_status,
            }),
            transaction_status,
            fraud_status,
            payment_type: "bank_transfer".to_string(),
            gross_amount: "150000.00".to_string(),
            status_code: "200".to_string(),
            status_message: "Success, transaction is found".to_string(),
        })
    }

    fn client_key(&self) -> String {
        self.signer.client_key().to_string()
    }

    fn verify_signature(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        signature_key: &str,
    ) -> bool {
        self.signer
            .verify_signature(order_id, status_code, gross_amount, signature_key)
    }
}
