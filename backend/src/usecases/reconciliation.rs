use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crates::domain::{
    entities::transactions::{ReconcileTransactionEntity, TransactionEntity},
    repositories::{
        cache::CacheRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
        transactions::TransactionRepository,
    },
    value_objects::{
        enums::transaction_statuses::TransactionStatus, payment_webhook::PaymentNotification,
        plans::DEFAULT_DURATION_DAYS, subscriptions::SubscriptionActivation,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    payment_gateway::PaymentGateway,
    plan_catalog::PlanCatalog,
    transactions::{TransactionError, TransactionResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed(TransactionStatus),
    /// The transaction had already settled; nothing was touched.
    AlreadyTerminal(TransactionStatus),
}

/// Brings a stored transaction in line with the gateway. Webhooks and
/// user-triggered polls both land here, and neither trusts the status it was
/// handed: the gateway is always asked again.
pub struct ReconciliationUseCase<P, S, T, C, G>
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
}

impl<P, S, T, C, G> ReconciliationUseCase<P, S, T, C, G>
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
    ) -> Self {
        Self {
            plan_catalog,
            subscription_repo,
            transaction_repo,
            gateway,
        }
    }

    pub async fn handle_webhook(
        &self,
        payload: serde_json::Value,
    ) -> TransactionResult<WebhookOutcome> {
        self.handle_webhook_at(payload, Utc::now()).await
    }

    /// Signature verification happens before any store access.
    pub async fn handle_webhook_at(
        &self,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> TransactionResult<WebhookOutcome> {
        let notification: PaymentNotification = serde_json::from_value(payload.clone())
            .map_err(|err| {
                warn!(error = %err, "webhook: undecodable payload");
                TransactionError::InvalidWebhook(err.to_string())
            })?;

        let order_id = notification.order_id.trim().to_string();
        if order_id.is_empty() {
            warn!("webhook: payload without order_id");
            return Err(TransactionError::InvalidWebhook("missing order_id".into()));
        }

        if !notification.signature_key.is_empty()
            && !self.gateway.verify_signature(
                &order_id,
                &notification.status_code,
                &notification.gross_amount,
                &notification.signature_key,
            )
        {
            warn!(%order_id, "webhook: signature mismatch");
            return Err(TransactionError::InvalidSignature);
        }

        info!(
            %order_id,
            reported_status = %notification.transaction_status,
            "webhook: notification received"
        );

        let transaction = self.find_by_order_id(&order_id).await?;
        let current = transaction.status();
        if current.is_terminal() {
            info!(%order_id, status = %current, "webhook: transaction already settled");
            return Ok(WebhookOutcome::AlreadyTerminal(current));
        }

        let updated = self.reconcile(transaction, Some(payload), now).await?;
        Ok(WebhookOutcome::Processed(updated.status()))
    }

    pub async fn check_status_by_order_id(
        &self,
        order_id: &str,
    ) -> TransactionResult<TransactionEntity> {
        let transaction = self.find_by_order_id(order_id).await?;
        self.refresh(transaction).await
    }

    /// Settled transactions are returned without asking the gateway.
    pub async fn refresh(
        &self,
        transaction: TransactionEntity,
    ) -> TransactionResult<TransactionEntity> {
        if transaction.status().is_terminal() {
            return Ok(transaction);
        }
        self.reconcile(transaction, None, Utc::now()).await
    }

    async fn find_by_order_id(&self, order_id: &str) -> TransactionResult<TransactionEntity> {
        self.transaction_repo
            .find_by_order_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "reconciliation: failed to load transaction");
                TransactionError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%order_id, "reconciliation: unknown order");
                TransactionError::TransactionNotFound
            })
    }

    async fn reconcile(
        &self,
        transaction: TransactionEntity,
        audit_payload: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> TransactionResult<TransactionEntity> {
        let transaction_id = transaction.id;
        let order_id = transaction.order_id.clone();

        let gateway_status = self
            .gateway
            .query_status(&order_id)
            .await
            .map_err(|err| {
                error!(%order_id, gateway_error = ?err, "reconciliation: status query failed");
                TransactionError::Internal(err)
            })?;

        let status = TransactionStatus::from_gateway(
            &gateway_status.transaction_status,
            &gateway_status.fraud_status,
        );

        let mut changes = ReconcileTransactionEntity {
            status: Some(status.to_string()),
            gateway_transaction_id: non_empty(gateway_status.transaction_id),
            payment_type: non_empty(gateway_status.payment_type),
            gateway_transaction_status: non_empty(gateway_status.transaction_status),
            fraud_status: non_empty(gateway_status.fraud_status),
            gateway_raw_response: Some(audit_payload.unwrap_or(gateway_status.raw)),
            updated_at: Some(now),
            ..Default::default()
        };

        if status == TransactionStatus::Success {
            changes.paid_at = Some(now);
            changes.subscription_id = Some(self.activate_subscription(&transaction, now).await?);
        }

        let updated = self
            .transaction_repo
            .apply_reconciliation(transaction_id, changes)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "reconciliation: failed to update transaction");
                TransactionError::Internal(err)
            })?;

        match updated {
            Some(updated) => {
                info!(%order_id, status = %status, "reconciliation: transaction updated");
                Ok(updated)
            }
            None => {
                // Another writer settled it first.
                info!(%order_id, "reconciliation: transaction settled concurrently");
                self.transaction_repo
                    .find_by_id(transaction_id)
                    .await
                    .map_err(|err| {
                        error!(%order_id, db_error = ?err, "reconciliation: failed to reload transaction");
                        TransactionError::Internal(err)
                    })?
                    .ok_or(TransactionError::TransactionNotFound)
            }
        }
    }

    async fn activate_subscription(
        &self,
        transaction: &TransactionEntity,
        now: DateTime<Utc>,
    ) -> TransactionResult<Uuid> {
        if let Some(subscription_id) = transaction.subscription_id {
            return Ok(subscription_id);
        }

        let transaction_id = transaction.id;
        let plan_id = transaction.plan_id;
        let duration_days = match self.plan_catalog.get(plan_id).await {
            Ok(Some(plan)) => plan.duration_days_or_default(),
            Ok(None) => {
                warn!(%transaction_id, %plan_id, "reconciliation: purchased plan no longer exists");
                DEFAULT_DURATION_DAYS
            }
            Err(err) => {
                error!(%transaction_id, %plan_id, db_error = ?err, "reconciliation: failed to load plan");
                return Err(TransactionError::Internal(err));
            }
        };

        let outcome = self
            .subscription_repo
            .activate_for_transaction(SubscriptionActivation {
                transaction_id,
                user_id: transaction.user_id,
                plan_id,
                start_date: now,
                end_date: now + Duration::days(i64::from(duration_days)),
            })
            .await
            .map_err(|err| {
                error!(%transaction_id, db_error = ?err, "reconciliation: failed to activate subscription");
                TransactionError::Internal(err)
            })?;

        if outcome.newly_created {
            info!(
                %transaction_id,
                user_id = %transaction.user_id,
                subscription_id = %outcome.subscription_id,
                "reconciliation: subscription activated"
            );
        }
        if let Some(superseded) = outcome.superseded_subscription_id {
            info!(
                %transaction_id,
                superseded_subscription_id = %superseded,
                "reconciliation: previous subscription canceled"
            );
        }

        Ok(outcome.subscription_id)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
