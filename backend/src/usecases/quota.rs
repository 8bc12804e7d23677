use std::sync::Arc;

use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
    repositories::{
        cache::CacheRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
        usages::UsageRepository,
    },
    value_objects::{
        enums::features::Feature,
        quota::{FeatureQuota, UserQuota, period_month},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::plan_catalog::PlanCatalog;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("no active subscription")]
    NoActiveSubscription,
    #[error("monthly quota exceeded for {0}")]
    QuotaExceeded(Feature),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl QuotaError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            QuotaError::NoActiveSubscription => StatusCode::FORBIDDEN,
            QuotaError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            QuotaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type QuotaResult<T> = std::result::Result<T, QuotaError>;

/// Gate in front of every metered feature. A use is charged when admitted,
/// before the feature does its own work.
pub struct QuotaUseCase<P, S, U, C>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    plan_catalog: Arc<PlanCatalog<P, C>>,
    subscription_repo: Arc<S>,
    usage_repo: Arc<U>,
}

impl<P, S, U, C> QuotaUseCase<P, S, U, C>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    pub fn new(
        plan_catalog: Arc<PlanCatalog<P, C>>,
        subscription_repo: Arc<S>,
        usage_repo: Arc<U>,
    ) -> Self {
        Self {
            plan_catalog,
            subscription_repo,
            usage_repo,
        }
    }

    pub async fn check_and_consume(
        &self,
        user_id: Uuid,
        feature: Feature,
    ) -> QuotaResult<FeatureQuota> {
        self.check_and_consume_at(user_id, feature, Utc::now()).await
    }

    pub async fn check_and_consume_at(
        &self,
        user_id: Uuid,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> QuotaResult<FeatureQuota> {
        let (_, plan) = self.active_plan(user_id, now).await?;
        let limit = plan.limits.for_feature(feature);
        let period = period_month(now);

        let usage = self
            .usage_repo
            .find_or_create(user_id, feature, period)
            .await
            .map_err(|err| {
                error!(%user_id, %feature, db_error = ?err, "quota: failed to load usage");
                QuotaError::Internal(err)
            })?;

        if !limit.admits(usage.count) {
            info!(%user_id, %feature, used = usage.count, "quota: limit reached");
            return Err(QuotaError::QuotaExceeded(feature));
        }

        let used = self
            .usage_repo
            .increment_within_limit(user_id, feature, period, limit)
            .await
            .map_err(|err| {
                error!(%user_id, %feature, db_error = ?err, "quota: failed to increment usage");
                QuotaError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%user_id, %feature, "quota: limit reached by a concurrent request");
                QuotaError::QuotaExceeded(feature)
            })?;

        info!(%user_id, %feature, used, "quota: usage consumed");
        Ok(FeatureQuota { max: limit, used })
    }

    /// Read-only snapshot for the current month. A feature whose counter
    /// cannot be read reports zero use instead of failing the call.
    pub async fn get_user_quota(&self, user_id: Uuid) -> QuotaResult<UserQuota> {
        self.get_user_quota_at(user_id, Utc::now()).await
    }

    pub async fn get_user_quota_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> QuotaResult<UserQuota> {
        let (_, plan) = self.active_plan(user_id, now).await?;
        let period = period_month(now);

        let mut used = [0; 3];
        for (slot, feature) in used.iter_mut().zip(Feature::ALL) {
            match self.usage_repo.find_or_create(user_id, feature, period).await {
                Ok(usage) => *slot = usage.count,
                Err(err) => {
                    warn!(%user_id, %feature, db_error = ?err, "quota: usage unavailable, reporting zero");
                }
            }
        }

        Ok(UserQuota {
            plan_name: plan.display_name.clone(),
            resume: FeatureQuota {
                max: plan.limits.max_resumes,
                used: used[0],
            },
            ats_check: FeatureQuota {
                max: plan.limits.max_ats_checks,
                used: used[1],
            },
            interview: FeatureQuota {
                max: plan.limits.max_interviews,
                used: used[2],
            },
        })
    }

    async fn active_plan(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> QuotaResult<(SubscriptionEntity, PlanEntity)> {
        let subscription = self
            .subscription_repo
            .find_active_by_user_id(user_id, now)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "quota: failed to load active subscription");
                QuotaError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%user_id, "quota: no active subscription");
                QuotaError::NoActiveSubscription
            })?;

        let plan = self
            .plan_catalog
            .get(subscription.plan_id)
            .await
            .map_err(|err| {
                error!(%user_id, plan_id = %subscription.plan_id, db_error = ?err, "quota: failed to load plan");
                QuotaError::Internal(err)
            })?
            .ok_or_else(|| {
                error!(%user_id, plan_id = %subscription.plan_id, "quota: subscribed plan is missing");
                QuotaError::Internal(anyhow::anyhow!(
                    "plan {} of active subscription not found",
                    subscription.plan_id
                ))
            })?;

        Ok((subscription, plan))
    }
}
