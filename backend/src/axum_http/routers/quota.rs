use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            cache::CacheRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
            usages::UsageRepository,
        },
        value_objects::enums::features::Feature,
    },
    infra::{
        cache::AppCache,
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                plans::PlanPostgres, subscriptions::SubscriptionPostgres, usages::UsagePostgres,
            },
        },
    },
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{plan_catalog::PlanCatalog, quota::QuotaUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, cache: Arc<AppCache>, cache_ttl: Duration) -> Router {
    let plan_catalog = Arc::new(PlanCatalog::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        cache,
        cache_ttl,
    ));
    let quota_usecase = QuotaUseCase::new(
        plan_catalog,
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(UsagePostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route("/", get(get_quota))
        .route("/:feature/consume", post(consume))
        .with_state(Arc::new(quota_usecase))
}

pub async fn get_quota<P, S, U, C>(
    State(quota_usecase): State<Arc<QuotaUseCase<P, S, U, C>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    let quota = quota_usecase.get_user_quota(auth.user_id).await?;

    Ok(Json(quota))
}

pub async fn consume<P, S, U, C>(
    State(quota_usecase): State<Arc<QuotaUseCase<P, S, U, C>>>,
    auth: AuthUser,
    Path(feature): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    let feature = Feature::from_str(&feature)
        .ok_or_else(|| AppError::BadRequest(format!("unknown feature: {feature}")))?;
    let quota = quota_usecase
        .check_and_consume(auth.user_id, feature)
        .await?;

    Ok(Json(quota))
}
