use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::{
        repositories::{cache::CacheRepository, plans::PlanRepository},
        value_objects::plans::{CreatePlanModel, UpdatePlanModel},
    },
    infra::{
        cache::AppCache,
        db::{postgres::postgres_connection::PgPoolSquad, repositories::plans::PlanPostgres},
    },
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{plan_catalog::PlanCatalog, plans::PlanUseCase},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListPlansQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Honoured for admins only.
    #[serde(default)]
    pub include_inactive: bool,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, cache: Arc<AppCache>, cache_ttl: Duration) -> Router {
    let plan_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let plan_catalog = Arc::new(PlanCatalog::new(
        Arc::clone(&plan_repository),
        cache,
        cache_ttl,
    ));
    let plans_usecase = PlanUseCase::new(plan_repository, plan_catalog);

    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route(
            "/:plan_id",
            get(get_plan).patch(update_plan).delete(delete_plan),
        )
        .with_state(Arc::new(plans_usecase))
}

fn require_admin(auth: &AuthUser) -> Result<(), AppError> {
    if auth.is_admin() {
        return Ok(());
    }
    warn!(user_id = %auth.user_id, role = %auth.role, "plans router: admin route denied");
    Err(AppError::Forbidden)
}

pub async fn list_plans<P, C>(
    State(plans_usecase): State<Arc<PlanUseCase<P, C>>>,
    auth: AuthUser,
    Query(query): Query<ListPlansQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    let include_inactive = query.include_inactive && auth.is_admin();
    let plans = plans_usecase
        .list_plans(query.page, query.limit, include_inactive)
        .await?;

    Ok(Json(plans))
}

pub async fn get_plan<P, C>(
    State(plans_usecase): State<Arc<PlanUseCase<P, C>>>,
    auth: AuthUser,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    let plan = plans_usecase.get_plan(plan_id, auth.is_admin()).await?;

    Ok(Json(plan))
}

pub async fn create_plan<P, C>(
    State(plans_usecase): State<Arc<PlanUseCase<P, C>>>,
    auth: AuthUser,
    Json(create_plan_model): Json<CreatePlanModel>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    require_admin(&auth)?;
    let plan = plans_usecase.create_plan(create_plan_model).await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan<P, C>(
    State(plans_usecase): State<Arc<PlanUseCase<P, C>>>,
    auth: AuthUser,
    Path(plan_id): Path<Uuid>,
    Json(update_plan_model): Json<UpdatePlanModel>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    require_admin(&auth)?;
    let plan = plans_usecase.update_plan(plan_id, update_plan_model).await?;

    Ok(Json(plan))
}

pub async fn delete_plan<P, C>(
    State(plans_usecase): State<Arc<PlanUseCase<P, C>>>,
    auth: AuthUser,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    require_admin(&auth)?;
    plans_usecase.delete_plan(plan_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
