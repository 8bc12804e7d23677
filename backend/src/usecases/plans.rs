use std::sync::Arc;

use crates::domain::{
    entities::plans::{InsertPlanEntity, PlanChangeset, PlanEntity},
    repositories::{cache::CacheRepository, plans::PlanRepository},
    value_objects::{
        pagination::{PageRequest, Paginated},
        plans::{CreatePlanModel, Limit, PlanDto, UpdatePlanModel},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::plan_catalog::PlanCatalog;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan not found")]
    PlanNotFound,
    #[error("a plan named {0} already exists")]
    PlanNameExists(String),
    #[error("invalid plan data: {0}")]
    InvalidPlanData(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PlanError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PlanError::PlanNotFound => StatusCode::NOT_FOUND,
            PlanError::PlanNameExists(_) => StatusCode::CONFLICT,
            PlanError::InvalidPlanData(_) => StatusCode::BAD_REQUEST,
            PlanError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;

pub struct PlanUseCase<P, C>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    plan_catalog: Arc<PlanCatalog<P, C>>,
}

impl<P, C> PlanUseCase<P, C>
where
    P: PlanRepository + Send + Sync + 'static,
    C: CacheRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>, plan_catalog: Arc<PlanCatalog<P, C>>) -> Self {
        Self {
            plan_repo,
            plan_catalog,
        }
    }

    pub async fn list_plans(
        &self,
        page: Option<i64>,
        limit: Option<i64>,
        include_inactive: bool,
    ) -> PlanResult<Paginated<PlanDto>> {
        let page = PageRequest::normalize(page, limit);

        let plans = self
            .plan_catalog
            .list(page, include_inactive)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "plans: failed to list plans");
                PlanError::Internal(err)
            })?;

        info!(
            plan_count = plans.items.len(),
            total = plans.pagination.total,
            "plans: plans loaded"
        );
        Ok(plans.map(PlanDto::from))
    }

    /// Inactive plans are only visible to operators.
    pub async fn get_plan(&self, plan_id: Uuid, include_inactive: bool) -> PlanResult<PlanDto> {
        let plan = self
            .plan_catalog
            .get(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to load plan");
                PlanError::Internal(err)
            })?
            .filter(|plan| include_inactive || plan.is_active)
            .ok_or(PlanError::PlanNotFound)?;

        Ok(plan.into())
    }

    pub async fn create_plan(&self, model: CreatePlanModel) -> PlanResult<PlanDto> {
        let name = required_text("name", &model.name)?;
        let display_name = required_text("display_name", &model.display_name)?;
        validate_numbers(
            model.price,
            model.duration_days,
            [model.max_resumes, model.max_ats_checks, model.max_interviews],
        )?;

        self.ensure_name_available(&name, None).await?;

        let plan = self
            .plan_repo
            .insert(InsertPlanEntity {
                name,
                display_name,
                price: model.price,
                duration_days: model.duration_days,
                max_resumes: normalize_limit(model.max_resumes),
                max_ats_checks: normalize_limit(model.max_ats_checks),
                max_interviews: normalize_limit(model.max_interviews),
                is_active: model.is_active.unwrap_or(true),
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "plans: failed to insert plan");
                PlanError::Internal(err)
            })?;

        self.plan_catalog.invalidate(None).await;
        info!(plan_id = %plan.id, name = %plan.name, "plans: plan created");

        Ok(plan.into())
    }

    pub async fn update_plan(&self, plan_id: Uuid, model: UpdatePlanModel) -> PlanResult<PlanDto> {
        let mut plan = self.load_for_update(plan_id).await?;

        if let Some(name) = &model.name {
            let name = required_text("name", name)?;
            if name != plan.name {
                self.ensure_name_available(&name, Some(plan_id)).await?;
            }
            plan.name = name;
        }
        if let Some(display_name) = &model.display_name {
            plan.display_name = required_text("display_name", display_name)?;
        }
        if let Some(price) = model.price {
            plan.price = price;
        }
        if let Some(duration_days) = model.duration_days {
            plan.duration_days = Some(duration_days);
        }
        if let Some(max) = model.max_resumes {
            plan.limits.max_resumes = Limit::from_column(Some(max));
        }
        if let Some(max) = model.max_ats_checks {
            plan.limits.max_ats_checks = Limit::from_column(Some(max));
        }
        if let Some(max) = model.max_interviews {
            plan.limits.max_interviews = Limit::from_column(Some(max));
        }
        if let Some(is_active) = model.is_active {
            plan.is_active = is_active;
        }

        validate_numbers(
            plan.price,
            plan.duration_days,
            [model.max_resumes, model.max_ats_checks, model.max_interviews],
        )?;

        let updated = self
            .plan_repo
            .update(plan_id, PlanChangeset::from(&plan))
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to update plan");
                PlanError::Internal(err)
            })?
            .ok_or(PlanError::PlanNotFound)?;

        self.plan_catalog.invalidate(Some(plan_id)).await;
        info!(%plan_id, "plans: plan updated");

        Ok(updated.into())
    }

    pub async fn delete_plan(&self, plan_id: Uuid) -> PlanResult<()> {
        let deleted = self.plan_repo.soft_delete(plan_id).await.map_err(|err| {
            error!(%plan_id, db_error = ?err, "plans: failed to delete plan");
            PlanError::Internal(err)
        })?;

        if !deleted {
            return Err(PlanError::PlanNotFound);
        }

        self.plan_catalog.invalidate(Some(plan_id)).await;
        info!(%plan_id, "plans: plan deleted");

        Ok(())
    }

    async fn load_for_update(&self, plan_id: Uuid) -> PlanResult<PlanEntity> {
        self.plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to load plan");
                PlanError::Internal(err)
            })?
            .ok_or(PlanError::PlanNotFound)
    }

    async fn ensure_name_available(&self, name: &str, current: Option<Uuid>) -> PlanResult<()> {
        let existing = self.plan_repo.find_by_name(name).await.map_err(|err| {
            error!(name, db_error = ?err, "plans: failed to check plan name");
            PlanError::Internal(err)
        })?;

        match existing {
            Some(plan) if Some(plan.id) != current => {
                warn!(name, "plans: plan name already taken");
                Err(PlanError::PlanNameExists(name.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn required_text(field: &str, value: &str) -> PlanResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlanError::InvalidPlanData(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn validate_numbers(
    price: i64,
    duration_days: Option<i32>,
    limits: [Option<i32>; 3],
) -> PlanResult<()> {
    if price < 0 {
        return Err(PlanError::InvalidPlanData("price must not be negative".into()));
    }
    if duration_days.is_some_and(|days| days <= 0) {
        return Err(PlanError::InvalidPlanData(
            "duration_days must be positive".into(),
        ));
    }
    if limits.iter().flatten().any(|limit| *limit < 0) {
        return Err(PlanError::InvalidPlanData(
            "limits must not be negative".into(),
        ));
    }
    Ok(())
}

/// `0` is stored as `NULL` so the column has one spelling of unlimited.
fn normalize_limit(value: Option<i32>) -> Option<i32> {
    Limit::from_column(value).to_column()
}
