use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::{entities::plans::PlanEntity, value_objects::enums::features::Feature};

/// Default subscription length when a plan leaves `duration_days` unset.
pub const DEFAULT_DURATION_DAYS: i32 = 30;

/// Monthly allowance for one feature.
///
/// Stored as a nullable integer column: `NULL` and `0` both mean unlimited.
/// A negative stored value is treated as a cap of zero so a bad row never
/// grants unlimited use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    Capped(i32),
}

impl Limit {
    pub fn from_column(value: Option<i32>) -> Self {
        match value {
            None | Some(0) => Limit::Unlimited,
            Some(n) if n < 0 => Limit::Capped(0),
            Some(n) => Limit::Capped(n),
        }
    }

    pub fn to_column(self) -> Option<i32> {
        match self {
            Limit::Unlimited => None,
            Limit::Capped(n) => Some(n),
        }
    }

    /// Whether one more use fits on top of `used`.
    pub fn admits(self, used: i32) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Capped(max) => used < max,
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_column().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<i32>::deserialize(deserializer).map(Limit::from_column)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_resumes: Limit,
    pub max_ats_checks: Limit,
    pub max_interviews: Limit,
}

impl PlanLimits {
    pub fn for_feature(&self, feature: Feature) -> Limit {
        match feature {
            Feature::Resume => self.max_resumes,
            Feature::AtsCheck => self.max_ats_checks,
            Feature::Interview => self.max_interviews,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanDto {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub duration_days: i32,
    pub max_resumes: Limit,
    pub max_ats_checks: Limit,
    pub max_interviews: Limit,
    pub is_active: bool,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        let duration_days = value.duration_days_or_default();
        Self {
            id: value.id,
            name: value.name,
            display_name: value.display_name,
            price: value.price,
            duration_days,
            max_resumes: value.limits.max_resumes,
            max_ats_checks: value.limits.max_ats_checks,
            max_interviews: value.limits.max_interviews,
            is_active: value.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanModel {
    pub name: String,
    pub display_name: String,
    pub price: i64,
    #[serde(default)]
    pub duration_days: Option<i32>,
    #[serde(default)]
    pub max_resumes: Option<i32>,
    #[serde(default)]
    pub max_ats_checks: Option<i32>,
    #[serde(default)]
    pub max_interviews: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update. Absent fields keep their stored value; a limit of `0`
/// switches the feature to unlimited.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanModel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub duration_days: Option<i32>,
    #[serde(default)]
    pub max_resumes: Option<i32>,
    #[serde(default)]
    pub max_ats_checks: Option<i32>,
    #[serde(default)]
    pub max_interviews: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}
