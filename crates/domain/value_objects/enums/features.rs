use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A quota-metered capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Resume,
    AtsCheck,
    Interview,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::Resume, Feature::AtsCheck, Feature::Interview];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Resume => "resume",
            Feature::AtsCheck => "ats_check",
            Feature::Interview => "interview",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "resume" => Some(Feature::Resume),
            "ats_check" => Some(Feature::AtsCheck),
            "interview" => Some(Feature::Interview),
            _ => None,
        }
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
