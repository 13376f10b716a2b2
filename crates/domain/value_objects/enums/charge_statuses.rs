use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Status reported by the processor on a charge object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Succeeded,
    Pending,
    Failed,
    #[serde(untagged)]
    Other(String),
}

impl ChargeStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "succeeded" => ChargeStatus::Succeeded,
            "pending" => ChargeStatus::Pending,
            "failed" => ChargeStatus::Failed,
            other => ChargeStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChargeStatus::Succeeded => "succeeded",
            ChargeStatus::Pending => "pending",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Other(value) => value.as_str(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, ChargeStatus::Succeeded)
    }
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
