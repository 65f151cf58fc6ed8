use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type PlanId = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Active,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(PlanStatus::Active),
            "completed" => Some(PlanStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A savings goal for a planned purchase.
///
/// Only `current_saved_cents` ever changes after creation, and only through
/// a progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlan {
    pub id: PlanId,
    pub name: String,
    pub target_amount_cents: Cents,
    pub current_saved_cents: Cents,
    /// `None` if the stored date could not be read.
    pub target_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
}

impl PurchasePlan {
    pub fn new(name: impl Into<String>, target_amount_cents: Cents, target_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_amount_cents,
            current_saved_cents: 0,
            target_date: Some(target_date),
            priority: Priority::default(),
            status: PlanStatus::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_current_saved(mut self, cents: Cents) -> Self {
        self.current_saved_cents = cents;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Amount still missing to reach the target (zero once reached).
    pub fn remaining_cents(&self) -> Cents {
        (self.target_amount_cents - self.current_saved_cents).max(0)
    }

    pub fn is_goal_reached(&self) -> bool {
        self.current_saved_cents >= self.target_amount_cents
    }
}

/// Input for creating a purchase plan.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub target_amount_cents: Cents,
    pub current_saved_cents: Option<Cents>,
    pub target_date: DateTime<Utc>,
    pub priority: Option<Priority>,
}

impl NewPlan {
    pub fn into_plan(self) -> PurchasePlan {
        PurchasePlan::new(self.name, self.target_amount_cents, self.target_date)
            .with_current_saved(self.current_saved_cents.unwrap_or(0))
            .with_priority(self.priority.unwrap_or_default())
    }
}
