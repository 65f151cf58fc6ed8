use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Expense, GroupTotal, PurchasePlan};

/// Spending breakdown over every recorded expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingAnalysis {
    pub category_totals: Vec<GroupTotal>,
    pub monthly_spending: Vec<GroupTotal>,
    pub total_spent: Cents,
    /// Expenses left out of `monthly_spending` because their date was unreadable
    pub excluded_undated: usize,
}

/// Savings against expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_savings: Cents,
    pub total_expenses: Cents,
    pub net: Cents,
}

/// Outcome of a progress update on a purchase plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub success: bool,
    pub plan_id: String,
    pub current_saved_cents: Cents,
    pub target_amount_cents: Cents,
    pub goal_reached: bool,
}

/// Data handed to the advisor when asking for recommendations.
#[derive(Debug, Clone)]
pub struct AdvisorSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Newest first
    pub recent_expenses: Vec<Expense>,
    pub total_savings: Cents,
    pub plans: Vec<PurchasePlan>,
}
