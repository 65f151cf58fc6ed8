use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ExpenseId = Uuid;

/// Money a family member spent. Expenses are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    /// Amount in cents (never negative)
    pub amount_cents: Cents,
    /// Free-text label used for grouping (e.g. "Food", "Transport")
    pub category: String,
    pub description: String,
    /// Who spent the money
    pub family_member: String,
    /// When the expense happened. `None` if the stored date could not be read.
    pub date: Option<DateTime<Utc>>,
    /// When we recorded this expense
    pub created_at: DateTime<Utc>,
    /// Raw text of the receipt this expense was extracted from
    pub receipt_text: Option<String>,
}

impl Expense {
    pub fn new(
        amount_cents: Cents,
        category: impl Into<String>,
        description: impl Into<String>,
        family_member: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount_cents,
            category: category.into(),
            description: description.into(),
            family_member: family_member.into(),
            date: Some(date),
            created_at: Utc::now(),
            receipt_text: None,
        }
    }

    pub fn with_receipt_text(mut self, text: impl Into<String>) -> Self {
        self.receipt_text = Some(text.into());
        self
    }
}

/// Input for recording a new expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount_cents: Cents,
    pub category: String,
    pub description: String,
    pub family_member: String,
    pub date: DateTime<Utc>,
}

impl NewExpense {
    pub fn into_expense(self) -> Expense {
        Expense::new(
            self.amount_cents,
            self.category,
            self.description,
            self.family_member,
            self.date,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_expense_has_date_and_fresh_id() {
        let now = Utc::now();
        let a = Expense::new(1000, "Food", "Groceries", "Ana", now);
        let b = Expense::new(1000, "Food", "Groceries", "Ana", now);

        assert_eq!(a.date, Some(now));
        assert_ne!(a.id, b.id);
        assert!(a.receipt_text.is_none());
    }

    #[test]
    fn test_with_receipt_text() {
        let expense =
            Expense::new(899, "Receipt", "Receipt: shop.txt", "Unknown", Utc::now())
                .with_receipt_text("TOTAL $8.99");
        assert_eq!(expense.receipt_text.as_deref(), Some("TOTAL $8.99"));
    }
}
