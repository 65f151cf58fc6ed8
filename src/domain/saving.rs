use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type SavingId = Uuid;

/// A deposit into the family savings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saving {
    pub id: SavingId,
    /// Amount in cents (never negative)
    pub amount_cents: Cents,
    /// Where the money came from (e.g. "Salary", "Manual")
    pub source: String,
    pub description: String,
    /// When the deposit happened. `None` if the stored date could not be read.
    pub date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Saving {
    pub fn new(
        amount_cents: Cents,
        source: impl Into<String>,
        description: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount_cents,
            source: source.into(),
            description: description.into(),
            date: Some(date),
            created_at: Utc::now(),
        }
    }
}

/// Input for recording a new saving.
#[derive(Debug, Clone)]
pub struct NewSaving {
    pub amount_cents: Cents,
    pub source: String,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl NewSaving {
    pub fn into_saving(self) -> Saving {
        Saving::new(self.amount_cents, self.source, self.description, self.date)
    }
}
