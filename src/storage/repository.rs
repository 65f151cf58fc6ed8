use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    Cents, Expense, ExpenseId, PlanId, PlanStatus, Priority, PurchasePlan, Saving, SavingId,
};

use super::MIGRATION_001_INITIAL;

const EXPENSE_COLUMNS: &str =
    "id, amount_cents, category, description, family_member, date, created_at, receipt_text";
const SAVING_COLUMNS: &str = "id, amount_cents, source, description, date, created_at";
const PLAN_COLUMNS: &str = "id, name, target_amount_cents, current_saved_cents, target_date, priority, status, created_at";

/// Ordering for expense and saving listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrder {
    /// Most recent `date` first; undated records last
    #[default]
    Newest,
    /// Oldest `date` first; undated records last
    Oldest,
    /// Order in which records were recorded
    Recorded,
}

impl RecordOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOrder::Newest => "newest",
            RecordOrder::Oldest => "oldest",
            RecordOrder::Recorded => "recorded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "newest" => Some(RecordOrder::Newest),
            "oldest" => Some(RecordOrder::Oldest),
            "recorded" => Some(RecordOrder::Recorded),
            _ => None,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            RecordOrder::Newest => "ORDER BY date IS NULL, date DESC, created_at DESC",
            RecordOrder::Oldest => "ORDER BY date IS NULL, date ASC, created_at ASC",
            RecordOrder::Recorded => "ORDER BY created_at ASC",
        }
    }
}

/// Number of stored records per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCounts {
    pub expenses: i64,
    pub savings: i64,
    pub plans: i64,
}

/// Repository for persisting and querying expenses, savings and purchase plans.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Expense operations
    // ========================

    /// Save a new expense.
    pub async fn save_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, amount_cents, category, description, family_member, date, created_at, receipt_text)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.amount_cents)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(&expense.family_member)
        .bind(expense.date.map(|dt| dt.to_rfc3339()))
        .bind(expense.created_at.to_rfc3339())
        .bind(&expense.receipt_text)
        .execute(&self.pool)
        .await
        .context("Failed to save expense")?;
        Ok(())
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let query = format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch expense")?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// List expenses in the given order, optionally limited.
    pub async fn list_expenses(&self, order: RecordOrder, limit: Option<usize>) -> Result<Vec<Expense>> {
        let mut query = format!("SELECT {} FROM expenses {}", EXPENSE_COLUMNS, order.sql());
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            amount_cents: row.get("amount_cents"),
            category: row.get("category"),
            description: row.get("description"),
            family_member: row.get("family_member"),
            date: read_lenient_date(row.get("date"), "expenses", &id_str),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            receipt_text: row.get("receipt_text"),
        })
    }

    // ========================
    // Saving operations
    // ========================

    /// Save a new saving.
    pub async fn save_saving(&self, saving: &Saving) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO savings (id, amount_cents, source, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(saving.id.to_string())
        .bind(saving.amount_cents)
        .bind(&saving.source)
        .bind(&saving.description)
        .bind(saving.date.map(|dt| dt.to_rfc3339()))
        .bind(saving.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save saving")?;
        Ok(())
    }

    /// Get a saving by ID.
    pub async fn get_saving(&self, id: SavingId) -> Result<Option<Saving>> {
        let query = format!("SELECT {} FROM savings WHERE id = ?", SAVING_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch saving")?;

        row.as_ref().map(Self::row_to_saving).transpose()
    }

    /// List savings in the given order, optionally limited.
    pub async fn list_savings(&self, order: RecordOrder, limit: Option<usize>) -> Result<Vec<Saving>> {
        let mut query = format!("SELECT {} FROM savings {}", SAVING_COLUMNS, order.sql());
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list savings")?;

        rows.iter().map(Self::row_to_saving).collect()
    }

    fn row_to_saving(row: &sqlx::sqlite::SqliteRow) -> Result<Saving> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Saving {
            id: Uuid::parse_str(&id_str).context("Invalid saving ID")?,
            amount_cents: row.get("amount_cents"),
            source: row.get("source"),
            description: row.get("description"),
            date: read_lenient_date(row.get("date"), "savings", &id_str),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Purchase plan operations
    // ========================

    /// Save a new purchase plan.
    pub async fn save_plan(&self, plan: &PurchasePlan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_plans (id, name, target_amount_cents, current_saved_cents, target_date, priority, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.id.to_string())
        .bind(&plan.name)
        .bind(plan.target_amount_cents)
        .bind(plan.current_saved_cents)
        .bind(plan.target_date.map(|dt| dt.to_rfc3339()))
        .bind(plan.priority.as_str())
        .bind(plan.status.as_str())
        .bind(plan.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save purchase plan")?;
        Ok(())
    }

    /// Get a purchase plan by ID.
    pub async fn get_plan(&self, id: PlanId) -> Result<Option<PurchasePlan>> {
        let query = format!("SELECT {} FROM purchase_plans WHERE id = ?", PLAN_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch purchase plan")?;

        row.as_ref().map(Self::row_to_plan).transpose()
    }

    /// List purchase plans, most urgent priority first, then oldest first.
    pub async fn list_plans(&self) -> Result<Vec<PurchasePlan>> {
        let query = format!(
            r#"
            SELECT {} FROM purchase_plans
            ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END, created_at
            "#,
            PLAN_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list purchase plans")?;

        rows.iter().map(Self::row_to_plan).collect()
    }

    /// Add `delta` to a plan's saved amount in a single statement and return
    /// the new value.
    ///
    /// Returns `None` when no row was updated: the plan does not exist, or
    /// the update would have made the saved amount negative or pushed it
    /// past `i64::MAX`.
    pub async fn increment_plan_saved(&self, id: PlanId, delta: Cents) -> Result<Option<Cents>> {
        // Guards compare against the stored value, which is never negative,
        // so they cannot overflow into REAL
        let row = sqlx::query(
            r#"
            UPDATE purchase_plans
            SET current_saved_cents = current_saved_cents + ?
            WHERE id = ?
              AND ? >= -current_saved_cents
              AND ? <= 9223372036854775807 - current_saved_cents
            RETURNING current_saved_cents
            "#,
        )
        .bind(delta)
        .bind(id.to_string())
        .bind(delta)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update plan progress")?;

        row.map(|r| r.try_get("current_saved_cents"))
            .transpose()
            .context("Invalid saved amount after update")
    }

    fn row_to_plan(row: &sqlx::sqlite::SqliteRow) -> Result<PurchasePlan> {
        let id_str: String = row.get("id");
        let priority_str: String = row.get("priority");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(PurchasePlan {
            id: Uuid::parse_str(&id_str).context("Invalid plan ID")?,
            name: row.get("name"),
            target_amount_cents: row.get("target_amount_cents"),
            current_saved_cents: row.get("current_saved_cents"),
            target_date: read_lenient_date(row.get("target_date"), "purchase_plans", &id_str),
            priority: Priority::from_str(&priority_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid priority: {}", priority_str))?,
            status: PlanStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid plan status: {}", status_str))?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Status
    // ========================

    /// Count records in every collection.
    pub async fn count_records(&self) -> Result<RecordCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM expenses) AS expenses,
                (SELECT COUNT(*) FROM savings) AS savings,
                (SELECT COUNT(*) FROM purchase_plans) AS plans
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count records")?;

        Ok(RecordCounts {
            expenses: row.get("expenses"),
            savings: row.get("savings"),
            plans: row.get("plans"),
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Record dates are read leniently: an unreadable value becomes `None` so a
/// single bad row cannot break a whole listing.
fn read_lenient_date(value: Option<String>, table: &str, id: &str) -> Option<DateTime<Utc>> {
    let value = value?;
    match parse_timestamp(&value) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!(table, id, value = %value, error = %e, "Unreadable stored date");
            None
        }
    }
}
