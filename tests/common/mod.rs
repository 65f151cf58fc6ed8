// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use family_money::application::LedgerService;
use family_money::domain::{Cents, Expense, NewExpense, NewPlan, NewSaving, Priority, PurchasePlan, Saving};
use family_money::storage::Repository;
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Like `test_service`, but also hands out the raw pool so tests can plant
/// rows the service would never write
pub async fn test_service_with_pool() -> Result<(LedgerService, SqlitePool, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.display());

    let pool = SqlitePool::connect(&url).await?;
    let repo = Repository::new(pool.clone());
    repo.migrate().await?;
    Ok((LedgerService::new(repo), pool, temp_dir))
}

/// Insert an expense whose stored date cannot be read back
pub async fn insert_unreadable_expense(pool: &SqlitePool, amount_cents: Cents) -> Result<()> {
    sqlx::query(
        "INSERT INTO expenses (id, amount_cents, category, description, family_member, date, created_at)
         VALUES (?, ?, 'Food', 'legacy row', 'Ana', 'someday', '2024-01-01T00:00:00+00:00')",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(amount_cents)
    .execute(pool)
    .await?;
    Ok(())
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub async fn add_expense(
    service: &LedgerService,
    amount_cents: Cents,
    category: &str,
    date: &str,
) -> Result<Expense> {
    Ok(service
        .add_expense(NewExpense {
            amount_cents,
            category: category.to_string(),
            description: format!("{} purchase", category),
            family_member: "Ana".to_string(),
            date: parse_date(date),
        })
        .await?)
}

pub async fn add_saving(service: &LedgerService, amount_cents: Cents, date: &str) -> Result<Saving> {
    Ok(service
        .add_saving(NewSaving {
            amount_cents,
            source: "Salary".to_string(),
            description: "Monthly transfer".to_string(),
            date: parse_date(date),
        })
        .await?)
}

pub async fn create_plan(
    service: &LedgerService,
    name: &str,
    target_cents: Cents,
    saved_cents: Option<Cents>,
    priority: Option<Priority>,
) -> Result<PurchasePlan> {
    Ok(service
        .create_plan(NewPlan {
            name: name.to_string(),
            target_amount_cents: target_cents,
            current_saved_cents: saved_cents,
            target_date: parse_date("2025-12-01"),
            priority,
        })
        .await?)
}

/// Test fixture: the three-expense month used by several analysis tests
pub struct SampleLedger;

impl SampleLedger {
    /// Food 10.00 and Transport 5.00 in January, Food 20.00 in February
    pub async fn create(service: &LedgerService) -> Result<()> {
        add_expense(service, 1000, "Food", "2024-01-05").await?;
        add_expense(service, 500, "Transport", "2024-01-20").await?;
        add_expense(service, 2000, "Food", "2024-02-03").await?;
        Ok(())
    }
}
