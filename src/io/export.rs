use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Expense, PurchasePlan, Saving};
use crate::storage::RecordOrder;

/// Database snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub expenses: Vec<Expense>,
    pub savings: Vec<Saving>,
    pub purchase_plans: Vec<PurchasePlan>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export expenses to CSV format
    pub async fn export_expenses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.service.list_expenses(RecordOrder::Recorded, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "amount_cents",
            "category",
            "description",
            "family_member",
            "created_at",
        ])?;

        for expense in &expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                format_optional_date(expense.date),
                expense.amount_cents.to_string(),
                expense.category.clone(),
                expense.description.clone(),
                expense.family_member.clone(),
                expense.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export savings to CSV format
    pub async fn export_savings_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let savings = self.service.list_savings(RecordOrder::Recorded, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "amount_cents",
            "source",
            "description",
            "created_at",
        ])?;

        for saving in &savings {
            csv_writer.write_record([
                saving.id.to_string(),
                format_optional_date(saving.date),
                saving.amount_cents.to_string(),
                saving.source.clone(),
                saving.description.clone(),
                saving.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(savings.len())
    }

    /// Export purchase plans to CSV format
    pub async fn export_plans_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let plans = self.service.list_plans().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "name",
            "target_amount_cents",
            "current_saved_cents",
            "target_date",
            "priority",
            "status",
        ])?;

        for plan in &plans {
            csv_writer.write_record([
                plan.id.to_string(),
                plan.name.clone(),
                plan.target_amount_cents.to_string(),
                plan.current_saved_cents.to_string(),
                format_optional_date(plan.target_date),
                plan.priority.as_str().to_string(),
                plan.status.as_str().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(plans.len())
    }

    /// Export full database as JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            expenses: self.service.list_expenses(RecordOrder::Recorded, None).await?,
            savings: self.service.list_savings(RecordOrder::Recorded, None).await?,
            purchase_plans: self.service.list_plans().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

fn format_optional_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339()).unwrap_or_default()
}
