use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Read;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{Cents, Expense};
use crate::io::export::DatabaseSnapshot;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    /// CSV line, or position in the snapshot collection (1-based)
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
}

/// Importer for loading data into the ledger
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import expenses from CSV in the layout `export expenses` writes.
    pub async fn import_expenses_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let id_str = record.get(0).unwrap_or("");
            let date_str = record.get(1).unwrap_or("");
            let amount_str = record.get(2).unwrap_or("");
            let category = record.get(3).unwrap_or("Other");
            let description = record.get(4).unwrap_or("");
            let family_member = record.get(5).unwrap_or("Unknown");
            let created_at_str = record.get(6).unwrap_or("");

            let amount_cents: Cents = match amount_str.trim().parse() {
                Ok(a) if a >= 0 => a,
                _ => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("amount_cents".to_string()),
                        error: format!("Invalid amount: {:?}", amount_str),
                    });
                    continue;
                }
            };

            // Undated rows are exported with an empty date cell
            let date = match parse_optional_timestamp(date_str) {
                Ok(d) => d,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let created_at = match parse_optional_timestamp(created_at_str) {
                Ok(c) => c,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("created_at".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let mut expense =
                Expense::new(amount_cents, category, description, family_member, Utc::now());
            expense.date = date;
            if let Some(created_at) = created_at {
                expense.created_at = created_at;
            }
            if let Ok(id) = Uuid::parse_str(id_str) {
                if self.service.has_expense(id).await? {
                    if options.skip_duplicates {
                        result.skipped += 1;
                    } else {
                        result.errors.push(ImportError {
                            line,
                            field: Some("id".to_string()),
                            error: format!("Expense {} already exists", id),
                        });
                    }
                    continue;
                }
                expense.id = id;
            }

            if options.dry_run {
                result.imported += 1;
                continue;
            }

            match self.service.restore_expense(&expense).await {
                Ok(()) => result.imported += 1,
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("Expense creation failed: {}", e),
                }),
            }
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Expense CSV import finished"
        );
        Ok(result)
    }

    /// Import full database from JSON snapshot
    pub async fn import_full_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: DatabaseSnapshot = serde_json::from_reader(reader)?;
        debug!(
            version = %snapshot.version,
            exported_at = %snapshot.exported_at,
            "Importing snapshot"
        );

        let mut result = ImportResult::default();

        for (i, expense) in snapshot.expenses.iter().enumerate() {
            let exists = self.service.has_expense(expense.id).await?;
            let outcome = self
                .import_one(exists, &options, || self.service.restore_expense(expense))
                .await;
            result.record(i + 1, "expense", expense.id, outcome, &options);
        }

        for (i, saving) in snapshot.savings.iter().enumerate() {
            let exists = self.service.has_saving(saving.id).await?;
            let outcome = self
                .import_one(exists, &options, || self.service.restore_saving(saving))
                .await;
            result.record(i + 1, "saving", saving.id, outcome, &options);
        }

        for (i, plan) in snapshot.purchase_plans.iter().enumerate() {
            let exists = self.service.has_plan(plan.id).await?;
            let outcome = self
                .import_one(exists, &options, || self.service.restore_plan(plan))
                .await;
            result.record(i + 1, "plan", plan.id, outcome, &options);
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Snapshot import finished"
        );
        Ok(result)
    }

    async fn import_one<F, Fut>(&self, exists: bool, options: &ImportOptions, restore: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), crate::application::AppError>>,
    {
        if exists {
            return Outcome::Duplicate;
        }
        if options.dry_run {
            return Outcome::Imported;
        }
        match restore().await {
            Ok(()) => Outcome::Imported,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

enum Outcome {
    Imported,
    Duplicate,
    Failed(String),
}

impl ImportResult {
    fn record(&mut self, line: usize, kind: &str, id: Uuid, outcome: Outcome, options: &ImportOptions) {
        match outcome {
            Outcome::Imported => self.imported += 1,
            Outcome::Duplicate if options.skip_duplicates => self.skipped += 1,
            Outcome::Duplicate => self.errors.push(ImportError {
                line,
                field: Some("id".to_string()),
                error: format!("{} {} already exists", kind, id),
            }),
            Outcome::Failed(error) => self.errors.push(ImportError {
                line,
                field: None,
                error: format!("{} {}: {}", kind, id, error),
            }),
        }
    }
}

/// Like [`parse_timestamp`], but a blank cell means "no value".
fn parse_optional_timestamp(s: &str) -> Result<Option<DateTime<Utc>>> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    parse_timestamp(s).map(Some)
}

/// Parse a user supplied date: RFC 3339 or `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    anyhow::bail!("Invalid date format: {:?} (expected YYYY-MM-DD)", s)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let day = parse_timestamp("2024-03-15").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2024, 3, 15));
        assert_eq!(day.hour(), 0);

        let rfc = parse_timestamp("2024-03-15T22:30:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 20);
    }

    #[test]
    fn test_parse_optional_timestamp() {
        assert_eq!(parse_optional_timestamp("  ").unwrap(), None);
        assert!(parse_optional_timestamp("2024-03-15").unwrap().is_some());
        assert!(parse_optional_timestamp("soon").is_err());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("15/03/2024").is_err());
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("2024-02-30").is_err());
    }
}
