//! Pure reducers over record snapshots.
//!
//! Nothing here touches the store or mutates its input: callers load a
//! snapshot, hand out borrowed slices and get fresh values back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_cents, Cents, Expense, PurchasePlan, Saving};

/// A record that carries an amount and (maybe) a date.
pub trait LedgerEntry {
    fn amount_cents(&self) -> Cents;
    fn date(&self) -> Option<DateTime<Utc>>;
}

impl LedgerEntry for Expense {
    fn amount_cents(&self) -> Cents {
        self.amount_cents
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }
}

impl LedgerEntry for Saving {
    fn amount_cents(&self) -> Cents {
        self.amount_cents
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }
}

/// Summed amount for one grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: Cents,
    pub count: i64,
}

/// Sum of amounts. Zero for an empty slice.
pub fn total<E: LedgerEntry>(records: &[E]) -> Result<Cents, AggregationError> {
    records
        .iter()
        .try_fold(0 as Cents, |acc, r| checked_sum(acc, r.amount_cents()))
}

/// Sum expense amounts per category, in first-occurrence order.
pub fn group_sum_by_category(expenses: &[Expense]) -> Result<Vec<GroupTotal>, AggregationError> {
    group_by(expenses.iter().map(|e| (e.category.clone(), e.amount_cents)))
}

/// Sum amounts per `YYYY-MM` month (UTC), in first-occurrence order.
///
/// Records without a readable date are left out.
pub fn group_sum_by_month<E: LedgerEntry>(records: &[E]) -> Result<Vec<GroupTotal>, AggregationError> {
    group_by(
        records
            .iter()
            .filter_map(|r| r.date().map(|d| (month_key(d), r.amount_cents()))),
    )
}

/// Number of records `group_sum_by_month` would leave out.
pub fn count_undated<E: LedgerEntry>(records: &[E]) -> usize {
    records.iter().filter(|r| r.date().is_none()).count()
}

/// `YYYY-MM` key for a timestamp.
pub fn month_key(date: DateTime<Utc>) -> String {
    date.format("%Y-%m").to_string()
}

/// Savings minus expenses. Not floored: the result can be negative.
pub fn net_balance(savings_total: Cents, expenses_total: Cents) -> Result<Cents, AggregationError> {
    savings_total.checked_sub(expenses_total).ok_or_else(|| {
        AggregationError::Overflow(format!("{} - {}", savings_total, expenses_total))
    })
}

/// Return a copy of `plan` with `delta` added to its saved amount.
///
/// The target is not a cap; saving past it is allowed.
pub fn apply_progress(plan: &PurchasePlan, delta: Cents) -> Result<PurchasePlan, AggregationError> {
    let current_saved_cents = plan
        .current_saved_cents
        .checked_add(delta)
        .ok_or_else(|| {
            AggregationError::InvalidDelta(format!("adding {} overflows the saved amount", delta))
        })?;

    if current_saved_cents < 0 {
        return Err(AggregationError::InvalidDelta(format!(
            "saved amount would become negative ({})",
            current_saved_cents
        )));
    }

    Ok(PurchasePlan {
        current_saved_cents,
        ..plan.clone()
    })
}

/// Parse a signed progress delta.
pub fn parse_delta(input: &str) -> Result<Cents, AggregationError> {
    parse_cents(input).map_err(|e| AggregationError::InvalidDelta(format!("{:?}: {}", input, e)))
}

/// Fraction of the target already saved. Zero when the target is zero.
pub fn progress_ratio(plan: &PurchasePlan) -> f64 {
    if plan.target_amount_cents <= 0 {
        return 0.0;
    }
    plan.current_saved_cents as f64 / plan.target_amount_cents as f64
}

fn checked_sum(acc: Cents, amount: Cents) -> Result<Cents, AggregationError> {
    acc.checked_add(amount)
        .ok_or_else(|| AggregationError::Overflow(format!("{} + {}", acc, amount)))
}

fn group_by(
    items: impl Iterator<Item = (String, Cents)>,
) -> Result<Vec<GroupTotal>, AggregationError> {
    let mut groups: Vec<GroupTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (key, amount) in items {
        match index.get(&key) {
            Some(&i) => {
                groups[i].total = checked_sum(groups[i].total, amount)?;
                groups[i].count += 1;
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(GroupTotal {
                    key,
                    total: amount,
                    count: 1,
                });
            }
        }
    }

    Ok(groups)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    InvalidDelta(String),
    /// A sum left the representable range of cents.
    Overflow(String),
}

impl std::fmt::Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::InvalidDelta(reason) => write!(f, "Invalid delta: {}", reason),
            AggregationError::Overflow(sum) => write!(f, "Amount overflow: {}", sum),
        }
    }
}

impl std::error::Error for AggregationError {}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn expense(category: &str, amount: Cents) -> Expense {
        Expense::new(amount, category, "test", "Ana", Utc::now())
    }

    fn dated(amount: Cents, y: i32, m: u32, d: u32) -> Expense {
        let date = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        Expense::new(amount, "Food", "test", "Ana", date)
    }

    fn lookup(groups: &[GroupTotal], key: &str) -> Option<Cents> {
        groups.iter().find(|g| g.key == key).map(|g| g.total)
    }

    #[test]
    fn test_total_empty() {
        let records: Vec<Expense> = Vec::new();
        assert_eq!(total(&records), Ok(0));
    }

    #[test]
    fn test_total_sums_amounts() {
        let records = vec![expense("Food", 5000), expense("Food", 2550)];
        assert_eq!(total(&records), Ok(7550));
    }

    #[test]
    fn test_total_is_idempotent() {
        let records = vec![expense("Food", 5000), expense("Rent", 120000)];
        let snapshot = records.clone();

        assert_eq!(total(&records), total(&records));
        assert_eq!(records, snapshot);
    }

    #[test]
    fn test_total_savings() {
        let savings = vec![
            Saving::new(30000, "Salary", "March", Utc::now()),
            Saving::new(1250, "Manual", "Coins", Utc::now()),
        ];
        assert_eq!(total(&savings), Ok(31250));
    }

    #[test]
    fn test_group_sum_by_category() {
        let records = vec![
            expense("Food", 1000),
            expense("Food", 500),
            expense("Transport", 300),
        ];
        let groups = group_sum_by_category(&records).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(lookup(&groups, "Food"), Some(1500));
        assert_eq!(lookup(&groups, "Transport"), Some(300));
        assert_eq!(groups[0].count, 2);
    }

    #[test]
    fn test_group_sum_by_category_first_occurrence_order() {
        let records = vec![
            expense("Transport", 300),
            expense("Food", 1000),
            expense("Transport", 200),
        ];
        let keys: Vec<_> = group_sum_by_category(&records)
            .unwrap()
            .into_iter()
            .map(|g| g.key)
            .collect();
        assert_eq!(keys, vec!["Transport", "Food"]);
    }

    #[test]
    fn test_group_sum_by_category_empty() {
        assert!(group_sum_by_category(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_group_sum_by_month_uses_utc() {
        let late_night = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let records = vec![
            Expense::new(1000, "Food", "a", "Ana", late_night),
            dated(500, 2024, 2, 1),
            dated(250, 2024, 2, 15),
        ];
        let groups = group_sum_by_month(&records).unwrap();

        assert_eq!(lookup(&groups, "2024-01"), Some(1000));
        assert_eq!(lookup(&groups, "2024-02"), Some(750));
    }

    #[test]
    fn test_group_sum_by_month_excludes_undated() {
        let mut broken = dated(9999, 2024, 3, 1);
        broken.date = None;
        let records = vec![dated(1000, 2024, 3, 2), broken, dated(500, 2024, 4, 2)];

        let groups = group_sum_by_month(&records).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(lookup(&groups, "2024-03"), Some(1000));
        assert_eq!(lookup(&groups, "2024-04"), Some(500));
        assert_eq!(count_undated(&records), 1);
    }

    #[test]
    fn test_net_balance() {
        assert_eq!(net_balance(30000, 12000), Ok(18000));
        assert_eq!(net_balance(5000, 8000), Ok(-3000));
    }

    #[test]
    fn test_sums_report_overflow() {
        let records = vec![expense("Food", Cents::MAX), expense("Food", 1)];
        assert!(matches!(total(&records), Err(AggregationError::Overflow(_))));
        assert!(matches!(
            group_sum_by_category(&records),
            Err(AggregationError::Overflow(_))
        ));
        assert!(matches!(
            net_balance(Cents::MIN, 1),
            Err(AggregationError::Overflow(_))
        ));
    }

    #[test]
    fn test_apply_progress() {
        let plan = PurchasePlan::new("TV", 80000, Utc::now()).with_current_saved(10000);
        let updated = apply_progress(&plan, 5000).unwrap();

        assert_eq!(updated.current_saved_cents, 15000);
        assert_eq!(updated.id, plan.id);
        // Input untouched
        assert_eq!(plan.current_saved_cents, 10000);
    }

    #[test]
    fn test_apply_progress_may_exceed_target() {
        let plan = PurchasePlan::new("TV", 10000, Utc::now()).with_current_saved(9000);
        let updated = apply_progress(&plan, 5000).unwrap();
        assert_eq!(updated.current_saved_cents, 14000);
        assert!(updated.is_goal_reached());
    }

    #[test]
    fn test_apply_progress_negative_delta() {
        let plan = PurchasePlan::new("TV", 10000, Utc::now()).with_current_saved(9000);
        assert_eq!(apply_progress(&plan, -4000).unwrap().current_saved_cents, 5000);
        assert!(matches!(
            apply_progress(&plan, -9001),
            Err(AggregationError::InvalidDelta(_))
        ));
    }

    #[test]
    fn test_apply_progress_overflow() {
        let plan = PurchasePlan::new("TV", 10000, Utc::now()).with_current_saved(1);
        assert!(matches!(
            apply_progress(&plan, Cents::MAX),
            Err(AggregationError::InvalidDelta(_))
        ));
    }

    #[test]
    fn test_parse_delta() {
        assert_eq!(parse_delta("50"), Ok(5000));
        assert_eq!(parse_delta("-12.5"), Ok(-1250));
        assert!(matches!(
            parse_delta("NaN"),
            Err(AggregationError::InvalidDelta(_))
        ));
        assert!(matches!(
            parse_delta(""),
            Err(AggregationError::InvalidDelta(_))
        ));
    }

    #[test]
    fn test_progress_ratio() {
        let plan = PurchasePlan::new("TV", 20000, Utc::now()).with_current_saved(5000);
        assert!((progress_ratio(&plan) - 0.25).abs() < f64::EPSILON);

        let zero_target = PurchasePlan::new("Free", 0, Utc::now());
        assert_eq!(progress_ratio(&zero_target), 0.0);
    }
}
