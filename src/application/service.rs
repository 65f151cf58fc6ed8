use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{
    apply_progress, count_undated, group_sum_by_category, group_sum_by_month, net_balance, total,
    Cents, Expense, ExpenseId, NewExpense, NewPlan, NewSaving, PlanId, PurchasePlan, Saving,
    SavingId,
};
use crate::io::extract_receipt_amount;
use crate::storage::{RecordCounts, RecordOrder, Repository};

use super::{AdvisorSnapshot, AppError, BalanceSummary, ProgressUpdate, SpendingAnalysis};

/// How many recent expenses the advisor gets to see.
pub const ADVISOR_EXPENSE_WINDOW: usize = 50;

/// Application service providing high-level operations for the family ledger.
/// This is the context object every client (CLI, bot, advisor) works through.
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!(database = database_path, "Database initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        debug!(database = database_path, "Connected to database");
        Ok(Self::new(repo))
    }

    // ========================
    // Expense operations
    // ========================

    /// Record a new expense.
    pub async fn add_expense(&self, input: NewExpense) -> Result<Expense, AppError> {
        ensure_non_negative(input.amount_cents)?;
        let expense = input.into_expense();
        self.repo.save_expense(&expense).await?;
        info!(
            id = %expense.id,
            amount_cents = expense.amount_cents,
            category = %expense.category,
            "Recorded expense"
        );
        Ok(expense)
    }

    /// Record an expense extracted from receipt text.
    pub async fn add_receipt_expense(
        &self,
        file_name: &str,
        text: &str,
        family_member: Option<String>,
        date: DateTime<Utc>,
    ) -> Result<Expense, AppError> {
        let amount_cents = extract_receipt_amount(text).ok_or_else(|| {
            AppError::InvalidAmount(format!("no amount found in receipt '{}'", file_name))
        })?;

        let expense = Expense::new(
            amount_cents,
            "Receipt",
            format!("Receipt: {}", file_name),
            family_member.unwrap_or_else(|| "Unknown".to_string()),
            date,
        )
        .with_receipt_text(text);

        self.repo.save_expense(&expense).await?;
        info!(id = %expense.id, amount_cents, file = file_name, "Recorded receipt expense");
        Ok(expense)
    }

    /// Store an already built expense as-is (used by imports).
    pub async fn restore_expense(&self, expense: &Expense) -> Result<(), AppError> {
        ensure_non_negative(expense.amount_cents)?;
        Ok(self.repo.save_expense(expense).await?)
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Expense, AppError> {
        self.repo
            .get_expense(id)
            .await?
            .ok_or_else(|| AppError::ExpenseNotFound(id.to_string()))
    }

    /// Check whether an expense exists.
    pub async fn has_expense(&self, id: ExpenseId) -> Result<bool, AppError> {
        Ok(self.repo.get_expense(id).await?.is_some())
    }

    /// List expenses.
    pub async fn list_expenses(
        &self,
        order: RecordOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Expense>, AppError> {
        Ok(self.repo.list_expenses(order, limit).await?)
    }

    // ========================
    // Saving operations
    // ========================

    /// Record a new saving.
    pub async fn add_saving(&self, input: NewSaving) -> Result<Saving, AppError> {
        ensure_non_negative(input.amount_cents)?;
        let saving = input.into_saving();
        self.repo.save_saving(&saving).await?;
        info!(
            id = %saving.id,
            amount_cents = saving.amount_cents,
            source = %saving.source,
            "Recorded saving"
        );
        Ok(saving)
    }

    /// Store an already built saving as-is (used by imports).
    pub async fn restore_saving(&self, saving: &Saving) -> Result<(), AppError> {
        ensure_non_negative(saving.amount_cents)?;
        Ok(self.repo.save_saving(saving).await?)
    }

    /// Get a saving by ID.
    pub async fn get_saving(&self, id: SavingId) -> Result<Saving, AppError> {
        self.repo
            .get_saving(id)
            .await?
            .ok_or_else(|| AppError::SavingNotFound(id.to_string()))
    }

    /// Check whether a saving exists.
    pub async fn has_saving(&self, id: SavingId) -> Result<bool, AppError> {
        Ok(self.repo.get_saving(id).await?.is_some())
    }

    /// List savings.
    pub async fn list_savings(
        &self,
        order: RecordOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Saving>, AppError> {
        Ok(self.repo.list_savings(order, limit).await?)
    }

    /// Sum of every recorded saving.
    pub async fn savings_total(&self) -> Result<Cents, AppError> {
        let savings = self.repo.list_savings(RecordOrder::Recorded, None).await?;
        Ok(total(&savings)?)
    }

    // ========================
    // Purchase plan operations
    // ========================

    /// Create a purchase plan.
    pub async fn create_plan(&self, input: NewPlan) -> Result<PurchasePlan, AppError> {
        ensure_non_negative(input.target_amount_cents)?;
        if let Some(saved) = input.current_saved_cents {
            ensure_non_negative(saved)?;
        }

        let plan = input.into_plan();
        self.repo.save_plan(&plan).await?;
        info!(
            id = %plan.id,
            name = %plan.name,
            target_cents = plan.target_amount_cents,
            "Created purchase plan"
        );
        Ok(plan)
    }

    /// Store an already built plan as-is (used by imports).
    pub async fn restore_plan(&self, plan: &PurchasePlan) -> Result<(), AppError> {
        ensure_non_negative(plan.target_amount_cents)?;
        ensure_non_negative(plan.current_saved_cents)?;
        Ok(self.repo.save_plan(plan).await?)
    }

    /// Get a plan by ID.
    pub async fn get_plan(&self, id: PlanId) -> Result<PurchasePlan, AppError> {
        self.repo
            .get_plan(id)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(id.to_string()))
    }

    /// Check whether a plan exists.
    pub async fn has_plan(&self, id: PlanId) -> Result<bool, AppError> {
        Ok(self.repo.get_plan(id).await?.is_some())
    }

    /// List plans, most urgent first.
    pub async fn list_plans(&self) -> Result<Vec<PurchasePlan>, AppError> {
        Ok(self.repo.list_plans().await?)
    }

    /// Add `delta` to a plan's saved amount.
    ///
    /// The delta is validated against the current snapshot first, then
    /// applied with a single atomic increment in the store, so concurrent
    /// updates to the same plan cannot overwrite each other.
    pub async fn update_plan_progress(
        &self,
        id: PlanId,
        delta: Cents,
    ) -> Result<ProgressUpdate, AppError> {
        let plan = self.get_plan(id).await?;
        apply_progress(&plan, delta)?;

        let current_saved_cents = match self.repo.increment_plan_saved(id, delta).await? {
            Some(value) => value,
            // Lost the row or the guard between the read and the write
            None => {
                let plan = self.get_plan(id).await?;
                apply_progress(&plan, delta)?;
                return Err(AppError::InvalidDelta(format!(
                    "concurrent update rejected delta {} on plan {}",
                    delta, id
                )));
            }
        };

        info!(%id, delta, current_saved_cents, "Updated plan progress");

        Ok(ProgressUpdate {
            success: true,
            plan_id: id.to_string(),
            current_saved_cents,
            target_amount_cents: plan.target_amount_cents,
            goal_reached: current_saved_cents >= plan.target_amount_cents,
        })
    }

    // ========================
    // Reports
    // ========================

    /// Category and month breakdown over all expenses.
    pub async fn spending_analysis(&self) -> Result<SpendingAnalysis, AppError> {
        let expenses = self.repo.list_expenses(RecordOrder::Recorded, None).await?;

        Ok(SpendingAnalysis {
            category_totals: group_sum_by_category(&expenses)?,
            monthly_spending: group_sum_by_month(&expenses)?,
            total_spent: total(&expenses)?,
            excluded_undated: count_undated(&expenses),
        })
    }

    /// Savings total, expenses total and the net between them.
    pub async fn balance(&self) -> Result<BalanceSummary, AppError> {
        let savings = self.repo.list_savings(RecordOrder::Recorded, None).await?;
        let expenses = self.repo.list_expenses(RecordOrder::Recorded, None).await?;

        let total_savings = total(&savings)?;
        let total_expenses = total(&expenses)?;

        Ok(BalanceSummary {
            total_savings,
            total_expenses,
            net: net_balance(total_savings, total_expenses)?,
        })
    }

    /// Everything the advisor needs for one recommendation request.
    pub async fn advisor_snapshot(&self) -> Result<AdvisorSnapshot, AppError> {
        let recent_expenses = self
            .repo
            .list_expenses(RecordOrder::Newest, Some(ADVISOR_EXPENSE_WINDOW))
            .await?;

        Ok(AdvisorSnapshot {
            taken_at: Utc::now(),
            recent_expenses,
            total_savings: self.savings_total().await?,
            plans: self.repo.list_plans().await?,
        })
    }

    /// Number of stored records per collection.
    pub async fn record_counts(&self) -> Result<RecordCounts, AppError> {
        Ok(self.repo.count_records().await?)
    }
}

fn ensure_non_negative(amount_cents: Cents) -> Result<(), AppError> {
    if amount_cents < 0 {
        return Err(AppError::InvalidAmount(
            "Amount must not be negative".to_string(),
        ));
    }
    Ok(())
}
