use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::advisor::{recommend, OpenRouterClient};
use crate::application::{AppError, LedgerService};
use crate::bot::{BotHandler, TelegramBot};
use crate::config::AppConfig;
use crate::domain::{
    format_cents, parse_delta, parse_non_negative_cents, progress_ratio, Cents, GroupTotal,
    NewExpense, NewPlan, NewSaving, Priority,
};
use crate::io::parse_timestamp;
use crate::storage::RecordOrder;

/// Family Money - household expenses, savings and purchase plans
#[derive(Parser)]
#[command(name = "family-money")]
#[command(about = "Track family expenses, savings and purchase goals")]
#[command(version)]
pub struct Cli {
    /// Database file path (defaults to family-money.db)
    #[arg(short, long, env = "FAMILY_MONEY_DB")]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Savings commands
    #[command(subcommand)]
    Saving(SavingCommands),

    /// Purchase plan commands
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Show savings, expenses and the net balance
    Balance,

    /// Spending breakdown by category and month
    Analysis {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Ask the AI advisor for recommendations
    Advice,

    /// Chat bot commands
    #[command(subcommand)]
    Bot(BotCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: expenses, savings, plans, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import data from CSV or JSON
    Import {
        /// What to import: expenses (CSV), full (JSON snapshot)
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip records whose ID already exists
        #[arg(long)]
        skip_duplicates: bool,
    },

    /// Show how many records the database holds
    Status,
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Category (e.g., "Food", "Transport")
        #[arg(short, long)]
        category: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Family member who spent the money
        #[arg(short, long)]
        member: String,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List expenses
    List {
        /// Order: newest, oldest, recorded
        #[arg(long, default_value = "newest")]
        order: String,

        /// Maximum number of expenses to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one expense
    Show {
        /// Expense ID
        id: String,
    },

    /// Record an expense from a receipt's extracted text
    Receipt {
        /// Text file holding the receipt contents
        file: String,

        /// Family member who spent the money
        #[arg(short, long)]
        member: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SavingCommands {
    /// Record a saving
    Add {
        /// Amount (e.g., "100.00" or "100")
        amount: String,

        /// Where the money came from
        #[arg(short, long)]
        source: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Date of the deposit (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List savings
    List {
        /// Order: newest, oldest, recorded
        #[arg(long, default_value = "newest")]
        order: String,

        /// Maximum number of savings to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the total of all savings
    Total,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a purchase plan
    Create {
        /// What you are saving for
        name: String,

        /// Target amount
        #[arg(short, long)]
        target: String,

        /// Amount already saved
        #[arg(short, long)]
        saved: Option<String>,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: String,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// List purchase plans, most urgent first
    List,

    /// Show one purchase plan
    Show {
        /// Plan ID
        id: String,
    },

    /// Add to (or take from) a plan's saved amount
    Progress {
        /// Plan ID
        id: String,

        /// Amount to add; negative to withdraw
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
}

#[derive(Subcommand)]
pub enum BotCommands {
    /// Run the Telegram bot until interrupted
    Run,

    /// Process a single chat command locally and print the reply
    Send {
        /// Message text, e.g. "/expense 25 Food Lunch"
        text: String,

        /// Sender name used as the family member
        #[arg(long)]
        from: Option<String>,
    },
}

impl Cli {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        let database = config.database.as_str();

        match self.command {
            Commands::Init => {
                LedgerService::init(database).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Expense(cmd) => {
                let service = LedgerService::connect(database).await?;
                run_expense_command(&service, cmd).await?;
            }

            Commands::Saving(cmd) => {
                let service = LedgerService::connect(database).await?;
                run_saving_command(&service, cmd).await?;
            }

            Commands::Plan(cmd) => {
                let service = LedgerService::connect(database).await?;
                run_plan_command(&service, cmd).await?;
            }

            Commands::Balance => {
                let service = LedgerService::connect(database).await?;
                let balance = service.balance().await?;
                println!("Total Savings:  {:>15}", format_cents(balance.total_savings));
                println!("Total Expenses: {:>15}", format_cents(balance.total_expenses));
                println!("{}", "-".repeat(31));
                println!("Net:            {:>15}", format_cents(balance.net));
            }

            Commands::Analysis { format } => {
                let service = LedgerService::connect(database).await?;
                run_analysis_command(&service, &format).await?;
            }

            Commands::Advice => {
                // Fail fast on a missing key before touching the database
                let client = OpenRouterClient::new(&config.advisor).map_err(AppError::from)?;
                let service = LedgerService::connect(database).await?;
                let snapshot = service.advisor_snapshot().await?;
                let result = recommend(&client, &snapshot)
                    .await
                    .map_err(AppError::from)?;

                if result.recommendations.is_empty() {
                    println!("No recommendations returned.");
                } else {
                    println!("Recommendations:");
                    for (i, line) in result.lines().iter().enumerate() {
                        println!("  {}. {}", i + 1, line);
                    }
                }
            }

            Commands::Bot(cmd) => {
                let service = LedgerService::connect(database).await?;
                run_bot_command(&service, &config, cmd).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = LedgerService::connect(database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = LedgerService::connect(database).await?;
                run_import_command(
                    &service,
                    &import_type,
                    input.as_deref(),
                    dry_run,
                    skip_duplicates,
                )
                .await?;
            }

            Commands::Status => {
                let service = LedgerService::connect(database).await?;
                let counts = service.record_counts().await?;
                println!("Database: {}", database);
                println!("  Expenses:       {}", counts.expenses);
                println!("  Savings:        {}", counts.savings);
                println!("  Purchase plans: {}", counts.plans);
            }
        }

        Ok(())
    }
}

async fn run_expense_command(service: &LedgerService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            amount,
            category,
            description,
            member,
            date,
        } => {
            let expense = service
                .add_expense(NewExpense {
                    amount_cents: parse_amount(&amount)?,
                    category,
                    description,
                    family_member: member,
                    date: parse_optional_date(date.as_deref())?,
                })
                .await?;
            println!(
                "Recorded expense: {} for {} ({})",
                format_cents(expense.amount_cents),
                expense.category,
                expense.id
            );
        }

        ExpenseCommands::List { order, limit } => {
            let expenses = service
                .list_expenses(parse_order(&order)?, limit)
                .await?;
            if expenses.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }

            println!(
                "{:<12} {:>12} {:<16} {:<12} DESCRIPTION",
                "DATE", "AMOUNT", "CATEGORY", "MEMBER"
            );
            println!("{}", "-".repeat(72));
            for expense in &expenses {
                println!(
                    "{:<12} {:>12} {:<16} {:<12} {}",
                    format_date(expense.date),
                    format_cents(expense.amount_cents),
                    truncate(&expense.category, 16),
                    truncate(&expense.family_member, 12),
                    expense.description
                );
            }
        }

        ExpenseCommands::Show { id } => {
            let expense = service.get_expense(parse_id(&id)?).await?;
            println!("Expense: {}", expense.id);
            println!("  Amount:      {}", format_cents(expense.amount_cents));
            println!("  Category:    {}", expense.category);
            println!("  Description: {}", expense.description);
            println!("  Member:      {}", expense.family_member);
            println!("  Date:        {}", format_date(expense.date));
            println!(
                "  Recorded:    {}",
                expense.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(text) = &expense.receipt_text {
                println!();
                println!("Receipt text:");
                println!("{}", text);
            }
        }

        ExpenseCommands::Receipt { file, member, date } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read receipt file: {}", file))?;
            let file_name = std::path::Path::new(&file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.clone());

            let expense = service
                .add_receipt_expense(&file_name, &text, member, parse_optional_date(date.as_deref())?)
                .await?;
            println!(
                "Recorded receipt expense: {} ({})",
                format_cents(expense.amount_cents),
                expense.id
            );
        }
    }
    Ok(())
}

async fn run_saving_command(service: &LedgerService, cmd: SavingCommands) -> Result<()> {
    match cmd {
        SavingCommands::Add {
            amount,
            source,
            description,
            date,
        } => {
            let saving = service
                .add_saving(NewSaving {
                    amount_cents: parse_amount(&amount)?,
                    source,
                    description,
                    date: parse_optional_date(date.as_deref())?,
                })
                .await?;
            println!(
                "Recorded saving: {} from {} ({})",
                format_cents(saving.amount_cents),
                saving.source,
                saving.id
            );
        }

        SavingCommands::List { order, limit } => {
            let savings = service.list_savings(parse_order(&order)?, limit).await?;
            if savings.is_empty() {
                println!("No savings found.");
                return Ok(());
            }

            println!(
                "{:<12} {:>12} {:<16} DESCRIPTION",
                "DATE", "AMOUNT", "SOURCE"
            );
            println!("{}", "-".repeat(60));
            for saving in &savings {
                println!(
                    "{:<12} {:>12} {:<16} {}",
                    format_date(saving.date),
                    format_cents(saving.amount_cents),
                    truncate(&saving.source, 16),
                    saving.description
                );
            }
        }

        SavingCommands::Total => {
            let total = service.savings_total().await?;
            println!("Total savings: {}", format_cents(total));
        }
    }
    Ok(())
}

async fn run_plan_command(service: &LedgerService, cmd: PlanCommands) -> Result<()> {
    match cmd {
        PlanCommands::Create {
            name,
            target,
            saved,
            target_date,
            priority,
        } => {
            let priority = priority
                .map(|p| {
                    Priority::from_str(&p).ok_or_else(|| {
                        anyhow::anyhow!("Invalid priority '{}'. Valid: low, medium, high", p)
                    })
                })
                .transpose()?;

            let plan = service
                .create_plan(NewPlan {
                    name,
                    target_amount_cents: parse_amount(&target)?,
                    current_saved_cents: saved.as_deref().map(parse_amount).transpose()?,
                    target_date: parse_date_arg(&target_date)?,
                    priority,
                })
                .await?;
            println!(
                "Created plan: {} (target {}, {}) ({})",
                plan.name,
                format_cents(plan.target_amount_cents),
                plan.priority,
                plan.id
            );
        }

        PlanCommands::List => {
            let plans = service.list_plans().await?;
            if plans.is_empty() {
                println!("No purchase plans found.");
                return Ok(());
            }

            println!(
                "{:<20} {:>12} {:>12} {:>6} {:<8} {:<10} {:<12}",
                "NAME", "SAVED", "TARGET", "PCT", "PRIORITY", "STATUS", "TARGET DATE"
            );
            println!("{}", "-".repeat(86));
            for plan in &plans {
                println!(
                    "{:<20} {:>12} {:>12} {:>5.0}% {:<8} {:<10} {:<12}",
                    truncate(&plan.name, 20),
                    format_cents(plan.current_saved_cents),
                    format_cents(plan.target_amount_cents),
                    progress_ratio(plan) * 100.0,
                    plan.priority,
                    plan.status,
                    format_date(plan.target_date)
                );
            }
        }

        PlanCommands::Show { id } => {
            let plan = service.get_plan(parse_id(&id)?).await?;
            println!("Plan: {}", plan.name);
            println!("  ID:          {}", plan.id);
            println!("  Target:      {}", format_cents(plan.target_amount_cents));
            println!(
                "  Saved:       {} ({:.1}%)",
                format_cents(plan.current_saved_cents),
                progress_ratio(&plan) * 100.0
            );
            println!("  Remaining:   {}", format_cents(plan.remaining_cents()));
            println!("  Target date: {}", format_date(plan.target_date));
            println!("  Priority:    {}", plan.priority);
            println!("  Status:      {}", plan.status);
        }

        PlanCommands::Progress { id, amount } => {
            let delta = parse_delta(&amount).map_err(AppError::from)?;
            let update = service.update_plan_progress(parse_id(&id)?, delta).await?;
            println!(
                "Saved {} of {}",
                format_cents(update.current_saved_cents),
                format_cents(update.target_amount_cents)
            );
            if update.goal_reached {
                println!("Goal reached!");
            }
        }
    }
    Ok(())
}

async fn run_analysis_command(service: &LedgerService, format: &str) -> Result<()> {
    let analysis = service.spending_analysis().await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        "table" => {
            println!("Spending by Category");
            print_groups(&analysis.category_totals, analysis.total_spent);
            println!();
            println!("Spending by Month");
            let mut months = analysis.monthly_spending.clone();
            months.sort_by(|a, b| a.key.cmp(&b.key));
            print_groups(&months, analysis.total_spent);
            if analysis.excluded_undated > 0 {
                println!(
                    "({} expense(s) without a readable date left out of the monthly view)",
                    analysis.excluded_undated
                );
            }
        }
        other => anyhow::bail!("Invalid format '{}'. Valid formats: table, json", other),
    }

    Ok(())
}

fn print_groups(groups: &[GroupTotal], total: Cents) {
    println!("{:<20} {:>12} {:>8}", "KEY", "TOTAL", "COUNT");
    println!("{}", "-".repeat(42));
    for group in groups {
        println!(
            "{:<20} {:>12} {:>8}",
            truncate(&group.key, 20),
            format_cents(group.total),
            group.count
        );
    }
    println!("{}", "-".repeat(42));
    println!("{:<20} {:>12}", "TOTAL", format_cents(total));
}

async fn run_bot_command(service: &LedgerService, config: &AppConfig, cmd: BotCommands) -> Result<()> {
    let handler = BotHandler::new(service);

    match cmd {
        BotCommands::Run => {
            let Some(token) = config.telegram_token.as_deref() else {
                tracing::info!("Telegram bot token not provided");
                println!("Set TELEGRAM_BOT_TOKEN to run the bot.");
                return Ok(());
            };
            let mut bot = TelegramBot::new(token)?;
            bot.run(&handler).await?;
        }

        BotCommands::Send { text, from } => match handler.handle(from.as_deref(), &text).await {
            Some(reply) => println!("{}", reply),
            None => println!("(no reply)"),
        },
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let summary = match export_type {
        "expenses" => format!("{} expenses", exporter.export_expenses_csv(writer).await?),
        "savings" => format!("{} savings", exporter.export_savings_csv(writer).await?),
        "plans" => format!("{} purchase plans", exporter.export_plans_csv(writer).await?),
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            format!(
                "full database: {} expenses, {} savings, {} purchase plans",
                snapshot.expenses.len(),
                snapshot.savings.len(),
                snapshot.purchase_plans.len()
            )
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: expenses, savings, plans, full",
                export_type
            );
        }
    };

    if output.is_some() {
        eprintln!("Exported {}", summary);
    }

    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };

    let result = match import_type {
        "expenses" => importer.import_expenses_csv(reader, options).await?,
        "full" => importer.import_full_json(reader, options).await?,
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: expenses, full",
                import_type
            );
        }
    };

    if dry_run {
        println!("Dry run complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}{}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default(),
                error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_amount(input: &str) -> Result<Cents, AppError> {
    parse_non_negative_cents(input)
        .map_err(|e| AppError::InvalidAmount(format!("'{}': {}. Use '50.00' or '50'", input, e)))
}

fn parse_date_arg(input: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(input).map_err(|e| AppError::MalformedDate(e.to_string()))
}

fn parse_optional_date(input: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    match input {
        Some(date) => parse_date_arg(date),
        None => Ok(Utc::now()),
    }
}

fn parse_order(input: &str) -> Result<RecordOrder> {
    RecordOrder::from_str(input).ok_or_else(|| {
        anyhow::anyhow!("Invalid order '{}'. Valid: newest, oldest, recorded", input)
    })
}

fn parse_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).context("Invalid ID format (expected UUID)")
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_expense_add() {
        let cli = Cli::try_parse_from([
            "family-money",
            "expense",
            "add",
            "25.50",
            "--category",
            "Food",
            "--member",
            "Ana",
            "--date",
            "2024-05-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Expense(ExpenseCommands::Add {
                amount,
                category,
                date,
                ..
            }) => {
                assert_eq!(amount, "25.50");
                assert_eq!(category, "Food");
                assert_eq!(date.as_deref(), Some("2024-05-01"));
            }
            _ => panic!("expected expense add"),
        }
    }

    #[test]
    fn test_cli_accepts_negative_progress() {
        let cli = Cli::try_parse_from([
            "family-money",
            "plan",
            "progress",
            "5b1c6f1e-2d6a-4c55-8a59-3f1f0f7f2a10",
            "-20",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::Plan(PlanCommands::Progress { ref amount, .. }) if amount == "-20"
        ));
    }

    #[test]
    fn test_database_flag() {
        let cli = Cli::try_parse_from(["family-money", "--database", "home.db", "status"]).unwrap();
        assert_eq!(cli.database.as_deref(), Some("home.db"));
    }

    #[test]
    fn test_parse_amount_errors() {
        assert!(matches!(parse_amount("abc"), Err(AppError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-3"), Err(AppError::InvalidAmount(_))));
        assert_eq!(parse_amount("3").unwrap(), 300);
    }

    #[test]
    fn test_parse_date_arg_errors() {
        assert!(matches!(
            parse_date_arg("yesterday"),
            Err(AppError::MalformedDate(_))
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Food", 10), "Food");
        assert_eq!(truncate("Entertainment", 8), "Enter...");
    }
}
