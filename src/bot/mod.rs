//! Chat-bot input channel.
//!
//! Text commands are parsed into [`BotCommand`]s and executed against the
//! ledger; the transport (Telegram) only moves text in and out.

mod command;
mod telegram;

pub use command::*;
pub use telegram::TelegramBot;

use chrono::Utc;
use tracing::{debug, warn};

use crate::application::LedgerService;
use crate::domain::{format_cents, NewExpense, NewSaving};

pub const HELP_TEXT: &str = "\
Family Money Monitor Bot

Commands:
/expense <amount> <category> <description> - Add expense
/save <amount> <description> - Add savings
/balance - Check current balance
/help - Show this help

Examples:
/expense 25 Food Lunch at restaurant
/save 200 Emergency fund";

/// Executes chat commands against the ledger and produces reply text.
pub struct BotHandler<'a> {
    service: &'a LedgerService,
}

impl<'a> BotHandler<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Handle one message. Returns the reply, or `None` for messages the
    /// bot ignores (plain chat, unknown commands).
    pub async fn handle(&self, sender: Option<&str>, text: &str) -> Option<String> {
        let command = match BotCommand::parse(text) {
            Ok(command) => command,
            Err(BotError::Usage { usage }) => {
                return Some(format!("Invalid input. Use: {}", usage));
            }
            Err(e) => {
                debug!(error = %e, "Ignoring message");
                return None;
            }
        };

        Some(self.execute(sender, command).await)
    }

    async fn execute(&self, sender: Option<&str>, command: BotCommand) -> String {
        match command {
            BotCommand::Expense {
                amount_cents,
                category,
                description,
            } => {
                let input = NewExpense {
                    amount_cents,
                    category: category.clone(),
                    description,
                    family_member: sender.unwrap_or("Unknown").to_string(),
                    date: Utc::now(),
                };
                match self.service.add_expense(input).await {
                    Ok(_) => format!(
                        "Added expense: ${} for {}",
                        format_cents(amount_cents),
                        category
                    ),
                    Err(e) => {
                        warn!(error = %e, "Bot failed to add expense");
                        format!("Error adding expense. Use: {}", EXPENSE_USAGE)
                    }
                }
            }

            BotCommand::Save {
                amount_cents,
                description,
            } => {
                let input = NewSaving {
                    amount_cents,
                    source: "Manual".to_string(),
                    description,
                    date: Utc::now(),
                };
                match self.service.add_saving(input).await {
                    Ok(_) => format!("Added savings: ${}", format_cents(amount_cents)),
                    Err(e) => {
                        warn!(error = %e, "Bot failed to add saving");
                        format!("Error adding savings. Use: {}", SAVE_USAGE)
                    }
                }
            }

            BotCommand::Balance => match self.service.balance().await {
                Ok(balance) => format!(
                    "Total Savings: ${}\nTotal Expenses: ${}\nNet: ${}",
                    format_cents(balance.total_savings),
                    format_cents(balance.total_expenses),
                    format_cents(balance.net)
                ),
                Err(e) => {
                    warn!(error = %e, "Bot failed to compute balance");
                    "Error fetching balance".to_string()
                }
            },

            BotCommand::Help => HELP_TEXT.to_string(),
        }
    }
}
