use thiserror::Error;

use crate::domain::{parse_non_negative_cents, Cents};

pub const EXPENSE_USAGE: &str = "/expense 50 Food Groceries";
pub const SAVE_USAGE: &str = "/save 100 Emergency fund";

const DEFAULT_EXPENSE_CATEGORY: &str = "Other";
const DEFAULT_EXPENSE_DESCRIPTION: &str = "Telegram expense";
const DEFAULT_SAVING_DESCRIPTION: &str = "Telegram savings";

/// A chat command understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Expense {
        amount_cents: Cents,
        category: String,
        description: String,
    },
    Save {
        amount_cents: Cents,
        description: String,
    },
    Balance,
    Help,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("not a command")]
    NotACommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid arguments, use: {usage}")]
    Usage { usage: &'static str },
}

impl BotCommand {
    /// Parse a chat message.
    ///
    /// Commands are the first word of the message; a `@botname` suffix on
    /// the command is ignored.
    pub fn parse(text: &str) -> Result<Self, BotError> {
        let mut words = text.split_whitespace();
        let head = words.next().ok_or(BotError::NotACommand)?;
        let command = head.strip_prefix('/').ok_or(BotError::NotACommand)?;
        let command = command.split('@').next().unwrap_or(command);
        let args: Vec<&str> = words.collect();

        match command.to_lowercase().as_str() {
            "expense" => {
                let amount_cents = parse_amount(args.first(), EXPENSE_USAGE)?;
                let category = args
                    .get(1)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| DEFAULT_EXPENSE_CATEGORY.to_string());
                let description = join_or(&args[args.len().min(2)..], DEFAULT_EXPENSE_DESCRIPTION);
                Ok(BotCommand::Expense {
                    amount_cents,
                    category,
                    description,
                })
            }
            "save" => {
                let amount_cents = parse_amount(args.first(), SAVE_USAGE)?;
                let description = join_or(&args[args.len().min(1)..], DEFAULT_SAVING_DESCRIPTION);
                Ok(BotCommand::Save {
                    amount_cents,
                    description,
                })
            }
            "balance" => Ok(BotCommand::Balance),
            "help" | "start" => Ok(BotCommand::Help),
            other => Err(BotError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_amount(word: Option<&&str>, usage: &'static str) -> Result<Cents, BotError> {
    let word: &str = word.ok_or(BotError::Usage { usage })?;
    let word = word.strip_prefix('$').unwrap_or(word);
    parse_non_negative_cents(word).map_err(|_| BotError::Usage { usage })
}

fn join_or(words: &[&str], default: &str) -> String {
    if words.is_empty() {
        default.to_string()
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expense() {
        assert_eq!(
            BotCommand::parse("/expense 25 Food Lunch at restaurant"),
            Ok(BotCommand::Expense {
                amount_cents: 2500,
                category: "Food".into(),
                description: "Lunch at restaurant".into(),
            })
        );
    }

    #[test]
    fn test_parse_expense_defaults() {
        assert_eq!(
            BotCommand::parse("/expense 12.5"),
            Ok(BotCommand::Expense {
                amount_cents: 1250,
                category: "Other".into(),
                description: "Telegram expense".into(),
            })
        );
    }

    #[test]
    fn test_parse_expense_invalid_amount() {
        assert_eq!(
            BotCommand::parse("/expense lots Food"),
            Err(BotError::Usage {
                usage: EXPENSE_USAGE
            })
        );
        assert_eq!(
            BotCommand::parse("/expense"),
            Err(BotError::Usage {
                usage: EXPENSE_USAGE
            })
        );
        assert_eq!(
            BotCommand::parse("/expense -5 Food"),
            Err(BotError::Usage {
                usage: EXPENSE_USAGE
            })
        );
    }

    #[test]
    fn test_parse_save() {
        assert_eq!(
            BotCommand::parse("/save $200 Emergency fund"),
            Ok(BotCommand::Save {
                amount_cents: 20000,
                description: "Emergency fund".into(),
            })
        );
        assert_eq!(
            BotCommand::parse("/save 5"),
            Ok(BotCommand::Save {
                amount_cents: 500,
                description: "Telegram savings".into(),
            })
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(BotCommand::parse("/balance"), Ok(BotCommand::Balance));
        assert_eq!(BotCommand::parse("/help@family_bot"), Ok(BotCommand::Help));
        assert_eq!(BotCommand::parse("/start"), Ok(BotCommand::Help));
    }

    #[test]
    fn test_parse_non_commands() {
        assert_eq!(BotCommand::parse("hello"), Err(BotError::NotACommand));
        assert_eq!(BotCommand::parse("   "), Err(BotError::NotACommand));
        assert_eq!(
            BotCommand::parse("/dance"),
            Err(BotError::UnknownCommand("dance".into()))
        );
    }
}
