//! AI-generated spending recommendations.
//!
//! The ledger data is turned into a prompt, sent to a language model through
//! an [`Advisor`], and the reply is parsed back into a list of
//! recommendations.

mod openrouter;

pub use openrouter::OpenRouterClient;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::application::AdvisorSnapshot;
use crate::domain::format_cents;

/// Number of recent expenses quoted in the prompt.
pub const PROMPT_EXPENSE_COUNT: usize = 10;

#[derive(Error, Debug)]
pub enum AdvisorError {
    /// No usable API key. Callers report this as "service unavailable".
    #[error("{0}")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A language model that completes a single user prompt.
pub trait Advisor {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, AdvisorError>> + Send;
}

/// Parsed model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Plain strings or structured objects, as the model chose to send them
    #[serde(default)]
    pub recommendations: Vec<Value>,
}

impl Recommendations {
    /// One display line per recommendation.
    pub fn lines(&self) -> Vec<String> {
        self.recommendations.iter().map(describe).collect()
    }
}

/// Ask the advisor for recommendations on the given snapshot.
pub async fn recommend<A: Advisor>(
    advisor: &A,
    snapshot: &AdvisorSnapshot,
) -> Result<Recommendations, AdvisorError> {
    let prompt = build_prompt(snapshot);
    let reply = advisor.complete(&prompt).await?;
    parse_recommendations(&reply)
}

/// Build the recommendation prompt.
pub fn build_prompt(snapshot: &AdvisorSnapshot) -> String {
    let expenses: Vec<Value> = snapshot
        .recent_expenses
        .iter()
        .take(PROMPT_EXPENSE_COUNT)
        .map(|e| {
            json!({
                "date": e.date.map(|d| d.format("%Y-%m-%d").to_string()),
                "amount": format_cents(e.amount_cents),
                "category": e.category,
                "description": e.description,
                "familyMember": e.family_member,
            })
        })
        .collect();

    let plans: Vec<Value> = snapshot
        .plans
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "targetAmount": format_cents(p.target_amount_cents),
                "currentSaved": format_cents(p.current_saved_cents),
                "targetDate": p.target_date.map(|d| d.format("%Y-%m-%d").to_string()),
                "priority": p.priority.as_str(),
                "status": p.status.as_str(),
            })
        })
        .collect();

    format!(
        "Based on this family financial data, provide recommendations:\n\n\
         Recent expenses: {}\n\
         Total savings: ${}\n\
         Purchase plans: {}\n\n\
         Provide 3-5 specific recommendations for:\n\
         1. Reducing wasteful spending\n\
         2. Optimizing savings strategy\n\
         3. Achieving purchase goals\n\n\
         Format as JSON with recommendations array.",
        Value::Array(expenses),
        format_cents(snapshot.total_savings),
        Value::Array(plans),
    )
}

/// Parse a model reply into recommendations.
///
/// An empty reply yields no recommendations. Markdown code fences around the
/// JSON are tolerated.
pub fn parse_recommendations(reply: &str) -> Result<Recommendations, AdvisorError> {
    let body = strip_code_fence(reply.trim());
    if body.is_empty() {
        return Ok(Recommendations::default());
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let recommendations = match map.get("recommendations") {
                Some(Value::Array(items)) => items.clone(),
                Some(other) => vec![other.clone()],
                None => Vec::new(),
            };
            Ok(Recommendations { recommendations })
        }
        Ok(Value::Array(items)) => Ok(Recommendations {
            recommendations: items,
        }),
        Ok(other) => Err(AdvisorError::InvalidResponse(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(AdvisorError::InvalidResponse(e.to_string())),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn describe(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            let title = ["title", "category", "area"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str));
            let text = ["recommendation", "description", "text", "advice"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str));
            match (title, text) {
                (Some(title), Some(text)) => format!("{}: {}", title, text),
                (None, Some(text)) | (Some(text), None) => text.to_string(),
                (None, None) => item.to_string(),
            }
        }
        other => other.to_string(),
    }
}
