//! Paper relevance selection.
//!
//! [`PaperCollector`] turns a venue's submissions into [`PaperRecord`]s
//! (author profiles resolved once and memoized), and
//! [`RelevanceClassifier`] asks the model which research keywords each paper
//! is about (one memoized call per model and paper).

pub mod classifier;
pub mod collector;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::JsonMap;

pub use classifier::{relevance_system_prompt, RelevanceClassifier};
pub use collector::PaperCollector;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A submission as the classifier sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<AuthorRecord>,
}

/// A classified paper: the record, the model's keyword → bool answer and the
/// cost of the call that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceOutcome {
    pub data: PaperRecord,
    pub response: JsonMap,
    pub price: f64,
}

impl RelevanceOutcome {
    /// Keywords the model answered truthily, in response order.
    pub fn matched_keywords(&self) -> Vec<&str> {
        self.response
            .iter()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// `title,kw1|kw2,email,first,last,email,first,last...`
    pub fn report_line(&self) -> String {
        let mut fields = vec![self.data.title.clone(), self.matched_keywords().join("|")];
        for author in &self.data.authors {
            fields.push(author.email.clone());
            fields.push(author.first_name.clone());
            fields.push(author.last_name.clone());
        }
        fields.join(",")
    }
}

/// Sum of the prices of `outcomes`, in USD.
pub fn total_price(outcomes: &[RelevanceOutcome]) -> f64 {
    outcomes.iter().map(|o| o.price).sum()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
