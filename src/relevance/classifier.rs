//! Keyword relevance classification of collected papers.

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::error::{Result, ReviewDeskError};
use crate::llm::ChatBot;

use super::{PaperRecord, RelevanceOutcome};

/// System message asking for a keyword → bool JSON object.
///
/// The example answer alternates `true`/`false` so the prompt is identical
/// across runs.
pub fn relevance_system_prompt(keywords: &[String]) -> String {
    let keyword_list = serde_json::to_string_pretty(keywords).unwrap_or_default();
    let example: Map<String, Value> = keywords
        .iter()
        .enumerate()
        .map(|(i, k)| (k.clone(), Value::Bool(i % 2 == 0)))
        .collect();
    let example_json = serde_json::to_string_pretty(&example).unwrap_or_default();

    format!(
        "You are a helpful Senior AI Research Assistant. \
         You are responsible for thoroughly reading the provided paper details and their relevance to my research interest. \
         You are provided with a json-structured paper. \
         You are responsible for checking if the paper corresponds to one of the research interests for me. \
         My research interests are as follows:\n {keyword_list} \
         In each case the topic is relevant only if its part of the actual main focus of the paper - not just something done by the way. \
         A good rule of thumb is that a topic is part of the main focus if the authors mention it in the context of the papers contributions. \
         You answer with true or false for each keyword depending whether it is relevant for the paper. \
         It is vital that you respond in a json format. Example response: \n {example_json}"
    )
}

/// The user message for one paper.
pub fn paper_message(paper: &PaperRecord) -> String {
    format!(
        "Context paper to analyze: \n###\n{}\n###\n. \n###\n{}\n###\n. ",
        paper.title, paper.abstract_text
    )
}

/// Memoizes one classification per model and paper.
pub struct RelevanceClassifier<'a, C> {
    bot: &'a ChatBot,
    cache: &'a C,
    /// USD paid for calls made by this instance. Cached outcomes add nothing.
    spent: Mutex<f64>,
}

impl<'a, C: Cache> RelevanceClassifier<'a, C> {
    pub fn new(bot: &'a ChatBot, cache: &'a C) -> Self {
        Self {
            bot,
            cache,
            spent: Mutex::new(0.0),
        }
    }

    /// Cost of the model calls this classifier actually made.
    pub async fn spent(&self) -> f64 {
        *self.spent.lock().await
    }

    /// `<model name>/<paper id>`
    pub fn cache_key(&self, paper: &PaperRecord) -> String {
        format!("{}/{}", self.bot.model().name, paper.id)
    }

    /// Classify `paper`, or return the stored outcome. A reply that is not a
    /// JSON object is recorded as an empty answer.
    pub async fn check(&self, paper: &PaperRecord) -> Result<RelevanceOutcome> {
        self.cache
            .get_or_compute(&self.cache_key(paper), || self.classify(paper))
            .await
    }

    /// [`Self::check`] every paper in order. Papers whose call fails are
    /// logged and left out; cache failures abort.
    pub async fn check_all(&self, papers: &[PaperRecord]) -> Result<Vec<RelevanceOutcome>> {
        let mut outcomes = Vec::with_capacity(papers.len());
        for paper in papers {
            match self.check(paper).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e @ ReviewDeskError::Storage(_)) => return Err(e),
                Err(e) => warn!(paper = %paper.id, error = %e, "Classification failed, skipping"),
            }
        }
        Ok(outcomes)
    }

    async fn classify(&self, paper: &PaperRecord) -> Result<RelevanceOutcome> {
        let classification = self.bot.call(&paper_message(paper)).await?;
        let (response, price) = classification.into_degraded();
        *self.spent.lock().await += price;
        let outcome = RelevanceOutcome {
            data: paper.clone(),
            response,
            price,
        };

        let matched = outcome.matched_keywords();
        if matched.is_empty() {
            info!(paper = %paper.id, title = %paper.title, "NO RELEVANCE");
        } else {
            info!(paper = %paper.id, title = %paper.title, keywords = %matched.join(","), "Relevant paper");
        }
        Ok(outcome)
    }
}
