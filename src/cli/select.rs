//! Paper relevance selection command handler.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use reviewdesk::cache::MemoCache;
use reviewdesk::config::Config;
use reviewdesk::llm::{ChatBot, ChatModel, OpenAiProvider};
use reviewdesk::openreview::OpenReviewClient;
use reviewdesk::relevance::{self, relevance_system_prompt, PaperCollector, RelevanceClassifier};

/// Collect a venue's papers, classify each against the keywords and print
/// one report line per paper.
pub(crate) async fn cmd_select_papers(
    mut config: Config,
    venue: Option<String>,
    model: Option<String>,
    keywords: Vec<String>,
) -> Result<()> {
    let venue = venue.unwrap_or_else(|| config.relevance.venue_id.clone());
    if let Some(model) = model {
        config.llm.model = model;
    }
    let keywords = if keywords.is_empty() {
        config.relevance.keywords.clone()
    } else {
        keywords
    };
    if keywords.is_empty() {
        anyhow::bail!("No research keywords configured");
    }

    let chat_model = ChatModel::by_name(&config.llm.model)?;
    let provider = OpenAiProvider::from_config(&config.llm)
        .with_context(|| "Failed to set up the chat provider")?;
    let bot = ChatBot::new(
        Arc::new(provider),
        chat_model,
        &relevance_system_prompt(&keywords),
    );
    let client = OpenReviewClient::connect(&config.openreview)
        .await
        .with_context(|| "Failed to connect to OpenReview")?;
    let cache = MemoCache::new(&config.cache.root);

    let papers = PaperCollector::new(&client, &cache)
        .collect(&venue)
        .await
        .with_context(|| format!("Failed to collect papers for {}", venue))?;
    let classifier = RelevanceClassifier::new(&bot, &cache);
    let outcomes = classifier
        .check_all(&papers)
        .await
        .with_context(|| "Failed to classify papers")?;

    for outcome in &outcomes {
        println!("{}", outcome.report_line());
    }

    let stats = cache.stats();
    info!(
        papers = papers.len(),
        classified = outcomes.len(),
        hits = stats.hits,
        misses = stats.misses,
        "Selection finished"
    );
    // Stored outcomes keep the price of the call that produced them, so the
    // cumulative figure includes classifications paid for in earlier runs.
    println!(
        "Classification cost this run: ${:.4} (cumulative: ${:.4})",
        classifier.spent().await,
        relevance::total_price(&outcomes)
    );
    Ok(())
}
