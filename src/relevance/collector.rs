//! Venue submissions → [`PaperRecord`]s, memoized per paper.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::error::Result;
use crate::openreview::{Note, NoteQuery, Profile, ReviewPlatform};

use super::{AuthorRecord, PaperRecord};

/// Cache key for a collected paper.
pub fn paper_key(paper_id: &str) -> String {
    format!("papers/{paper_id}")
}

pub struct PaperCollector<'a, C> {
    platform: &'a dyn ReviewPlatform,
    cache: &'a C,
}

impl<'a, C: Cache> PaperCollector<'a, C> {
    pub fn new(platform: &'a dyn ReviewPlatform, cache: &'a C) -> Self {
        Self { platform, cache }
    }

    /// Every submission whose `content.venueid` is `venue_id`. Papers already
    /// in the cache are not re-resolved.
    pub async fn collect(&self, venue_id: &str) -> Result<Vec<PaperRecord>> {
        let submissions = self
            .platform
            .get_all_notes(&NoteQuery::content("venueid", venue_id))
            .await?;
        info!(venue = venue_id, submissions = submissions.len(), "Fetched submissions");

        let mut papers = Vec::with_capacity(submissions.len());
        for (idx, submission) in submissions.iter().enumerate() {
            let paper = self
                .cache
                .get_or_compute(&paper_key(&submission.id), || {
                    self.process_one_paper(submission)
                })
                .await?;
            debug!(
                paper = %paper.id,
                progress = %format!("{}/{}", idx + 1, submissions.len()),
                "Collected paper"
            );
            papers.push(paper);
        }
        Ok(papers)
    }

    /// Build the record for one submission, resolving `content.authorids`
    /// to author profiles. Missing author data leaves the author list short
    /// rather than failing the paper.
    pub async fn process_one_paper(&self, submission: &Note) -> Result<PaperRecord> {
        let mut paper = PaperRecord {
            id: submission.id.clone(),
            title: submission.field_str("title").unwrap_or_default().to_string(),
            abstract_text: submission
                .field_str("abstract")
                .unwrap_or_default()
                .to_string(),
            authors: Vec::new(),
        };

        let Some(author_ids) = submission.field_value("authorids").and_then(string_list) else {
            warn!(paper = %submission.id, "Author info unavailable");
            return Ok(paper);
        };
        let profiles = match self.platform.get_profiles(&author_ids).await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(paper = %submission.id, error = %e, "Author info unavailable");
                return Ok(paper);
            }
        };

        for profile in &profiles {
            match author_record(profile) {
                Some(author) => paper.authors.push(author),
                None => warn!(paper = %submission.id, profile = %profile.id, "Author name unavailable"),
            }
        }
        Ok(paper)
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}

fn author_record(profile: &Profile) -> Option<AuthorRecord> {
    let name = profile.content.names.first()?;
    Some(AuthorRecord {
        email: profile.content.preferred_email.clone()?,
        first_name: name.first.clone()?,
        last_name: name.last.clone()?,
    })
}
