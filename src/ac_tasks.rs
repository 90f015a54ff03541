//! Area-chair discussion report.
//!
//! For every submission the logged-in area chair is assigned to, count the
//! official reviews and their scores, note whether the authors posted a
//! rebuttal, and count reviewer comments in the forum.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Result, ReviewDeskError};
use crate::openreview::{Note, NoteQuery, ReviewPlatform};
use crate::sheets::{CellValue, Row};

const SUBMISSION_PAGE: usize = 1000;
const NOT_AVAILABLE: &str = "N/A";

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcPaperSummary {
    pub paper_title: String,
    pub withdrawn: bool,
    pub paper_number: u64,
    pub num_reviewers: usize,
    /// Mean rating, `None` when no review carries a rating.
    pub avg_score: Option<f64>,
    /// Ratings, highest first.
    pub reviewer_scores: Vec<f64>,
    pub rebuttal: bool,
    pub reviewer_participation: usize,
}

impl AcPaperSummary {
    /// Spreadsheet row. `avg_score` is rounded to two decimals; both score
    /// columns read `N/A` when there are no ratings.
    pub fn to_row(&self) -> Row {
        let avg_score = match self.avg_score {
            Some(avg) => CellValue::from(round2(avg)),
            None => CellValue::from(NOT_AVAILABLE),
        };
        let reviewer_scores = if self.reviewer_scores.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.reviewer_scores
                .iter()
                .map(|s| format_score(*s))
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut row = Row::new();
        row.insert("paper_title".into(), self.paper_title.as_str().into());
        row.insert("withdrawn".into(), self.withdrawn.into());
        row.insert("paper_number".into(), (self.paper_number as i64).into());
        row.insert("num_reviewers".into(), self.num_reviewers.into());
        row.insert("avg_score".into(), avg_score);
        row.insert("reviewer_scores".into(), reviewer_scores.into());
        row.insert("rebuttal?".into(), self.rebuttal.into());
        row.insert(
            "reviewer_participation".into(),
            self.reviewer_participation.into(),
        );
        row
    }
}

/// Two decimals, ties to even (`5.125` → `5.12`).
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        score.to_string()
    }
}

/// Numeric rating from a review's `rating` value: a number, or a string that
/// starts with one (`"6: Weak Accept"`).
pub fn parse_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

/// Aggregate one submission from its forum notes.
pub fn summarize_paper(conference_id: &str, paper: &Note, forum_notes: &[Note]) -> AcPaperSummary {
    let number = paper.number.unwrap_or_default();
    let review_invitation = format!("{conference_id}/Submission{number}/-/Official_Review");

    let reviews: Vec<&Note> = forum_notes
        .iter()
        .filter(|n| n.invitations.iter().any(|i| i == &review_invitation))
        .collect();
    let mut scores: Vec<f64> = reviews
        .iter()
        .filter_map(|r| r.field_value("rating"))
        .filter_map(parse_score)
        .collect();
    scores.sort_by(|a, b| b.total_cmp(a));
    let avg_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    let reviewers: Vec<&str> = reviews.iter().filter_map(|r| r.signer()).collect();
    let rebuttal = forum_notes.iter().any(|n| n.has_field("rebuttal"));
    let reviewer_participation = forum_notes
        .iter()
        .filter(|n| n.has_field("comment"))
        .filter(|n| n.signer().is_some_and(|s| reviewers.contains(&s)))
        .count();

    AcPaperSummary {
        paper_title: paper.field_str("title").unwrap_or_default().to_string(),
        withdrawn: paper
            .field_str("venue")
            .is_some_and(|v| v.contains("Withdrawn")),
        paper_number: number,
        num_reviewers: reviews.len(),
        avg_score,
        reviewer_scores: scores,
        rebuttal,
        reviewer_participation,
    }
}

/// Builds the report for one conference against a [`ReviewPlatform`].
pub struct AcTaskReport<'a> {
    platform: &'a dyn ReviewPlatform,
    conference_id: String,
}

impl<'a> AcTaskReport<'a> {
    pub fn new(platform: &'a dyn ReviewPlatform, conference_id: &str) -> Self {
        Self {
            platform,
            conference_id: conference_id.to_string(),
        }
    }

    /// Summaries for every submission assigned to the current user. Returns
    /// an empty list when the conference has no area chairs or the user is
    /// not one of them.
    pub async fn collect(&self) -> Result<Vec<AcPaperSummary>> {
        let conf = self.conference_id.as_str();
        let ac_group_id = format!("{conf}/Area_Chairs");
        let ac_members = match self.platform.get_group(&ac_group_id).await {
            Ok(group) => group.members,
            Err(ReviewDeskError::Lookup(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        if ac_members.is_empty() {
            info!(conference = conf, "No AC information for conference");
            return Ok(Vec::new());
        }

        let profile = self.platform.current_profile().await?;
        if !ac_members.contains(&profile.id) {
            info!(conference = conf, user = %profile.id, "You are not an area chair for this conference");
            return Ok(Vec::new());
        }

        let submissions = self
            .platform
            .get_notes(
                &NoteQuery::invitation(format!("{conf}/-/Submission"))
                    .with_details("replicated")
                    .with_limit(SUBMISSION_PAGE),
            )
            .await?;
        let ac_groups: Vec<String> = self
            .platform
            .get_groups_for_member(&profile.id)
            .await?
            .into_iter()
            .map(|g| g.id)
            .filter(|id| id.contains("Area_Chairs"))
            .collect();
        info!(
            conference = conf,
            submissions = submissions.len(),
            ac_groups = ac_groups.len(),
            "Fetched submissions"
        );

        let mut summaries = Vec::new();
        for paper in &submissions {
            let Some(number) = paper.number else {
                warn!(paper = %paper.id, "Submission has no number, skipping");
                continue;
            };
            let paper_ac_group = format!("{conf}/Submission{number}/Area_Chairs");
            if !paper.readers.contains(&paper_ac_group) {
                info!(paper = number, "Paper is not part of your area chair task");
                continue;
            }
            if !ac_groups.iter().any(|g| paper.readers.contains(g)) {
                info!(paper = number, "You are not assigned to this paper as an AC");
                continue;
            }

            let forum_notes = match self
                .platform
                .get_notes(&NoteQuery::forum(paper.forum.clone()))
                .await
            {
                Ok(notes) => notes,
                Err(e) => {
                    warn!(paper = number, error = %e, "Failed to fetch forum, skipping");
                    continue;
                }
            };
            summaries.push(summarize_paper(conf, paper, &forum_notes));
        }

        info!(papers = summaries.len(), "Collected AC papers");
        Ok(summaries)
    }
}
