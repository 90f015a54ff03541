//! OpenReview (API v2) data model and client.
//!
//! [`ReviewPlatform`] is the seam the report builders depend on;
//! [`OpenReviewClient`] is the HTTP implementation. Tests substitute fakes.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub use client::OpenReviewClient;

/// Page size used by [`ReviewPlatform::get_all_notes`].
pub const PAGE_SIZE: usize = 1000;

/// A forum note: submission, review, comment, rebuttal, decision...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub id: String,
    pub number: Option<u64>,
    pub forum: String,
    pub invitations: Vec<String>,
    pub readers: Vec<String>,
    pub signatures: Vec<String>,
    /// Field name → `{"value": ...}` (API v2 shape).
    pub content: Map<String, Value>,
}

impl Note {
    /// Returns `true` if the content has a field named `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.content.contains_key(field)
    }

    /// The `value` of content field `field`.
    pub fn field_value(&self, field: &str) -> Option<&Value> {
        self.content.get(field).and_then(|f| f.get("value"))
    }

    /// The `value` of content field `field` if it is a string.
    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.field_value(field).and_then(Value::as_str)
    }

    /// First signature, the note's author group.
    pub fn signer(&self) -> Option<&str> {
        self.signatures.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub content: ProfileContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileContent {
    pub preferred_email: Option<String>,
    pub emails: Vec<String>,
    pub names: Vec<ProfileName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileName {
    pub first: Option<String>,
    pub last: Option<String>,
    pub fullname: Option<String>,
}

/// Filter for `GET /notes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteQuery {
    pub invitation: Option<String>,
    pub forum: Option<String>,
    pub details: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// `content.<field>=<value>` filters.
    pub content: Vec<(String, String)>,
}

impl NoteQuery {
    pub fn invitation(invitation: impl Into<String>) -> Self {
        Self {
            invitation: Some(invitation.into()),
            ..Default::default()
        }
    }

    pub fn forum(forum: impl Into<String>) -> Self {
        Self {
            forum: Some(forum.into()),
            ..Default::default()
        }
    }

    pub fn content(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            content: vec![(field.into(), value.into())],
            ..Default::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Query-string pairs in a stable order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(invitation) = &self.invitation {
            pairs.push(("invitation".to_string(), invitation.clone()));
        }
        if let Some(forum) = &self.forum {
            pairs.push(("forum".to_string(), forum.clone()));
        }
        for (field, value) in &self.content {
            pairs.push((format!("content.{field}"), value.clone()));
        }
        if let Some(details) = &self.details {
            pairs.push(("details".to_string(), details.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

/// Read access to a review platform.
#[async_trait]
pub trait ReviewPlatform: Send + Sync {
    /// Group by id. Absent groups are [`crate::error::ReviewDeskError::Lookup`].
    async fn get_group(&self, id: &str) -> Result<Group>;

    /// Profile of the logged-in user.
    async fn current_profile(&self) -> Result<Profile>;

    /// Groups that list `member` among their members.
    async fn get_groups_for_member(&self, member: &str) -> Result<Vec<Group>>;

    /// One page of notes matching `query`.
    async fn get_notes(&self, query: &NoteQuery) -> Result<Vec<Note>>;

    /// Profiles for tilde ids (`~First_Last1`) and/or email addresses.
    async fn get_profiles(&self, ids: &[String]) -> Result<Vec<Profile>>;

    /// Every note matching `query`, following offsets until a short page.
    async fn get_all_notes(&self, query: &NoteQuery) -> Result<Vec<Note>> {
        let mut all = Vec::new();
        let mut offset = query.offset.unwrap_or(0);
        loop {
            let page_query = query.clone().with_limit(PAGE_SIZE).with_offset(offset);
            let page = self.get_notes(&page_query).await?;
            let fetched = page.len();
            all.extend(page);
            if fetched < PAGE_SIZE {
                return Ok(all);
            }
            offset += fetched;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_note_field_access() {
        let note: Note = serde_json::from_value(json!({
            "id": "abc",
            "number": 7,
            "forum": "abc",
            "signatures": ["NeurIPS.cc/2024/Conference/Submission7/Reviewer_x1"],
            "content": {
                "title": {"value": "Attention Is Enough"},
                "rating": {"value": 6},
                "rebuttal": {"value": "We thank the reviewers"}
            }
        }))
        .unwrap();

        assert_eq!(note.number, Some(7));
        assert_eq!(note.field_str("title"), Some("Attention Is Enough"));
        assert_eq!(note.field_value("rating"), Some(&json!(6)));
        assert!(note.has_field("rebuttal"));
        assert!(!note.has_field("comment"));
        assert!(note.readers.is_empty());
        assert_eq!(
            note.signer(),
            Some("NeurIPS.cc/2024/Conference/Submission7/Reviewer_x1")
        );
    }

    #[test]
    fn test_profile_deserialize() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "~Ada_Lovelace1",
            "content": {
                "preferredEmail": "ada@example.org",
                "names": [{"first": "Ada", "last": "Lovelace", "fullname": "Ada Lovelace"}]
            }
        }))
        .unwrap();
        assert_eq!(
            profile.content.preferred_email.as_deref(),
            Some("ada@example.org")
        );
        assert_eq!(profile.content.names[0].last.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn test_note_query_pairs() {
        let query = NoteQuery::invitation("ICML.cc/2024/Conference/-/Submission")
            .with_details("replicated")
            .with_limit(1000);
        assert_eq!(
            query.to_query_pairs(),
            vec![
                (
                    "invitation".to_string(),
                    "ICML.cc/2024/Conference/-/Submission".to_string()
                ),
                ("details".to_string(), "replicated".to_string()),
                ("limit".to_string(), "1000".to_string()),
            ]
        );

        let query = NoteQuery::content("venueid", "ICML.cc/2024/Conference");
        assert_eq!(
            query.to_query_pairs(),
            vec![(
                "content.venueid".to_string(),
                "ICML.cc/2024/Conference".to_string()
            )]
        );
    }

    /// Serves `total` numbered notes in pages and records each requested offset.
    struct PagedPlatform {
        total: usize,
        offsets: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ReviewPlatform for PagedPlatform {
        async fn get_group(&self, _id: &str) -> Result<Group> {
            unimplemented!()
        }
        async fn current_profile(&self) -> Result<Profile> {
            unimplemented!()
        }
        async fn get_groups_for_member(&self, _member: &str) -> Result<Vec<Group>> {
            unimplemented!()
        }
        async fn get_notes(&self, query: &NoteQuery) -> Result<Vec<Note>> {
            let offset = query.offset.unwrap_or(0);
            let limit = query.limit.unwrap_or(PAGE_SIZE);
            self.offsets.lock().unwrap().push(offset);
            Ok((offset..self.total.min(offset + limit))
                .map(|i| Note {
                    id: format!("n{i}"),
                    ..Default::default()
                })
                .collect())
        }
        async fn get_profiles(&self, _ids: &[String]) -> Result<Vec<Profile>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_get_all_notes_follows_offsets() {
        let platform = PagedPlatform {
            total: PAGE_SIZE * 2 + 5,
            offsets: Mutex::new(Vec::new()),
        };
        let notes = platform
            .get_all_notes(&NoteQuery::content("venueid", "X"))
            .await
            .unwrap();
        assert_eq!(notes.len(), PAGE_SIZE * 2 + 5);
        assert_eq!(notes.last().unwrap().id, format!("n{}", PAGE_SIZE * 2 + 4));
        assert_eq!(
            *platform.offsets.lock().unwrap(),
            vec![0, PAGE_SIZE, PAGE_SIZE * 2]
        );
    }

    #[tokio::test]
    async fn test_get_all_notes_exact_page_boundary() {
        let platform = PagedPlatform {
            total: PAGE_SIZE,
            offsets: Mutex::new(Vec::new()),
        };
        let notes = platform.get_all_notes(&NoteQuery::default()).await.unwrap();
        assert_eq!(notes.len(), PAGE_SIZE);
        // Full first page forces one more (empty) request.
        assert_eq!(*platform.offsets.lock().unwrap(), vec![0, PAGE_SIZE]);
    }
}
