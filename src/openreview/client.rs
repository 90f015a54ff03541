//! HTTP client for the OpenReview API v2.
//!
//! Auth: `POST /login` with username/password → bearer token. Without
//! credentials the client runs anonymously (public notes only).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::OpenReviewConfig;
use crate::error::{Result, ReviewDeskError};

use super::{Group, Note, NoteQuery, Profile, ReviewPlatform};

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct NotesResponse {
    #[serde(default)]
    notes: Vec<Note>,
}

#[derive(Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct ProfilesResponse {
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// OpenReview API v2 client. Build once and pass by reference.
pub struct OpenReviewClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for OpenReviewClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenReviewClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl OpenReviewClient {
    /// Build a client and log in when both username and password are set.
    pub async fn connect(config: &OpenReviewConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReviewDeskError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        let mut this = Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        };

        match (config.username.as_deref(), config.password.as_deref()) {
            (Some(user), Some(pass)) => {
                this.token = Some(this.login(user, pass).await?);
                info!(user, "Logged in to OpenReview");
            }
            _ => debug!("No OpenReview credentials, continuing anonymously"),
        }
        Ok(this)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let request = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "id": username, "password": password }));
        let response: LoginResponse = self.send(request, "login").await.map_err(|e| match e {
            ReviewDeskError::Lookup(msg) => ReviewDeskError::Provider(msg),
            other => other,
        })?;
        Ok(response.token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ReviewDeskError::Provider(format!("OpenReview {} failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                ReviewDeskError::Provider(format!("Failed to parse OpenReview {} response: {}", what, e))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["message"].as_str().map(String::from))
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            return Err(ReviewDeskError::Lookup(format!("OpenReview {}: {}", what, message)));
        }
        Err(ReviewDeskError::Provider(format!(
            "OpenReview {} returned {}: {}",
            what,
            status.as_u16(),
            message
        )))
    }
}

#[async_trait]
impl ReviewPlatform for OpenReviewClient {
    async fn get_group(&self, id: &str) -> Result<Group> {
        let request = self.client.get(self.url("/groups")).query(&[("id", id)]);
        let response: GroupsResponse = self.send(request, "group lookup").await?;
        response
            .groups
            .into_iter()
            .next()
            .ok_or_else(|| ReviewDeskError::Lookup(format!("group {} not found", id)))
    }

    async fn current_profile(&self) -> Result<Profile> {
        if self.token.is_none() {
            return Err(ReviewDeskError::Lookup(
                "no profile for an anonymous session (set OPENREVIEW_USERNAME / OPENREVIEW_PASSWORD)"
                    .to_string(),
            ));
        }
        let request = self.client.get(self.url("/profiles"));
        let response: ProfilesResponse = self.send(request, "profile lookup").await?;
        response
            .profiles
            .into_iter()
            .next()
            .ok_or_else(|| ReviewDeskError::Lookup("current profile not found".to_string()))
    }

    async fn get_groups_for_member(&self, member: &str) -> Result<Vec<Group>> {
        let request = self
            .client
            .get(self.url("/groups"))
            .query(&[("member", member)]);
        let response: GroupsResponse = self.send(request, "group membership lookup").await?;
        Ok(response.groups)
    }

    async fn get_notes(&self, query: &NoteQuery) -> Result<Vec<Note>> {
        let request = self
            .client
            .get(self.url("/notes"))
            .query(&query.to_query_pairs());
        let response: NotesResponse = self.send(request, "notes query").await?;
        debug!(count = response.notes.len(), "Fetched notes");
        Ok(response.notes)
    }

    async fn get_profiles(&self, ids: &[String]) -> Result<Vec<Profile>> {
        let (emails, tilde_ids): (Vec<&String>, Vec<&String>) =
            ids.iter().partition(|id| id.contains('@'));

        let mut profiles = Vec::with_capacity(ids.len());
        if !tilde_ids.is_empty() {
            let joined = tilde_ids
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let request = self
                .client
                .get(self.url("/profiles"))
                .query(&[("ids", joined.as_str())]);
            let response: ProfilesResponse = self.send(request, "profiles by id").await?;
            profiles.extend(response.profiles);
        }
        if !emails.is_empty() {
            let request = self
                .client
                .post(self.url("/profiles/search"))
                .json(&json!({ "emails": emails }));
            let response: ProfilesResponse = self.send(request, "profiles by email").await?;
            profiles.extend(response.profiles);
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, with_credentials: bool) -> OpenReviewConfig {
        OpenReviewConfig {
            base_url: server.uri(),
            username: with_credentials.then(|| "ac@example.org".to_string()),
            password: with_credentials.then(|| "secret".to_string()),
            timeout_secs: 5,
        }
    }

    async fn logged_in_client(server: &MockServer) -> OpenReviewClient {
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"id": "ac@example.org", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
            .mount(server)
            .await;
        OpenReviewClient::connect(&config_for(server, true))
            .await
            .expect("login should succeed")
    }

    #[tokio::test]
    async fn test_connect_logs_in() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_connect_anonymous_without_credentials() {
        let server = MockServer::start().await;
        let client = OpenReviewClient::connect(&config_for(&server, false))
            .await
            .unwrap();
        assert!(!client.is_authenticated());
        assert!(matches!(
            client.current_profile().await,
            Err(ReviewDeskError::Lookup(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failure_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;
        let err = OpenReviewClient::connect(&config_for(&server, true))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewDeskError::Provider(ref m) if m.contains("Invalid credentials")));
    }

    #[tokio::test]
    async fn test_get_group_sends_token() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .and(query_param("id", "NeurIPS.cc/2024/Conference/Area_Chairs"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "groups": [{"id": "NeurIPS.cc/2024/Conference/Area_Chairs", "members": ["~Ada_Lovelace1"]}]
            })))
            .mount(&server)
            .await;

        let group = client
            .get_group("NeurIPS.cc/2024/Conference/Area_Chairs")
            .await
            .unwrap();
        assert_eq!(group.members, vec!["~Ada_Lovelace1"]);
    }

    #[tokio::test]
    async fn test_get_group_empty_is_lookup_error() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"groups": []})))
            .mount(&server)
            .await;
        assert!(matches!(
            client.get_group("missing").await,
            Err(ReviewDeskError::Lookup(_))
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_lookup_error() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/notes"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Forum not found"})))
            .mount(&server)
            .await;
        let err = client.get_notes(&NoteQuery::forum("nope")).await.unwrap_err();
        assert!(matches!(err, ReviewDeskError::Lookup(ref m) if m.contains("Forum not found")));
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/notes"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;
        let err = client.get_notes(&NoteQuery::forum("f")).await.unwrap_err();
        assert!(matches!(err, ReviewDeskError::Provider(ref m) if m.contains("502")));
    }

    #[tokio::test]
    async fn test_get_notes_passes_filters() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/notes"))
            .and(query_param("invitation", "ICML.cc/2024/Conference/-/Submission"))
            .and(query_param("details", "replicated"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notes": [
                    {"id": "p1", "number": 1, "forum": "p1", "content": {"title": {"value": "One"}}},
                    {"id": "p2", "number": 2, "forum": "p2", "content": {"title": {"value": "Two"}}}
                ],
                "count": 2
            })))
            .mount(&server)
            .await;

        let notes = client
            .get_notes(
                &NoteQuery::invitation("ICML.cc/2024/Conference/-/Submission")
                    .with_details("replicated")
                    .with_limit(1000),
            )
            .await
            .unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].field_str("title"), Some("Two"));
    }

    #[tokio::test]
    async fn test_get_profiles_splits_ids_and_emails() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/profiles"))
            .and(query_param("ids", "~Ada_Lovelace1,~Alan_Turing1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profiles": [{"id": "~Ada_Lovelace1"}, {"id": "~Alan_Turing1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/profiles/search"))
            .and(body_json(json!({"emails": ["grace@example.org"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profiles": [{"id": "~Grace_Hopper1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ids = vec![
            "~Ada_Lovelace1".to_string(),
            "grace@example.org".to_string(),
            "~Alan_Turing1".to_string(),
        ];
        let profiles = client.get_profiles(&ids).await.unwrap();
        let got: Vec<_> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(got, vec!["~Ada_Lovelace1", "~Alan_Turing1", "~Grace_Hopper1"]);
    }

    #[tokio::test]
    async fn test_get_profiles_empty_makes_no_requests() {
        let server = MockServer::start().await;
        let client = OpenReviewClient::connect(&config_for(&server, false))
            .await
            .unwrap();
        assert!(client.get_profiles(&[]).await.unwrap().is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
