//! Google Sheets v4 worksheet as a [`TabularSink`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::config::SheetsConfig;
use crate::error::{Result, ReviewDeskError};

use super::auth::{ServiceAccountKey, SHEETS_SCOPE};
use super::{a1_range, CellValue, TabularSink};

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// One worksheet (tab) of a spreadsheet.
pub struct GoogleSheet {
    client: Client,
    access_token: String,
    api_base: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl std::fmt::Debug for GoogleSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheet")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .finish()
    }
}

impl GoogleSheet {
    /// Authenticate with the configured service-account key and bind to the
    /// configured worksheet.
    pub async fn connect(config: &SheetsConfig) -> Result<Self> {
        let key_file = config.key_file.as_deref().ok_or_else(|| {
            ReviewDeskError::Config(
                "No service-account key. Set sheets.key_file or REVIEWDESK_SHEETS_KEY_FILE."
                    .to_string(),
            )
        })?;
        let spreadsheet_id = config.spreadsheet_id.as_deref().ok_or_else(|| {
            ReviewDeskError::Config(
                "No spreadsheet id. Set sheets.spreadsheet_id or REVIEWDESK_SHEETS_SPREADSHEET_ID."
                    .to_string(),
            )
        })?;

        let key = ServiceAccountKey::from_file(key_file)?;
        let client = build_client()?;
        let access_token = key.fetch_access_token(&client, SHEETS_SCOPE).await?;
        Ok(Self {
            client,
            access_token,
            api_base: config.api_base.clone(),
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: config.sheet_name.clone(),
        })
    }

    /// Bind with an already-issued access token.
    pub fn with_token(
        api_base: &str,
        spreadsheet_id: &str,
        sheet_name: &str,
        access_token: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            access_token: access_token.to_string(),
            api_base: api_base.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
        })
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// `{api_base}/spreadsheets/{id}/<segments...>` with each segment
    /// percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            ReviewDeskError::Config(format!("Invalid Sheets API base {}: {}", self.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ReviewDeskError::Config(format!("Invalid Sheets API base {}", self.api_base))
            })?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    fn whole_sheet(&self) -> String {
        format!("'{}'", self.sheet_name.replace('\'', "''"))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ReviewDeskError::Sheet(format!("Sheets {} failed: {}", what, e)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(body);
        Err(ReviewDeskError::Sheet(format!(
            "Sheets {} returned {}: {}",
            what,
            status.as_u16(),
            message
        )))
    }
}

#[async_trait]
impl TabularSink for GoogleSheet {
    async fn clear(&self) -> Result<()> {
        let range = format!("{}:clear", self.whole_sheet());
        let url = self.endpoint(&["values", &range])?;
        self.send(self.client.post(url).json(&json!({})), "clear")
            .await?;
        debug!(sheet = %self.sheet_name, "Cleared worksheet");
        Ok(())
    }

    async fn read_values(&self) -> Result<Vec<Vec<String>>> {
        let url = self.endpoint(&["values", &self.whole_sheet()])?;
        let response = self.send(self.client.get(url), "read").await?;
        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| ReviewDeskError::Sheet(format!("Failed to parse Sheets values: {}", e)))?;
        Ok(range
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }

    async fn write_range(&self, start_row: usize, rows: Vec<Vec<CellValue>>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(1);
        let range = a1_range(&self.sheet_name, start_row, rows.len(), width);
        let body = json!({
            "valueInputOption": "RAW",
            "data": [{
                "range": range,
                "majorDimension": "ROWS",
                "values": rows
            }]
        });
        let url = self.endpoint(&["values:batchUpdate"])?;
        self.send(self.client.post(url).json(&body), "batch update")
            .await?;
        debug!(range = %range, "Updated range");
        Ok(())
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| ReviewDeskError::Sheet(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::{write_rows, Row, WriteOptions};
    use wiremock::matchers::{body_json, header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sheet_for(server: &MockServer) -> GoogleSheet {
        GoogleSheet::with_token(&format!("{}/v4", server.uri()), "abc", "Discussion", "ya29.t")
            .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let sheet = GoogleSheet::with_token("https://sheets.example.test/v4", "id1", "AC DB", "t")
            .unwrap();
        let url = sheet.endpoint(&["values", &sheet.whole_sheet()]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.example.test/v4/spreadsheets/id1/values/'AC%20DB'"
        );
    }

    #[tokio::test]
    async fn test_connect_requires_key_file() {
        let config = SheetsConfig {
            spreadsheet_id: Some("abc".into()),
            ..Default::default()
        };
        assert!(matches!(
            GoogleSheet::connect(&config).await,
            Err(ReviewDeskError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_write_range_posts_batch_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/abc/values:batchUpdate"))
            .and(header("authorization", "Bearer ya29.t"))
            .and(body_json(json!({
                "valueInputOption": "RAW",
                "data": [{
                    "range": "'Discussion'!A3:C4",
                    "majorDimension": "ROWS",
                    "values": [["A", 1, true], ["B", 2.5, false]]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalUpdatedRows": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let rows = vec![
            vec![CellValue::from("A"), CellValue::from(1_i64), CellValue::from(true)],
            vec![CellValue::from("B"), CellValue::from(2.5), CellValue::from(false)],
        ];
        sheet_for(&server).write_range(2, rows).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_values_stringifies_cells() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v4/spreadsheets/abc/values/.*Discussion.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Discussion!A1:B2",
                "majorDimension": "ROWS",
                "values": [["title", "n"], ["Paper", 3]]
            })))
            .mount(&server)
            .await;

        let values = sheet_for(&server).read_values().await.unwrap();
        assert_eq!(values, vec![vec!["title", "n"], vec!["Paper", "3"]]);
    }

    #[tokio::test]
    async fn test_read_values_empty_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v4/spreadsheets/abc/values/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "Discussion!A1:Z1000"})))
            .mount(&server)
            .await;
        assert!(sheet_for(&server).read_values().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_posts_clear() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v4/spreadsheets/abc/values/.*Discussion.*:clear$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        sheet_for(&server).clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/abc/values:batchUpdate"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "The caller does not have permission"}
            })))
            .mount(&server)
            .await;
        let err = sheet_for(&server)
            .write_range(0, vec![vec![CellValue::from("x")]])
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewDeskError::Sheet(ref m) if m.contains("permission")));
    }

    #[tokio::test]
    async fn test_write_rows_through_google_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/abc/values:batchUpdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(3)
            .mount(&server)
            .await;

        let rows: Vec<Row> = (0..3_i64)
            .map(|i| [("n".to_string(), CellValue::from(i))].into_iter().collect())
            .collect();
        let options = WriteOptions {
            headers: Some(vec!["n".into()]),
            batch_size: 2,
            ..Default::default()
        };
        let next = write_rows(&sheet_for(&server), &rows, &options).await.unwrap();
        assert_eq!(next, 4);
    }
}
