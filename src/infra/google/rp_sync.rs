use super::service_account::ServiceAccountAuth;
use crate::core::rp::{RpEntry, RpError, RpSync};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DOCS_API: &str = "https://docs.googleapis.com/v1/documents";

/// Appends RP entries to Google Sheets (one row each) and Google Docs (one line each).
pub struct GoogleRpSync {
    auth: ServiceAccountAuth,
    client: Client,
}

/// Columns: timestamp, character, author id, channel id, words, summary.
/// Rows are appended RAW, so strings land as literal text and never as formulas.
pub fn sheet_row(entry: &RpEntry) -> Vec<Value> {
    vec![
        json!(entry.logged_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        json!(entry.character),
        // Strings so 18-digit IDs keep every digit
        json!(entry.author_id.to_string()),
        json!(entry.channel_id.to_string()),
        json!(entry.words),
        json!(entry.summary.clone().unwrap_or_default()),
    ]
}

fn append_url(sheet_id: &str) -> String {
    format!(
        "{}/{}/values/A:F:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        SHEETS_API, sheet_id
    )
}

pub fn doc_line(entry: &RpEntry) -> String {
    let mut line = format!(
        "[{}] {} ({} words)",
        entry.logged_at.format("%Y-%m-%d %H:%M UTC"),
        entry.character,
        entry.words
    );
    if let Some(summary) = &entry.summary {
        line.push_str(": ");
        line.push_str(summary);
    }
    line.push('\n');
    line
}

impl GoogleRpSync {
    pub fn new(auth: ServiceAccountAuth) -> Self {
        Self {
            auth,
            client: Client::new(),
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<(), RpError> {
        let token = self
            .auth
            .get_access_token()
            .await
            .map_err(|e| RpError::Sync(format!("auth failed: {}", e)))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| RpError::Sync(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        Err(RpError::Sync(match status.as_u16() {
            403 | 404 => format!(
                "{} (is it shared with {}?)",
                message,
                self.auth.client_email()
            ),
            _ => format!("HTTP {}: {}", status, message),
        }))
    }
}

#[async_trait]
impl RpSync for GoogleRpSync {
    async fn append_to_sheet(&self, sheet_id: &str, entries: &[RpEntry]) -> Result<(), RpError> {
        let url = append_url(sheet_id);
        let rows: Vec<Vec<Value>> = entries.iter().map(sheet_row).collect();
        self.post(&url, &json!({ "values": rows })).await
    }

    async fn append_to_doc(&self, doc_id: &str, entries: &[RpEntry]) -> Result<(), RpError> {
        let url = format!("{}/{}:batchUpdate", DOCS_API, doc_id);
        let text: String = entries.iter().map(doc_line).collect();
        let body = json!({
            "requests": [{
                "insertText": {
                    "endOfSegmentLocation": {},
                    "text": text,
                }
            }]
        });
        self.post(&url, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(summary: Option<&str>) -> RpEntry {
        RpEntry {
            id: 1,
            guild_id: 1,
            channel_id: 222,
            author_id: 123456789012345678,
            character: "Aria".into(),
            words: 42,
            summary: summary.map(str::to_string),
            logged_at: Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 5).unwrap(),
        }
    }

    #[test]
    fn sheet_row_layout() {
        let row = sheet_row(&entry(Some("Met the smuggler")));
        assert_eq!(row[0], json!("2024-05-01 18:30:05"));
        assert_eq!(row[1], json!("Aria"));
        assert_eq!(row[2], json!("123456789012345678"));
        assert_eq!(row[3], json!("222"));
        assert_eq!(row[4], json!(42));
        assert_eq!(row[5], json!("Met the smuggler"));
    }

    #[test]
    fn formula_text_stays_literal() {
        let mut formula = entry(Some("=IMPORTXML(\"http://x\", \"//a\")"));
        formula.character = "=1+1".into();
        let row = sheet_row(&formula);
        assert_eq!(row[1], json!("=1+1"));
        assert_eq!(row[5], json!("=IMPORTXML(\"http://x\", \"//a\")"));

        let url = append_url("sheet");
        assert!(url.contains("valueInputOption=RAW"));
        assert!(!url.contains("USER_ENTERED"));
    }

    #[test]
    fn doc_lines() {
        assert_eq!(
            doc_line(&entry(Some("Met the smuggler"))),
            "[2024-05-01 18:30 UTC] Aria (42 words): Met the smuggler\n"
        );
        assert_eq!(doc_line(&entry(None)), "[2024-05-01 18:30 UTC] Aria (42 words)\n");
    }
}
