use serde::Deserialize;
use std::sync::Arc;

use super::source::UserSourceError;
use crate::shared::config::SheetsConfig;
use crate::shared::google_auth::GoogleTokenProvider;

/// Reads the user list from a Google Sheets range (`values.get`)
pub struct SheetsSource {
    client: reqwest::Client,
    endpoint: String,
    spreadsheet_id: String,
    range: String,
    auth: Arc<GoogleTokenProvider>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range is empty
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsSource {
    pub fn new(config: &SheetsConfig, auth: Arc<GoogleTokenProvider>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            auth,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.endpoint,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(&self.range)
        )
    }

    pub async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, UserSourceError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| UserSourceError::SourceUnavailable(e.to_string()))?;

        let response = self
            .client
            .get(self.values_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| UserSourceError::SourceUnavailable(format!("Sheets request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UserSourceError::SourceUnavailable(format!(
                "Sheets returned {}: {}",
                status.as_u16(),
                body.chars().take(300).collect::<String>()
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| UserSourceError::SourceUnavailable(format!("Sheets payload: {}", e)))?;

        Ok(to_rows(range))
    }
}

fn to_rows(range: ValueRange) -> Vec<Vec<String>> {
    range
        .values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}
