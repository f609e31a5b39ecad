use super::{VolumeError, VolumeProvider, VolumeRecord};
use crate::config::settings::VolumeSettings;
use crate::logging::redact_secrets;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DATAFORSEO_URL: &str = "https://api.dataforseo.com";
const SEARCH_VOLUME_PATH: &str = "/v3/keywords_data/google_ads/search_volume/live";
/// Largest keyword list the endpoint accepts per task
pub const MAX_BATCH_SIZE: usize = 700;
const STATUS_OK: u64 = 20000;

/// Location names accepted in the config, and their DataForSEO codes
const LOCATION_CODES: &[(&str, u32)] = &[
    ("fr", 2250),
    ("us", 2840),
    ("en-us", 2840),
    ("gb", 2826),
    ("en-gb", 2826),
    ("uk", 2826),
    ("es", 2724),
    ("de", 2276),
    ("it", 2380),
    ("ca", 2124),
    ("au", 2036),
];

/// DataForSEO location code for a location name or numeric code.
/// Unknown names fall back to France.
pub fn location_code(location: &str) -> u32 {
    let location = location.trim().to_lowercase();
    if let Ok(code) = location.parse::<u32>() {
        return code;
    }
    LOCATION_CODES
        .iter()
        .find(|(name, _)| *name == location)
        .map(|(_, code)| *code)
        .unwrap_or_else(|| {
            tracing::debug!(location = %location, "unknown location, using fr");
            2250
        })
}

#[derive(Debug, Serialize)]
struct SearchVolumeTask<'a> {
    keywords: &'a [String],
    language_code: &'a str,
    location_code: u32,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status_code: u64,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    tasks: Vec<ApiTask>,
}

#[derive(Debug, Deserialize)]
struct ApiTask {
    #[serde(default)]
    status_code: u64,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    result: Option<Vec<ApiKeyword>>,
}

#[derive(Debug, Deserialize)]
struct ApiKeyword {
    keyword: String,
    search_volume: Option<u64>,
    cpc: Option<f64>,
    /// `"LOW"`/`"MEDIUM"`/`"HIGH"` on the Google Ads endpoint, a ratio elsewhere
    #[serde(default)]
    competition: serde_json::Value,
    competition_index: Option<f64>,
}

impl From<ApiKeyword> for VolumeRecord {
    fn from(raw: ApiKeyword) -> Self {
        let (competition, level) = match &raw.competition {
            serde_json::Value::String(level) => (
                raw.competition_index.map(|i| i / 100.0).unwrap_or(0.0),
                level.to_uppercase(),
            ),
            serde_json::Value::Number(n) => {
                let ratio = n.as_f64().unwrap_or(0.0);
                (ratio, level_for_ratio(ratio).to_string())
            }
            _ => (0.0, "UNKNOWN".to_string()),
        };

        VolumeRecord {
            keyword: raw.keyword,
            search_volume: raw.search_volume.unwrap_or(0),
            cpc: raw.cpc.unwrap_or(0.0),
            competition,
            competition_level: level,
        }
    }
}

fn level_for_ratio(ratio: f64) -> &'static str {
    if ratio >= 0.66 {
        "HIGH"
    } else if ratio >= 0.33 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

/// Read a response body into volume records, checking both status levels
fn parse_response(body: &str) -> Result<Vec<VolumeRecord>, VolumeError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| VolumeError::Malformed(e.to_string()))?;

    if response.status_code != STATUS_OK {
        return Err(VolumeError::Task {
            code: response.status_code,
            message: response.status_message,
        });
    }

    let mut records = Vec::new();
    for task in response.tasks {
        if task.status_code != STATUS_OK {
            return Err(VolumeError::Task {
                code: task.status_code,
                message: task.status_message,
            });
        }
        records.extend(task.result.unwrap_or_default().into_iter().map(VolumeRecord::from));
    }
    Ok(records)
}

/// DataForSEO Google Ads search-volume client
pub struct DataForSeoClient {
    client: reqwest::Client,
    base_url: String,
    login: String,
    password: String,
    batch_size: usize,
}

impl DataForSeoClient {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Result<Self, VolumeError> {
        let login = login.into();
        let password = password.into();
        if login.trim().is_empty() || password.trim().is_empty() {
            return Err(VolumeError::NotConfigured);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_DATAFORSEO_URL.to_string(),
            login,
            password,
            batch_size: MAX_BATCH_SIZE,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn from_settings(settings: &VolumeSettings) -> Result<Self, VolumeError> {
        Ok(Self::new(settings.login.clone(), settings.password.clone())?
            .with_base_url(settings.base_url.clone())
            .with_batch_size(settings.batch_size))
    }

    async fn fetch_batch(
        &self,
        keywords: &[String],
        language: &str,
        location_code: u32,
    ) -> Result<Vec<VolumeRecord>, VolumeError> {
        let url = format!("{}{}", self.base_url, SEARCH_VOLUME_PATH);
        let tasks = [SearchVolumeTask {
            keywords,
            language_code: language,
            location_code,
        }];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.login, Some(&self.password))
            .json(&tasks)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(VolumeError::Unauthorized);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VolumeError::Api {
                status: status.as_u16(),
                message: redact_secrets(&body),
            });
        }

        parse_response(&body)
    }
}

#[async_trait::async_trait]
impl VolumeProvider for DataForSeoClient {
    async fn search_volume(
        &self,
        keywords: &[String],
        language: &str,
        location: &str,
    ) -> Result<Vec<VolumeRecord>, VolumeError> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let location_code = location_code(location);
        let batches = keywords.len().div_ceil(self.batch_size);
        tracing::info!(
            keywords = keywords.len(),
            batches,
            language = %language,
            location_code,
            "requesting search volumes"
        );

        let mut records = Vec::with_capacity(keywords.len());
        for (i, batch) in keywords.chunks(self.batch_size).enumerate() {
            let found = self.fetch_batch(batch, language, location_code).await?;
            tracing::debug!(batch = i + 1, batches, received = found.len(), "volume batch done");
            records.extend(found);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_codes() {
        assert_eq!(location_code("fr"), 2250);
        assert_eq!(location_code("en-US"), 2840);
        assert_eq!(location_code(" gb "), 2826);
        assert_eq!(location_code("2036"), 2036);
        assert_eq!(location_code("narnia"), 2250);
    }

    #[test]
    fn test_parse_response_sanitizes_missing_numbers() {
        let body = r#"{
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{
                "status_code": 20000,
                "status_message": "Ok.",
                "result": [
                    {"keyword": "hotel lyon", "search_volume": 2400, "cpc": 1.35, "competition": "HIGH", "competition_index": 82},
                    {"keyword": "hotel lyon spa", "search_volume": null, "cpc": null, "competition": null, "competition_index": null}
                ]
            }]
        }"#;
        let records = parse_response(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].search_volume, 2400);
        assert_eq!(records[0].competition_level, "HIGH");
        assert!((records[0].competition - 0.82).abs() < 1e-9);
        assert_eq!(records[1], VolumeRecord::unknown("hotel lyon spa"));
    }

    #[test]
    fn test_failed_task_is_an_error() {
        let body = r#"{"status_code": 20000, "tasks": [{"status_code": 40501, "status_message": "Invalid Field", "result": null}]}"#;
        assert!(matches!(
            parse_response(body),
            Err(VolumeError::Task { code: 40501, .. })
        ));
    }

    #[test]
    fn test_credentials_are_required() {
        assert!(matches!(
            DataForSeoClient::new("", "secret"),
            Err(VolumeError::NotConfigured)
        ));
        let settings = VolumeSettings {
            login: "me@example.com".to_string(),
            password: "secret".to_string(),
            batch_size: 5000,
            ..VolumeSettings::default()
        };
        let client = DataForSeoClient::from_settings(&settings).unwrap();
        assert_eq!(client.batch_size, MAX_BATCH_SIZE);
    }
}
