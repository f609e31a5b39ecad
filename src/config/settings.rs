use super::station::{default_stations, Station};
use crate::retry::RetryPolicy;
use crate::suggest::modifiers::ModifierSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default station to use
    #[serde(default = "default_station_id")]
    pub default_station: String,

    /// Directory for CSV/JSON exports
    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    /// Write debug logs to a file instead of stderr
    #[serde(default)]
    pub debug: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_rotation: Option<DebugLogRotation>,

    /// How many rotated log files to keep (0 keeps everything)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_keep: Option<usize>,

    /// Available LLM stations
    #[serde(default = "default_stations")]
    pub stations: Vec<Station>,

    #[serde(default)]
    pub suggest: SuggestSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub volume: VolumeSettings,

    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub modifiers: ModifierSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_station: default_station_id(),
            stations: default_stations(),
            export_dir: default_export_dir(),
            suggest: SuggestSettings::default(),
            retry: RetrySettings::default(),
            volume: VolumeSettings::default(),
            analysis: AnalysisSettings::default(),
            modifiers: ModifierSettings::default(),
            debug: false,
            debug_log_path: None,
            debug_log_rotation: None,
            debug_log_keep: None,
        }
    }
}

impl Config {
    /// Look up a station by id, or the default station when `id` is `None`
    pub fn station(&self, id: Option<&str>) -> Option<&Station> {
        let wanted = id.unwrap_or(&self.default_station);
        self.stations.iter().find(|s| s.id == wanted)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    /// Modifier set to use during level-1 collection, if enabled
    pub fn modifier_set(&self) -> Option<ModifierSet> {
        if !self.modifiers.enabled {
            return None;
        }
        Some(ModifierSet::from_categories(&self.modifiers.categories))
    }
}

/// Autocomplete endpoint and crawl settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestSettings {
    pub base_url: String,
    /// Value of the endpoint's `client` parameter
    pub client: String,
    pub language: String,
    /// Suggestions requested per call at levels 1, 2 and 3 (0 disables a level)
    pub level_counts: [usize; 3],
    /// Politeness delay after each call
    pub delay_ms: u64,
    /// Calls in flight per level
    pub concurrency: usize,
}

impl Default for SuggestSettings {
    fn default() -> Self {
        Self {
            base_url: "https://suggestqueries.google.com/complete/search".to_string(),
            client: "chrome".to_string(),
            language: "fr".to_string(),
            level_counts: [10, 0, 0],
            delay_ms: 1000,
            concurrency: 1,
        }
    }
}

impl SuggestSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            timeout_secs: 5,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }
}

/// Keyword volume enrichment (DataForSEO)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub enabled: bool,
    pub login: String,
    pub password: String,
    pub base_url: String,
    pub language: String,
    pub location: String,
    /// Minimum monthly searches for a keyword to be kept
    pub min_volume: u64,
    pub batch_size: usize,
    /// Per-attempt timeout; volume lookups are slower than autocomplete calls
    pub timeout_secs: u64,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            login: String::new(),
            password: String::new(),
            base_url: "https://api.dataforseo.com".to_string(),
            language: "fr".to_string(),
            location: "fr".to_string(),
            min_volume: 10,
            batch_size: 700,
            timeout_secs: 60,
        }
    }
}

impl VolumeSettings {
    pub fn is_configured(&self) -> bool {
        !self.login.trim().is_empty() && !self.password.trim().is_empty()
    }

    /// `base` with this section's timeout
    pub fn retry_policy(&self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            ..base
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub generate_questions: bool,
    /// Questions kept after consolidation
    pub final_questions_count: usize,
    /// Upper bound of suggestions quoted in the theme prompt
    pub max_suggestions_in_prompt: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            generate_questions: true,
            final_questions_count: 20,
            max_suggestions_in_prompt: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierSettings {
    pub enabled: bool,
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for ModifierSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            categories: crate::suggest::modifiers::default_categories(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebugLogRotation {
    /// Single append-only file
    None,
    Daily,
    /// One file per process run
    Session,
}

fn default_station_id() -> String {
    "openai".to_string()
}

fn default_export_dir() -> String {
    "export_suggests".to_string()
}
