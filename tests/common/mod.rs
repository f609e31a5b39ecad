//! Common test utilities: scripted providers and a temp-dir fixture

#![allow(dead_code)]

use keyquest::llm::{LlmError, TextGenerator};
use keyquest::retry::RetryPolicy;
use keyquest::suggest::{SuggestError, SuggestProvider};
use keyquest::volume::{VolumeError, VolumeProvider, VolumeRecord};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Retry policy with no real waiting
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        timeout: Duration::from_millis(500),
    }
}

/// Autocomplete provider answering from a fixed table
///
/// Queries are matched case-insensitively; unknown queries get an empty
/// list, and queries marked as failing always return a network-like error.
#[derive(Default)]
pub struct StubSuggestProvider {
    answers: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubSuggestProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, suggestions: &[&str]) -> Self {
        self.answers.insert(
            query.to_lowercase(),
            suggestions.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_lowercase());
        self
    }

    /// Every query received, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, query: &str) -> usize {
        let query = query.to_lowercase();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.to_lowercase() == query)
            .count()
    }
}

#[async_trait::async_trait]
impl SuggestProvider for StubSuggestProvider {
    async fn suggest(
        &self,
        query: &str,
        _language: &str,
        _limit: usize,
    ) -> Result<Vec<String>, SuggestError> {
        self.calls.lock().unwrap().push(query.to_string());
        let key = query.to_lowercase();
        if self.failing.contains(&key) {
            return Err(SuggestError::ApiError(format!("HTTP 503: {query}")));
        }
        // deliberately ignores the limit: callers must truncate
        Ok(self.answers.get(&key).cloned().unwrap_or_default())
    }
}

/// Text generator replaying queued answers; `None` entries fail the call
pub struct StubGenerator {
    responses: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(responses: Vec<Option<&str>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(|s| s.to_string()))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(LlmError::Unauthorized),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// Volume provider returning fixed numbers, or failing every call
pub struct StubVolumeProvider {
    volumes: HashMap<String, u64>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl StubVolumeProvider {
    pub fn new(volumes: &[(&str, u64)]) -> Self {
        Self {
            volumes: volumes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            volumes: HashMap::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl VolumeProvider for StubVolumeProvider {
    async fn search_volume(
        &self,
        keywords: &[String],
        _language: &str,
        _location: &str,
    ) -> Result<Vec<VolumeRecord>, VolumeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VolumeError::Unauthorized);
        }
        Ok(keywords
            .iter()
            .filter_map(|k| {
                self.volumes.get(k).map(|v| VolumeRecord {
                    search_volume: *v,
                    ..VolumeRecord::unknown(k.clone())
                })
            })
            .collect())
    }
}

/// Test fixture for file operations
pub struct TestFixture {
    /// Temporary directory that gets cleaned up automatically
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let filepath = self.path().join(name);
        std::fs::write(&filepath, content).expect("Failed to write test file");
        filepath
    }

    /// Names of the files in `dir` (relative to the fixture), sorted
    pub fn list_dir(&self, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path().join(dir))
            .expect("Failed to read test dir")
            .map(|e| e.expect("bad dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
