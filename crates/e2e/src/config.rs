//! Harness configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};
use crate::keys::Platform;
use crate::playwright::Browser;
use crate::settle::SettlePolicy;
use crate::storage::DEFAULT_STORAGE_KEY;

/// Public TodoMVC demo the shipped scenarios target.
pub const DEFAULT_SUBJECT_URL: &str = "https://demo.playwright.dev/todomvc";

/// Harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// The application under test
    pub subject: SubjectConfig,

    /// Waiting behaviour for assertions
    pub settle: SettlePolicy,

    /// Browser backend
    pub browser: BrowserConfig,

    /// Scenario selection and output
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    /// URL every scenario starts from
    pub base_url: String,

    /// Storage key holding the persisted list
    pub storage_key: String,

    /// Check the URL answers over HTTP before running
    pub preflight: bool,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SUBJECT_URL.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            preflight: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub engine: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Per-action timeout inside the browser
    pub action_timeout_ms: u64,

    /// Node.js binary running the Playwright bridge
    pub node_binary: PathBuf,

    /// Directory whose `node_modules` provides `playwright`
    pub node_modules_dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: 5000,
            node_binary: PathBuf::from("node"),
            node_modules_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory of YAML scenarios
    pub scenarios_dir: PathBuf,

    /// Where the JSON report goes
    pub output_dir: PathBuf,

    /// Scenarios executed at the same time, each in its own browser
    pub workers: usize,

    /// Keyboard convention of the browser host
    pub platform: Platform,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenarios_dir: PathBuf::from("crates/e2e/scenarios"),
            output_dir: PathBuf::from("test-results"),
            workers: 1,
            platform: Platform::host(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.run.workers == 0 {
            return Err(HarnessError::Config("run.workers must be at least 1".into()));
        }
        if self.settle.timeout_ms == 0 {
            return Err(HarnessError::Config("settle.timeout_ms must be positive".into()));
        }
        if self.subject.storage_key.is_empty() {
            return Err(HarnessError::Config("subject.storage_key is empty".into()));
        }
        if !self.subject.base_url.starts_with("http://")
            && !self.subject.base_url.starts_with("https://")
            && !self.subject.base_url.starts_with("file://")
        {
            return Err(HarnessError::Config(format!(
                "subject.base_url is not a URL: {}",
                self.subject.base_url
            )));
        }
        Ok(())
    }

    /// Resolve a scenario's `url` against the subject base URL.
    pub fn resolve_url(&self, url: Option<&str>) -> String {
        resolve_url(&self.subject.base_url, url)
    }
}

pub fn resolve_url(base: &str, url: Option<&str>) -> String {
    match url {
        None => base.to_string(),
        Some(u) if u.contains("://") => u.to_string(),
        Some(u) if u.starts_with('#') => format!("{}/{}", base.trim_end_matches('/'), u),
        Some(u) => format!("{}/{}", base.trim_end_matches('/'), u.trim_start_matches('/')),
    }
}
