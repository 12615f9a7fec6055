use crate::error::ConfigError;
use chrono::{FixedOffset, Offset, Utc};
use fls_scout_scanner::discovery::DEFAULT_SEARCH_URL;
use fls_scout_scanner::prober::DEFAULT_PROBE_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MANIFEST_NAME: &str = "jetbrains_servers.txt";
pub const DEFAULT_STATUS_PAGE_NAME: &str = "index.html";
pub const DEFAULT_THREADS: usize = 10;
/// Timestamps in the artifacts are rendered at UTC+8.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

/// Everything a run needs, resolved up front and handed to each stage.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Shodan API key; `None` means discovery yields nothing
    pub api_key: Option<String>,
    pub search_url: String,
    pub page: u32,
    pub output_dir: PathBuf,
    pub manifest_name: String,
    pub status_page_name: String,
    /// Optional machine-readable run summary; relative paths land in `output_dir`
    pub json_path: Option<PathBuf>,
    pub probe_timeout: Duration,
    pub threads: usize,
    pub accept_invalid_certs: bool,
    pub utc_offset: FixedOffset,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            page: 1,
            output_dir: PathBuf::from("."),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            status_page_name: DEFAULT_STATUS_PAGE_NAME.to_string(),
            json_path: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            threads: DEFAULT_THREADS,
            accept_invalid_certs: false,
            utc_offset: default_utc_offset(),
        }
    }
}

impl ScoutConfig {
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Result<Self, ConfigError> {
        if threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.threads = threads;
        Ok(self)
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.probe_timeout = timeout;
        Ok(self)
    }

    pub fn with_utc_offset_hours(mut self, hours: i32) -> Result<Self, ConfigError> {
        self.utc_offset = utc_offset_from_hours(hours)?;
        Ok(self)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_name)
    }

    pub fn status_page_path(&self) -> PathBuf {
        self.output_dir.join(&self.status_page_name)
    }

    pub fn json_path(&self) -> Option<PathBuf> {
        self.json_path.as_ref().map(|path| self.output_dir.join(path))
    }
}

pub fn utc_offset_from_hours(hours: i32) -> Result<FixedOffset, ConfigError> {
    if !(-23..=23).contains(&hours) {
        return Err(ConfigError::InvalidUtcOffset(hours));
    }
    FixedOffset::east_opt(hours * 3600).ok_or(ConfigError::InvalidUtcOffset(hours))
}

fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix())
}
