use std::env;
use std::time::Duration;

/// Bounds of the status polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status checks; the first check fires one interval after start.
    pub interval: Duration,
    /// Status checks issued before the job is declared timed out.
    pub max_attempts: u32,
    /// Consecutive NOT_FOUND replies tolerated before the job is untrackable.
    pub not_found_grace: u32,
    /// Network failures within this many final attempts end the job.
    pub network_failure_window: u32,
}

impl PollSettings {
    /// Overall time budget before a job times out.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(POLL_INTERVAL_SECS),
            max_attempts: POLL_MAX_ATTEMPTS,
            not_found_grace: NOT_FOUND_GRACE,
            network_failure_window: NETWORK_FAILURE_WINDOW,
        }
    }
}

const HTTP_TIMEOUT_SECS: u64 = 60;
const ACCEPTED_EXTENSION: &str = "zip";
const MAX_UPLOAD_MB: u64 = 500;
const POLL_INTERVAL_SECS: u64 = 10;
const POLL_MAX_ATTEMPTS: u32 = 36;
const NOT_FOUND_GRACE: u32 = 6;
const NETWORK_FAILURE_WINDOW: u32 = 3;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the report backend; `None` until configured.
    pub api_base_url: Option<String>,
    pub http_timeout: Duration,
    pub accepted_extension: String,
    pub max_upload_bytes: u64,
    pub poll: PollSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            accepted_extension: ACCEPTED_EXTENSION.to_string(),
            max_upload_bytes: MAX_UPLOAD_MB * 1024 * 1024,
            poll: PollSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("REPORTDESK_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let http_timeout_secs = parse_or(&lookup, "REPORTDESK_HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?;
        let max_upload_mb = parse_or(&lookup, "REPORTDESK_MAX_UPLOAD_MB", MAX_UPLOAD_MB)?;
        let poll_interval_secs =
            parse_or(&lookup, "REPORTDESK_POLL_INTERVAL_SECS", POLL_INTERVAL_SECS)?;

        let accepted_extension = lookup("REPORTDESK_ACCEPTED_EXTENSION")
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .unwrap_or_else(|| ACCEPTED_EXTENSION.to_string());

        let config = ClientConfig {
            api_base_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            accepted_extension,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            poll: PollSettings {
                interval: Duration::from_secs(poll_interval_secs),
                max_attempts: parse_or(&lookup, "REPORTDESK_POLL_MAX_ATTEMPTS", POLL_MAX_ATTEMPTS)?,
                not_found_grace: parse_or(&lookup, "REPORTDESK_NOT_FOUND_GRACE", NOT_FOUND_GRACE)?,
                network_failure_window: parse_or(
                    &lookup,
                    "REPORTDESK_NETWORK_FAILURE_WINDOW",
                    NETWORK_FAILURE_WINDOW,
                )?,
            },
        };

        Ok(config)
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url = Some(url.trim().trim_end_matches('/').to_string());
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.api_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "REPORTDESK_API_URL must start with http:// or https://"
                ));
            }
        }

        if self.accepted_extension.is_empty() {
            return Err(anyhow::anyhow!(
                "REPORTDESK_ACCEPTED_EXTENSION must not be empty"
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("REPORTDESK_MAX_UPLOAD_MB must be greater than 0"));
        }

        if self.poll.interval.is_zero() {
            return Err(anyhow::anyhow!(
                "REPORTDESK_POLL_INTERVAL_SECS must be greater than 0"
            ));
        }

        if self.poll.max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "REPORTDESK_POLL_MAX_ATTEMPTS must be greater than 0"
            ));
        }

        if self.poll.network_failure_window > self.poll.max_attempts {
            return Err(anyhow::anyhow!(
                "REPORTDESK_NETWORK_FAILURE_WINDOW ({}) cannot exceed REPORTDESK_POLL_MAX_ATTEMPTS ({})",
                self.poll.network_failure_window,
                self.poll.max_attempts
            ));
        }

        Ok(())
    }

    /// Base URL, or an error naming the variable to set.
    pub fn require_api_base_url(&self) -> Result<&str, anyhow::Error> {
        self.api_base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("REPORTDESK_API_URL is not set"))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        _ => Ok(default),
    }
}
