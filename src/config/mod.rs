use serde::Deserialize;
use std::time::Duration;

use crate::services::classify::DEFAULT_FATAL_SIGNATURES;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the remote generation API
    pub api_base_url: String,

    /// Initial API key. Can be rotated at runtime through the credential endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for video submissions
    #[serde(default = "default_video_model")]
    pub video_model: String,

    /// Delay between status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of status polls before a job is declared timed out
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Timeout applied to every individual network call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long settled jobs and their artifacts stay retrievable, in seconds
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Comma-separated error signatures that mark a permission/not-found failure
    #[serde(default = "default_fatal_signatures")]
    pub fatal_signatures: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_max_poll_attempts() -> u32 {
    120
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_job_retention_secs() -> u64 {
    3600
}

fn default_fatal_signatures() -> Vec<String> {
    DEFAULT_FATAL_SIGNATURES.iter().map(|s| s.to_string()).collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config: AppConfig =
            envy::from_iter(vars(&[("API_BASE_URL", "http://localhost:9000")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.max_poll_attempts, 120);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.job_retention(), Duration::from_secs(3600));
        assert!(config.api_key.is_none());
        assert!(config
            .fatal_signatures
            .iter()
            .any(|s| s == "Requested entity was not found"));
    }

    #[test]
    fn test_fatal_signatures_from_comma_list() {
        let config: AppConfig = envy::from_iter(vars(&[
            ("API_BASE_URL", "http://localhost:9000"),
            ("FATAL_SIGNATURES", "quota exhausted,billing disabled"),
            ("MAX_POLL_ATTEMPTS", "5"),
            ("JOB_RETENTION_SECS", "120"),
        ]))
        .unwrap();

        assert_eq!(
            config.fatal_signatures,
            vec!["quota exhausted".to_string(), "billing disabled".to_string()]
        );
        assert_eq!(config.max_poll_attempts, 5);
        assert_eq!(config.job_retention(), Duration::from_secs(120));
    }

    #[test]
    fn test_missing_base_url_is_an_error() {
        let result: Result<AppConfig, _> = envy::from_iter(vars(&[]));
        assert!(result.is_err());
    }
}
