use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

fn default_page_size() -> u32 {
    10
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_timeout() -> u64 {
    30
}

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the expenses backend
    pub api_url: String,
    /// Optional bearer token passed through on every request
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config.normalized())
    }

    /// Build a configuration from explicit key/value pairs
    #[cfg(test)]
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(pairs)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.api_url = normalize_api_url(&self.api_url);
        self.page_size = self.page_size.clamp(1, 100);
        self.api_token = self
            .api_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Normalise the backend URL: add a scheme when missing and strip trailing slashes.
pub fn normalize_api_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = Config::from_pairs(pairs(&[("API_URL", "api.example.com/")])).unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.export_dir, PathBuf::from("exports"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.api_token.is_none());
    }

    #[test]
    fn page_size_is_clamped_and_blank_token_dropped() {
        let config = Config::from_pairs(pairs(&[
            ("API_URL", "http://localhost:8080"),
            ("PAGE_SIZE", "500"),
            ("API_TOKEN", "   "),
        ]))
        .unwrap();
        assert_eq!(config.page_size, 100);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(Config::from_pairs(pairs(&[("PAGE_SIZE", "5")])).is_err());
    }

    #[test]
    fn localhost_gets_plain_http() {
        assert_eq!(normalize_api_url("localhost:3000//"), "http://localhost:3000");
        assert_eq!(normalize_api_url("127.0.0.1:3000"), "http://127.0.0.1:3000");
        assert_eq!(
            normalize_api_url(" https://erp.example.com/api/ "),
            "https://erp.example.com/api"
        );
    }
}
