use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use reqwest::Url;
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "https://api.unsplash.com";
pub const DEFAULT_ACCESS_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";

/// Largest page size the photo API accepts.
pub const MAX_PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Base URL of the photo API; the feed and search paths are appended to it.
    pub api_base_url: String,
    /// Access key sent as `client_id`. Takes precedence over `access-key-env`.
    pub access_key: Option<String>,
    /// Environment variable consulted when `access-key` is not set.
    pub access_key_env: String,
    /// Page size requested from the API. Omitted from requests when unset.
    pub per_page: Option<u32>,
    /// Upper bound for a single page request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    pub scroll: ScrollOptions,
    pub viewport: ViewportOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScrollOptions {
    /// Distance from the bottom of the content that counts as "near bottom".
    pub bottom_margin: u32,
}

/// Geometry of the terminal grid, used to derive scroll metrics.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ViewportOptions {
    /// Visible grid rows.
    pub rows: u32,
    /// Height of one grid row in scroll units.
    pub row_height: u32,
    /// Photos per grid row.
    pub columns: u32,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("api-base-url is not a valid URL: {}", self.api_base_url))?;
        if let Some(per_page) = self.per_page {
            ensure!(
                (1..=MAX_PER_PAGE).contains(&per_page),
                "per-page must be between 1 and {MAX_PER_PAGE}"
            );
        }
        if let Some(timeout) = self.request_timeout {
            ensure!(!timeout.is_zero(), "request-timeout must be positive");
        }
        ensure!(
            !self.access_key_env.trim().is_empty(),
            "access-key-env must name an environment variable"
        );
        self.viewport.validate()?;
        Ok(self)
    }

    /// Resolve the access key from the file or the configured environment variable.
    ///
    /// A missing key is not an error here; the API rejects the request instead.
    pub fn resolve_access_key(&self) -> Option<String> {
        self.access_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(&self.access_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_key: None,
            access_key_env: DEFAULT_ACCESS_KEY_ENV.to_string(),
            per_page: None,
            request_timeout: None,
            scroll: ScrollOptions::default(),
            viewport: ViewportOptions::default(),
        }
    }
}

impl ScrollOptions {
    const fn default_bottom_margin() -> u32 {
        10
    }
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            bottom_margin: Self::default_bottom_margin(),
        }
    }
}

impl ViewportOptions {
    const fn default_rows() -> u32 {
        6
    }

    const fn default_row_height() -> u32 {
        40
    }

    const fn default_columns() -> u32 {
        3
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.rows > 0, "viewport.rows must be greater than zero");
        ensure!(
            self.row_height > 0,
            "viewport.row-height must be greater than zero"
        );
        ensure!(self.columns > 0, "viewport.columns must be greater than zero");
        Ok(())
    }

    /// Height of the visible window in scroll units.
    pub fn height(&self) -> u32 {
        self.rows.saturating_mul(self.row_height)
    }
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            rows: Self::default_rows(),
            row_height: Self::default_row_height(),
            columns: Self::default_columns(),
        }
    }
}
