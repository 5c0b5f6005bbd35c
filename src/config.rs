use crate::models::FilterState;
use anyhow::{Context, Result};
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::info;

/// Runtime settings, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub autocomplete_delay: Duration,
    pub autocomplete_limit: usize,
    pub saved_search_page: u32,
    /// Status filter a fresh search starts with
    pub default_status: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            autocomplete_delay: Duration::from_millis(200),
            autocomplete_limit: 10,
            saved_search_page: 20,
            default_status: Some("for_sale".to_string()),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let status: String = try_load("HOUSING_DEFAULT_STATUS", "for_sale")?;

        Ok(Self {
            api_base_url: try_load("HOUSING_API_URL", &defaults.api_base_url)?,
            request_timeout: Duration::from_secs(try_load("HOUSING_HTTP_TIMEOUT_SECS", "30")?),
            autocomplete_delay: Duration::from_millis(try_load(
                "HOUSING_AUTOCOMPLETE_DELAY_MS",
                "200",
            )?),
            autocomplete_limit: try_load("HOUSING_AUTOCOMPLETE_LIMIT", "10")?,
            saved_search_page: try_load("HOUSING_SAVED_SEARCH_PAGE", "20")?,
            default_status: (!status.trim().is_empty()).then(|| status.trim().to_string()),
        })
    }

    /// Filter state a new search session starts from
    pub fn default_filters(&self) -> FilterState {
        FilterState {
            status: self.default_status.clone(),
            ..FilterState::unset()
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}
