use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

use crate::cli::Cli;
use crate::utils::error::Result;

const WEEKLY_AD_URL: &str = "https://www.publix.com/savings/weekly-ad/view-all";
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 10;

/// Merged configuration record. Built once at startup, passed by reference
/// to every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: String,
    pub search_terms: Vec<String>,
    pub wait_timeout: u64,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_scroll_passes")]
    pub scroll_passes: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_ready_selector")]
    pub ready_selector: String,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_scroll_passes() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_ready_selector() -> String {
    "div[class*='product'], div[class*='card']".to_string()
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            user_agent: default_user_agent(),
            chrome_path: None,
            headless: default_headless(),
            scroll_passes: default_scroll_passes(),
            poll_interval_ms: default_poll_interval_ms(),
            ready_selector: default_ready_selector(),
        }
    }
}

/// Shape of the file + environment layers before the CLI overlay is applied.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    store: Option<String>,
    search_terms: Option<Vec<String>>,
    wait_timeout: Option<u64>,
    #[serde(default)]
    browser: BrowserConfig,
}

impl AppConfig {
    /// Layered load: configuration file, then `DEAL_SCOUT`-prefixed
    /// environment variables, then command-line values. Later sources win.
    pub fn load(cli: &Cli) -> Result<Self> {
        let builder = match &cli.config {
            Some(path) => Config::builder().add_source(File::from(path.clone())),
            None => Config::builder().add_source(File::with_name("config/default").required(false)),
        };

        let raw: RawConfig = builder
            .add_source(Environment::with_prefix("DEAL_SCOUT").separator("__"))
            .build()?
            .try_deserialize()?;

        let mut browser = raw.browser;
        if browser.chrome_path.is_none() {
            browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        let store = match cli.store.clone().or(raw.store) {
            Some(store) => store,
            None => return Err(missing_field("store").into()),
        };
        let search_terms = if cli.terms.is_empty() {
            raw.search_terms.unwrap_or_default()
        } else {
            cli.terms.clone()
        };
        let wait_timeout = cli
            .timeout
            .or(raw.wait_timeout)
            .unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS);

        let config = AppConfig {
            store,
            search_terms,
            wait_timeout,
            browser,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.store.is_empty() {
            return Err(missing_field("store"));
        }
        if self.store.len() > 6 || !self.store.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Message(format!(
                "store must be a numeric store number, got {:?}",
                self.store
            )));
        }

        if self.search_terms.is_empty() {
            return Err(missing_field("search_terms"));
        }
        if self.search_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Message(
                "search terms must not be empty".into(),
            ));
        }

        if self.wait_timeout == 0 {
            return Err(ConfigError::Message(
                "wait_timeout must be greater than 0".into(),
            ));
        }
        if self.browser.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "browser.poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.browser.ready_selector.trim().is_empty() {
            return Err(ConfigError::Message(
                "browser.ready_selector must not be empty".into(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.browser.poll_interval_ms)
    }

    /// Weekly-ad URL scoped to the configured store.
    pub fn weekly_ad_url(&self) -> Url {
        let mut url = Url::parse(WEEKLY_AD_URL).unwrap();
        url.query_pairs_mut().append_pair("storeNumber", &self.store);
        url
    }
}

fn missing_field(field: &str) -> ConfigError {
    ConfigError::Message(format!("missing required field: {field}"))
}
