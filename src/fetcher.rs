use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::models::RenderedPage;
use crate::utils::error::{AppError, Result};

const SCROLL_SETTLE: Duration = Duration::from_millis(750);

/// Source of a rendered ad page. The pipeline only needs this narrow seam,
/// so offline runs and tests can substitute the browser.
#[async_trait]
pub trait PageSource {
    async fn fetch(&self, config: &AppConfig) -> Result<RenderedPage>;
}

/// Fetches the weekly ad through a fresh headless Chrome session. One
/// session per run; nothing is reused across invocations.
pub struct ChromeFetcher;

impl ChromeFetcher {
    pub fn new() -> Self {
        ChromeFetcher
    }

    async fn drive(&self, tab: &Tab, config: &AppConfig, url: &Url) -> Result<String> {
        tab.navigate_to(url.as_str())
            .map_err(|e| navigation(url, e))?;
        tab.wait_until_navigated().map_err(|e| navigation(url, e))?;

        self.await_ready(tab, config, url).await?;
        self.scroll_to_bottom(tab, config).await;

        tab.get_content().map_err(|e| navigation(url, e))
    }

    async fn await_ready(&self, tab: &Tab, config: &AppConfig, url: &Url) -> Result<()> {
        let selector = config.browser.ready_selector.as_str();
        let ready = poll_until(
            || tab.find_element(selector).is_ok(),
            Duration::from_secs(config.wait_timeout),
            config.poll_interval(),
        )
        .await;
        if ready {
            debug!(selector, "ad content ready");
            Ok(())
        } else {
            Err(AppError::FetchTimeout {
                url: url.to_string(),
                timeout_secs: config.wait_timeout,
            })
        }
    }

    // Cards lazy-load as the page scrolls; stop once the page stops growing.
    // Failures here only cost content, never the run.
    async fn scroll_to_bottom(&self, tab: &Tab, config: &AppConfig) {
        let mut last_height = page_height(tab).unwrap_or(0.0);
        for pass in 0..config.browser.scroll_passes {
            if tab
                .evaluate("window.scrollTo(0, document.body.scrollHeight);", false)
                .is_err()
            {
                return;
            }
            tokio::time::sleep(SCROLL_SETTLE).await;
            match page_height(tab) {
                Ok(height) if height > last_height => last_height = height,
                _ => {
                    debug!(passes = pass + 1, "page height settled");
                    return;
                }
            }
        }
    }
}

impl Default for ChromeFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageSource for ChromeFetcher {
    async fn fetch(&self, config: &AppConfig) -> Result<RenderedPage> {
        let url = config.weekly_ad_url();
        info!(%url, store = %config.store, "launching browser session");

        let browser = launch(config, &url)?;
        let tab = browser.new_tab().map_err(|e| navigation(&url, e))?;
        tab.set_user_agent(&config.browser.user_agent, None, None)
            .map_err(|e| navigation(&url, e))?;

        // The tab is closed on every exit path; the browser process itself
        // is released when `browser` drops.
        let outcome = self.drive(&tab, config, &url).await;
        if let Err(err) = tab.close(true) {
            warn!(error = %err, "failed to close browser tab");
        }

        let html = outcome?;
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

/// Reads a previously saved copy of the ad page. Used for offline runs and
/// end-to-end tests that must not depend on an installed Chrome.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        FileSource { path }
    }
}

#[async_trait]
impl PageSource for FileSource {
    async fn fetch(&self, _config: &AppConfig) -> Result<RenderedPage> {
        debug!(path = %self.path.display(), "reading saved ad page");
        let html = std::fs::read_to_string(&self.path)?;
        Ok(RenderedPage {
            url: format!("file://{}", self.path.display()),
            html,
        })
    }
}

fn launch(config: &AppConfig, url: &Url) -> Result<Browser> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(config.browser.headless)
        .sandbox(false)
        .window_size(Some((1920, 1080)))
        .args(vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-extensions"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
        ])
        .build()
        .map_err(|e| navigation(url, anyhow!("failed to create launch options: {e}")))?;

    if let Some(chrome_path) = &config.browser.chrome_path {
        launch_options.path = Some(PathBuf::from(chrome_path));
    }

    Browser::new(launch_options)
        .map_err(|e| navigation(url, anyhow!("failed to launch browser: {e}")))
}

// Current rendered height of the document body, used to detect when lazy
// loading has stopped adding content.
fn page_height(tab: &Tab) -> anyhow::Result<f64> {
    let result = tab.evaluate("document.body.scrollHeight", false)?;
    result
        .value
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow!("page height was not a number"))
}

fn navigation(url: &Url, err: anyhow::Error) -> AppError {
    AppError::Navigation {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Bounded readiness poll on a monotonic deadline. Returns true as soon as
/// the predicate holds, false once the deadline passes.
async fn poll_until<F>(mut ready: F, timeout: Duration, interval: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if ready() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep_until(deadline.min(now + interval)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;

    fn test_config() -> AppConfig {
        AppConfig {
            store: "0865".to_string(),
            search_terms: vec!["bread".to_string()],
            wait_timeout: 10,
            browser: Default::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_gives_up_at_deadline() {
        let start = Instant::now();
        let ready = poll_until(|| false, Duration::from_secs(10), Duration::from_millis(500)).await;
        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_once_ready() {
        let calls = Cell::new(0u32);
        let ready = poll_until(
            || {
                calls.set(calls.get() + 1);
                calls.get() >= 3
            },
            Duration::from_secs(10),
            Duration::from_millis(500),
        )
        .await;
        assert!(ready);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_immediate_readiness_skips_sleeping() {
        let start = Instant::now();
        let ready = poll_until(|| true, Duration::from_secs(10), Duration::from_millis(500)).await;
        assert!(ready);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_file_source_returns_saved_page() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<html><body>ad</body></html>").unwrap();
        file.flush().unwrap();

        let source = FileSource::new(file.path().to_path_buf());
        let page = source.fetch(&test_config()).await.unwrap();
        assert!(page.html.contains("ad"));
        assert!(page.url.starts_with("file://"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_io_error() {
        let source = FileSource::new(PathBuf::from("/nonexistent/ad.html"));
        let err = source.fetch(&test_config()).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
