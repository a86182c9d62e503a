use std::path::{Path, PathBuf};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::PortalError;
use crate::utils::file_names::job_file_stem;

/// A launched browser with its event pump and blank start page
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub page: Page,
    pub handler: JoinHandle<()>,
    pub profile_dir: PathBuf,
}

/// User-data directory of a job's browser; always a direct child of
/// `session_dir`, whatever the id contains
pub fn profile_dir(session_dir: &Path, job_id: &str) -> PathBuf {
    session_dir.join(format!("browser_data_{}", job_file_stem(job_id)))
}

/// Launch a browser for one job, with its own user-data directory so
/// concurrent jobs never share cookies or storage.
pub async fn launch_job_browser(config: &Config, job_id: &str) -> Result<LaunchedBrowser, PortalError> {
    let profile_dir = profile_dir(&config.session_dir, job_id);
    tokio::fs::create_dir_all(&profile_dir).await?;

    info!(
        "[job {}] 🚀 launching browser ({})",
        job_id,
        if config.browser_headless { "headless" } else { "headed" }
    );
    debug!("[job {}] profile dir: {}", job_id, profile_dir.display());

    let mut builder = BrowserConfig::builder();
    builder = if config.browser_headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &config.chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    let browser_config = builder
        .user_data_dir(&profile_dir)
        .window_size(1920, 1080)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--remote-debugging-port=0",
        ])
        .build()
        .map_err(|e| {
            error!("[job {}] ❌ browser config rejected: {}", job_id, e);
            PortalError::session(format!("browser config rejected: {}", e))
        })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("[job {}] ❌ browser launch failed: {}", job_id, e);
        PortalError::session(format!("browser launch failed: {}", e))
    })?;

    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // let the target list settle before opening a page
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("[job {}] ❌ page creation failed: {}", job_id, e);
        PortalError::from(e)
    })?;

    debug!("[job {}] browser ready", job_id);

    Ok(LaunchedBrowser {
        browser,
        page,
        handler,
        profile_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_dirs_stay_inside_the_session_dir() {
        let sessions = Path::new("/var/quotes/sessions");

        assert_eq!(
            profile_dir(sessions, "quote_1a2b"),
            sessions.join("browser_data_quote_1a2b")
        );

        let hostile = profile_dir(sessions, "x/../../tmp/evil");
        assert_eq!(hostile.parent(), Some(sessions));
        assert_eq!(
            hostile.file_name().and_then(|n| n.to_str()),
            Some("browser_data_x%2F%2E%2E%2F%2E%2E%2Ftmp%2Fevil")
        );
    }
}
