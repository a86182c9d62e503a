//! Portal session - one browser context bound to one job
//!
//! `PortalSession` wraps whatever driver the factory produced, records every
//! interaction into the job's trace and guarantees the driver is closed and
//! the trace flushed exactly once, through `finish(self)`.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{panic_message, PortalError};
use crate::infrastructure::portal_driver::{Credentials, Locator, PortalDriver, RadioChoice};
use crate::services::trace_writer::{TraceRecorder, TraceWriter};

/// Produces a fresh driver (own browser context) per job
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, job_id: &str) -> Result<Box<dyn PortalDriver>, PortalError>;
}

/// Opening the browser context failed
#[derive(Debug)]
pub struct SessionOpenFailure {
    pub error: PortalError,
    pub trace: Option<PathBuf>,
}

/// Result of tearing a session down
#[derive(Debug, Default)]
pub struct SessionClose {
    pub trace: Option<PathBuf>,
    pub close_error: Option<String>,
}

pub struct PortalSession {
    driver: Box<dyn PortalDriver>,
    recorder: TraceRecorder,
    writer: Option<TraceWriter>,
    closed: bool,
}

impl PortalSession {
    /// Acquire a browser context for `job_id`. A failed acquisition still
    /// flushes a trace holding the failure.
    pub async fn open(
        factory: &dyn SessionFactory,
        job_id: &str,
        writer: Option<TraceWriter>,
    ) -> Result<Self, SessionOpenFailure> {
        let mut recorder = TraceRecorder::new(job_id);

        match factory.open(job_id).await {
            Ok(driver) => {
                recorder.record("open", None, None, None);
                Ok(Self {
                    driver,
                    recorder,
                    writer,
                    closed: false,
                })
            }
            Err(error) => {
                recorder.record("open", None, None, Some(error.to_string()));
                let trace = flush(writer.as_ref(), &recorder).await;
                Err(SessionOpenFailure { error, trace })
            }
        }
    }

    pub fn job_id(&self) -> &str {
        self.recorder.job_id()
    }

    /// Close the browser context, then write the trace. Consumes the session.
    pub async fn finish(mut self) -> SessionClose {
        let close_error = match self.close_driver().await {
            Ok(()) => None,
            Err(e) => {
                warn!("[job {}] ⚠️ browser close failed: {}", self.job_id(), e);
                Some(e.to_string())
            }
        };

        let trace = flush(self.writer.as_ref(), &self.recorder).await;

        SessionClose { trace, close_error }
    }

    /// Screenshot the page as the job's failure artifact. Only taken when
    /// traces are enabled, next to the trace.
    pub async fn capture_failure(&mut self) -> Option<PathBuf> {
        let path = self
            .writer
            .as_ref()?
            .failure_screenshot_path(self.recorder.job_id());
        match self.screenshot(&path).await {
            Ok(()) => {
                debug!("[job {}] failure screenshot: {}", self.job_id(), path.display());
                Some(path)
            }
            Err(e) => {
                warn!("[job {}] ⚠️ failure screenshot not taken: {}", self.job_id(), e);
                None
            }
        }
    }

    async fn close_driver(&mut self) -> Result<(), PortalError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // a panicking driver must not skip the trace flush
        let result = match AssertUnwindSafe(self.driver.close()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(PortalError::session(format!(
                "browser close panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        self.note("close", None, None, &result);
        result
    }

    fn note<T>(
        &mut self,
        action: &'static str,
        locator: Option<Locator>,
        detail: Option<String>,
        result: &Result<T, PortalError>,
    ) {
        let location = locator.map(|l| (l.stage, l.field));
        let error = result.as_ref().err().map(|e| e.to_string());
        self.recorder.record(action, location, detail, error);
    }
}

async fn flush(writer: Option<&TraceWriter>, recorder: &TraceRecorder) -> Option<PathBuf> {
    let writer = writer?;
    match writer.write(recorder).await {
        Ok(path) => {
            debug!("[job {}] trace saved: {}", recorder.job_id(), path.display());
            Some(path)
        }
        Err(e) => {
            warn!("[job {}] ⚠️ trace write failed: {}", recorder.job_id(), e);
            None
        }
    }
}

#[async_trait]
impl PortalDriver for PortalSession {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), PortalError> {
        let result = self.driver.login(credentials).await;
        self.note("login", None, Some(credentials.username.clone()), &result);
        result
    }

    async fn navigate(&mut self, url: &str) -> Result<(), PortalError> {
        let result = self.driver.navigate(url).await;
        self.note("navigate", None, Some(url.to_string()), &result);
        result
    }

    async fn wait_for_visible(
        &mut self,
        locator: Locator,
        timeout: Duration,
    ) -> Result<(), PortalError> {
        let result = self.driver.wait_for_visible(locator, timeout).await;
        self.note("wait", Some(locator), None, &result);
        result
    }

    async fn fill(&mut self, locator: Locator, value: &str) -> Result<(), PortalError> {
        let result = self.driver.fill(locator, value).await;
        self.note("fill", Some(locator), Some(value.to_string()), &result);
        result
    }

    async fn select_radio(
        &mut self,
        locator: Locator,
        choice: RadioChoice,
    ) -> Result<(), PortalError> {
        let result = self.driver.select_radio(locator, choice).await;
        self.note("radio", Some(locator), Some(choice.to_string()), &result);
        result
    }

    async fn select_from_dropdown(
        &mut self,
        locator: Locator,
        value: &str,
    ) -> Result<(), PortalError> {
        let result = self.driver.select_from_dropdown(locator, value).await;
        self.note("dropdown", Some(locator), Some(value.to_string()), &result);
        result
    }

    async fn select_first_autocomplete_suggestion(
        &mut self,
        locator: Locator,
        text: &str,
    ) -> Result<String, PortalError> {
        let result = self
            .driver
            .select_first_autocomplete_suggestion(locator, text)
            .await;
        let detail = match &result {
            Ok(picked) => format!("{} -> {}", text, picked),
            Err(_) => text.to_string(),
        };
        self.note("autocomplete", Some(locator), Some(detail), &result);
        result
    }

    async fn click(&mut self, locator: Locator) -> Result<(), PortalError> {
        let result = self.driver.click(locator).await;
        self.note("click", Some(locator), None, &result);
        result
    }

    async fn option_labels(&mut self, locator: Locator) -> Result<Vec<String>, PortalError> {
        let result = self.driver.option_labels(locator).await;
        let detail = result.as_ref().ok().map(|labels| labels.join(" | "));
        self.note("options", Some(locator), detail, &result);
        result
    }

    async fn is_present(&mut self, locator: Locator) -> Result<bool, PortalError> {
        let result = self.driver.is_present(locator).await;
        let detail = result.as_ref().ok().map(|present| present.to_string());
        self.note("present", Some(locator), detail, &result);
        result
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), PortalError> {
        let result = match path.parent() {
            Some(dir) => fs::create_dir_all(dir).await.map_err(PortalError::from),
            None => Ok(()),
        };
        let result = match result {
            Ok(()) if self.closed => Err(PortalError::session("session already closed")),
            Ok(()) => self.driver.screenshot(path).await,
            Err(e) => Err(e),
        };
        self.note("screenshot", None, Some(path.display().to_string()), &result);
        result
    }

    async fn close(&mut self) -> Result<(), PortalError> {
        self.close_driver().await
    }
}
