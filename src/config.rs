use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::infrastructure::Credentials;

/// Program configuration
#[derive(Clone)]
pub struct Config {
    /// Jobs allowed in `running` at once
    pub max_workers: usize,
    /// Portal sign-in page
    pub portal_login_url: String,
    /// Authenticated quote landing page
    pub portal_quote_url: String,
    pub portal_username: String,
    pub portal_password: String,
    pub browser_headless: bool,
    /// Browser binary; chromiumoxide's lookup is used when unset
    pub chrome_executable: Option<PathBuf>,
    /// Parent of the per-job browser profiles
    pub session_dir: PathBuf,
    /// Where per-job trace artifacts go
    pub trace_dir: PathBuf,
    pub enable_tracing: bool,
    /// Bounded wait for any single element
    pub element_timeout_ms: u64,
    /// Bounded wait for login and page loads
    pub login_timeout_ms: u64,
    /// Whole-job deadline; `None` disables it
    pub job_deadline_secs: Option<u64>,
    /// Folder of request files the binary submits
    pub jobs_folder: String,
    /// Show detailed logs
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 3,
            portal_login_url: "https://touchpoint01.colinsgrp.com/Login.html".to_string(),
            portal_quote_url: "https://touchpoint01.colinsgrp.com/quote".to_string(),
            portal_username: String::new(),
            portal_password: String::new(),
            browser_headless: true,
            chrome_executable: None,
            session_dir: PathBuf::from("browser_sessions"),
            trace_dir: PathBuf::from("traces"),
            enable_tracing: true,
            element_timeout_ms: 10_000,
            login_timeout_ms: 60_000,
            job_deadline_secs: Some(900),
            jobs_folder: "jobs".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables. A variable that is set
    /// but does not parse is an error rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            max_workers: parsed("MAX_WORKERS", "integer")?.unwrap_or(default.max_workers),
            portal_login_url: text("PORTAL_LOGIN_URL").unwrap_or(default.portal_login_url),
            portal_quote_url: text("PORTAL_QUOTE_URL").unwrap_or(default.portal_quote_url),
            portal_username: text("PORTAL_USERNAME").unwrap_or(default.portal_username),
            portal_password: text("PORTAL_PASSWORD").unwrap_or(default.portal_password),
            browser_headless: parsed("BROWSER_HEADLESS", "boolean")?
                .unwrap_or(default.browser_headless),
            chrome_executable: text("CHROME_EXECUTABLE")
                .map(PathBuf::from)
                .or(default.chrome_executable),
            session_dir: text("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.session_dir),
            trace_dir: text("TRACE_DIR").map(PathBuf::from).unwrap_or(default.trace_dir),
            enable_tracing: parsed("ENABLE_TRACING", "boolean")?
                .unwrap_or(default.enable_tracing),
            element_timeout_ms: parsed("ELEMENT_TIMEOUT_MS", "integer")?
                .unwrap_or(default.element_timeout_ms),
            login_timeout_ms: parsed("LOGIN_TIMEOUT_MS", "integer")?
                .unwrap_or(default.login_timeout_ms),
            // 0 turns the deadline off
            job_deadline_secs: match parsed::<u64>("JOB_DEADLINE_SECS", "integer")? {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => default.job_deadline_secs,
            },
            jobs_folder: text("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            verbose_logging: parsed("VERBOSE_LOGGING", "boolean")?
                .unwrap_or(default.verbose_logging),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.portal_username.clone(),
            password: self.portal_password.clone(),
        }
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn job_deadline(&self) -> Option<Duration> {
        self.job_deadline_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("max_workers", &self.max_workers)
            .field("portal_login_url", &self.portal_login_url)
            .field("portal_quote_url", &self.portal_quote_url)
            .field("portal_username", &self.portal_username)
            .field("browser_headless", &self.browser_headless)
            .field("session_dir", &self.session_dir)
            .field("trace_dir", &self.trace_dir)
            .field("enable_tracing", &self.enable_tracing)
            .field("job_deadline_secs", &self.job_deadline_secs)
            .finish_non_exhaustive()
    }
}

/// Non-empty value of an environment variable
fn text(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match text(var_name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_three_workers() {
        let config = Config::default();
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.element_timeout(), Duration::from_secs(10));
        assert_eq!(config.job_deadline(), Some(Duration::from_secs(900)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = Config {
            max_workers: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn unparseable_values_are_reported() {
        // unique name so parallel tests never race on it
        std::env::set_var("QPA_TEST_BAD_INT", "three");
        let err = parsed::<usize>("QPA_TEST_BAD_INT", "integer").unwrap_err();
        assert_eq!(
            err,
            ConfigError::EnvVarParseFailed {
                var_name: "QPA_TEST_BAD_INT".into(),
                value: "three".into(),
                expected_type: "integer".into(),
            }
        );
        std::env::remove_var("QPA_TEST_BAD_INT");
    }

    #[test]
    fn credentials_do_not_leak_the_password_in_debug() {
        let config = Config {
            portal_username: "agent".into(),
            portal_password: "hunter2".into(),
            ..Config::default()
        };
        let shown = format!("{:?}", config.credentials());
        assert!(shown.contains("agent"));
        assert!(!shown.contains("hunter2"));
    }
}
