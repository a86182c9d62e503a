//! Simulated portal shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quote_portal_automation::error::PortalError;
use quote_portal_automation::infrastructure::{
    Credentials, Locator, PortalDriver, RadioChoice, SessionFactory,
};
use quote_portal_automation::models::{Field, RawFields, Stage};
use quote_portal_automation::Config;

/// What goes wrong, and where
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// First element operation of the stage reports the element missing
    MissingElement,
    /// First element operation of the stage panics
    Panic,
}

/// Behaviour of one simulated session
#[derive(Debug, Clone)]
pub struct Script {
    pub fault: Option<(Stage, Fault)>,
    pub protection_labels: Vec<String>,
    pub ancillary_present: bool,
    pub reject_login: bool,
    pub panic_on_open: bool,
    /// Panics after the browser is released
    pub panic_on_close: bool,
    /// Latency of every driver call
    pub op_delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            fault: None,
            protection_labels: vec!["(2)".into(), "(1x)".into(), "(1)".into()],
            ancillary_present: true,
            reject_login: false,
            panic_on_open: false,
            panic_on_close: false,
            op_delay: Duration::ZERO,
        }
    }
}

impl Script {
    pub fn failing_at(stage: Stage, fault: Fault) -> Self {
        Self {
            fault: Some((stage, fault)),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }
}

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: &'static str,
    pub locator: Option<Locator>,
    pub value: Option<String>,
    pub choice: Option<RadioChoice>,
}

pub type Journal = Arc<Mutex<Vec<Call>>>;

pub struct SimulatedPortal {
    job_id: String,
    script: Script,
    journal: Journal,
    on_close: Option<Box<dyn FnOnce(&str) + Send>>,
}

impl SimulatedPortal {
    pub fn new(script: Script) -> (Self, Journal) {
        let journal: Journal = Arc::default();
        (
            Self {
                job_id: "direct".into(),
                script,
                journal: journal.clone(),
                on_close: None,
            },
            journal,
        )
    }

    fn record(
        &self,
        op: &'static str,
        locator: Option<Locator>,
        value: Option<String>,
        choice: Option<RadioChoice>,
    ) {
        self.journal.lock().unwrap().push(Call {
            op,
            locator,
            value,
            choice,
        });
    }

    async fn step(&mut self, locator: Locator) -> Result<(), PortalError> {
        if !self.script.op_delay.is_zero() {
            tokio::time::sleep(self.script.op_delay).await;
        }
        match self.script.fault {
            Some((stage, Fault::MissingElement)) if stage == locator.stage => {
                Err(PortalError::ElementNotFound {
                    stage: locator.stage,
                    field: locator.field,
                    waited: Duration::from_millis(50),
                })
            }
            Some((stage, Fault::Panic)) if stage == locator.stage => {
                panic!("simulated crash in {} for {}", stage, self.job_id)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PortalDriver for SimulatedPortal {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), PortalError> {
        self.record("login", None, Some(credentials.username.clone()), None);
        if self.script.reject_login {
            return Err(PortalError::session("still on the login page"));
        }
        self.step(Locator::new(Stage::Login, Field::LoginButton)).await
    }

    async fn navigate(&mut self, url: &str) -> Result<(), PortalError> {
        self.record("navigate", None, Some(url.into()), None);
        Ok(())
    }

    async fn wait_for_visible(
        &mut self,
        locator: Locator,
        _timeout: Duration,
    ) -> Result<(), PortalError> {
        self.record("wait", Some(locator), None, None);
        self.step(locator).await
    }

    async fn fill(&mut self, locator: Locator, value: &str) -> Result<(), PortalError> {
        self.record("fill", Some(locator), Some(value.into()), None);
        self.step(locator).await
    }

    async fn select_radio(
        &mut self,
        locator: Locator,
        choice: RadioChoice,
    ) -> Result<(), PortalError> {
        self.record("radio", Some(locator), None, Some(choice));
        self.step(locator).await
    }

    async fn select_from_dropdown(
        &mut self,
        locator: Locator,
        value: &str,
    ) -> Result<(), PortalError> {
        self.record("dropdown", Some(locator), Some(value.into()), None);
        self.step(locator).await
    }

    async fn select_first_autocomplete_suggestion(
        &mut self,
        locator: Locator,
        text: &str,
    ) -> Result<String, PortalError> {
        self.record("autocomplete", Some(locator), Some(text.into()), None);
        self.step(locator).await?;
        Ok(format!("{}, USA", text))
    }

    async fn click(&mut self, locator: Locator) -> Result<(), PortalError> {
        self.record("click", Some(locator), None, None);
        self.step(locator).await
    }

    async fn option_labels(&mut self, locator: Locator) -> Result<Vec<String>, PortalError> {
        self.record("options", Some(locator), None, None);
        self.step(locator).await?;
        Ok(match locator.field {
            Field::ProtectionClass => self.script.protection_labels.clone(),
            _ => Vec::new(),
        })
    }

    async fn is_present(&mut self, locator: Locator) -> Result<bool, PortalError> {
        self.record("present", Some(locator), None, None);
        self.step(locator).await?;
        Ok(match locator.field {
            Field::AncillaryBuilding => self.script.ancillary_present,
            // landing page first, so the flow has to start a quote
            Field::EffectiveDate => false,
            _ => true,
        })
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), PortalError> {
        self.record("screenshot", None, Some(path.display().to_string()), None);
        std::fs::write(path, b"\x89PNG simulated")?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PortalError> {
        self.record("close", None, None, None);
        if let Some(on_close) = self.on_close.take() {
            on_close(&self.job_id);
        }
        if self.script.panic_on_close {
            panic!("simulated crash while closing {}", self.job_id);
        }
        Ok(())
    }
}

/// Hands out simulated sessions and tracks how they are used
#[derive(Clone, Default)]
pub struct SimulatedFactory {
    default_script: Script,
    scripts: HashMap<String, Script>,
    opened: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Vec<String>>>,
    journals: Arc<Mutex<HashMap<String, Journal>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SimulatedFactory {
    pub fn new(default_script: Script) -> Self {
        Self {
            default_script,
            ..Self::default()
        }
    }

    pub fn with_job(mut self, job_id: &str, script: Script) -> Self {
        self.scripts.insert(job_id.to_string(), script);
        self
    }

    /// Job ids in the order their sessions were opened
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    /// Most sessions ever open at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self, job_id: &str) -> Vec<Call> {
        self.journals
            .lock()
            .unwrap()
            .get(job_id)
            .map(|journal| journal.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionFactory for SimulatedFactory {
    async fn open(&self, job_id: &str) -> Result<Box<dyn PortalDriver>, PortalError> {
        let script = self
            .scripts
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| self.default_script.clone());
        if script.panic_on_open {
            panic!("simulated crash opening {}", job_id);
        }

        let (mut portal, journal) = SimulatedPortal::new(script);
        portal.job_id = job_id.to_string();

        self.opened.lock().unwrap().push(job_id.to_string());
        self.journals
            .lock()
            .unwrap()
            .insert(job_id.to_string(), journal);

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let active = self.active.clone();
        let closed = self.closed.clone();
        portal.on_close = Some(Box::new(move |id: &str| {
            active.fetch_sub(1, Ordering::SeqCst);
            closed.lock().unwrap().push(id.to_string());
        }));

        Ok(Box::new(portal))
    }
}

pub fn test_config(trace_dir: &Path, max_workers: usize) -> Config {
    Config {
        max_workers,
        portal_username: "agent".into(),
        portal_password: "secret".into(),
        trace_dir: trace_dir.to_path_buf(),
        enable_tracing: true,
        element_timeout_ms: 50,
        job_deadline_secs: None,
        ..Config::default()
    }
}

/// Only the required fields, everything else defaulted
pub fn minimal_payload(company: &str) -> RawFields {
    json!({
        "contact_name": "Pat Doe",
        "email": "pat@example.com",
        "company_name": company,
        "address": "123 Main St, Springfield, MO",
    })
    .as_object()
    .cloned()
    .unwrap()
}

pub fn with_field(mut payload: RawFields, key: &str, value: serde_json::Value) -> RawFields {
    payload.insert(key.to_string(), value);
    payload
}

/// Calls made against one field
pub fn calls_for(calls: &[Call], field: Field) -> Vec<Call> {
    calls
        .iter()
        .filter(|c| c.locator.map(|l| l.field) == Some(field))
        .cloned()
        .collect()
}
