//! Portal driver - infrastructure layer
//!
//! Capability set the quote flow drives. An implementation owns exactly one
//! browser context; it knows selectors, the flow only knows `Locator`s.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::PortalError;
use crate::models::{Field, Stage};

/// Semantic address of an element: which page, which field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub stage: Stage,
    pub field: Field,
}

impl Locator {
    pub const fn new(stage: Stage, field: Field) -> Self {
        Self { stage, field }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage, self.field)
    }
}

/// Which option of a radio group to pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioChoice {
    /// Option whose rendered label contains the text (case-insensitive)
    Label(&'static str),
    /// Zero-based rendered position
    Ordinal(usize),
    /// Label first, position when no rendered label matches
    LabelOrOrdinal(&'static str, usize),
}

impl fmt::Display for RadioChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioChoice::Label(label) => write!(f, "'{}'", label),
            RadioChoice::Ordinal(idx) => write!(f, "#{}", idx + 1),
            RadioChoice::LabelOrOrdinal(label, idx) => write!(f, "'{}' (or #{})", label, idx + 1),
        }
    }
}

/// Portal account
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Page-level operations against one live browser session.
///
/// Every element operation waits for its target to become visible (bounded
/// by the driver's element timeout) before acting and reports
/// `PortalError::ElementNotFound` with the locator's stage and field when it
/// does not.
#[async_trait]
pub trait PortalDriver: Send {
    /// Reach the authenticated quote landing page or fail with `Session`
    async fn login(&mut self, credentials: &Credentials) -> Result<(), PortalError>;

    async fn navigate(&mut self, url: &str) -> Result<(), PortalError>;

    async fn wait_for_visible(
        &mut self,
        locator: Locator,
        timeout: Duration,
    ) -> Result<(), PortalError>;

    /// Clear the input and enter `value`
    async fn fill(&mut self, locator: Locator, value: &str) -> Result<(), PortalError>;

    async fn select_radio(
        &mut self,
        locator: Locator,
        choice: RadioChoice,
    ) -> Result<(), PortalError>;

    /// Open a dropdown and pick the option whose text contains `value`
    async fn select_from_dropdown(
        &mut self,
        locator: Locator,
        value: &str,
    ) -> Result<(), PortalError>;

    /// Type `text`, wait for suggestions, click the first one. Returns the
    /// text of the suggestion that was picked.
    async fn select_first_autocomplete_suggestion(
        &mut self,
        locator: Locator,
        text: &str,
    ) -> Result<String, PortalError>;

    async fn click(&mut self, locator: Locator) -> Result<(), PortalError>;

    /// Rendered labels of a radio group, in DOM order
    async fn option_labels(&mut self, locator: Locator) -> Result<Vec<String>, PortalError>;

    /// Whether an optional element is currently rendered. Never waits.
    async fn is_present(&mut self, locator: Locator) -> Result<bool, PortalError>;

    /// Save a PNG of the current page to `path`
    async fn screenshot(&mut self, path: &Path) -> Result<(), PortalError>;

    /// Release the browser context
    async fn close(&mut self) -> Result<(), PortalError>;
}
