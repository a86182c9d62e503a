//! Chromium portal driver - infrastructure layer
//!
//! `PortalDriver` over a chromiumoxide browser. One instance per job; the
//! browser, its profile directory and its event pump are all private to it.
//! Element work is done in page scripts through `JsExecutor`, with
//! `selectors::target` translating locators into DOM lookups.

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Browser;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::{launch_job_browser, LaunchedBrowser};
use crate::config::Config;
use crate::error::PortalError;
use crate::infrastructure::js_executor::{invocation, JsExecutor};
use crate::infrastructure::portal_driver::{Credentials, Locator, PortalDriver, RadioChoice};
use crate::infrastructure::selectors::{self, Target, DROPDOWN_OPTIONS, SUGGESTION_ITEMS};
use crate::infrastructure::session::SessionFactory;
use crate::models::{Field, Stage};

/// Shared helpers prepended to every element script.
/// `t` is the target descriptor, `arg` the operation argument.
const HELPERS: &str = r#"
const text = (el) => (el ? (el.innerText || el.textContent || '').trim() : '');
const visible = (el) => {
  if (!el || !el.isConnected) return false;
  const r = el.getBoundingClientRect();
  const s = window.getComputedStyle(el);
  return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
};
const labelOf = (input) => {
  if (input.id) {
    const byFor = document.querySelector('label[for="' + CSS.escape(input.id) + '"]');
    if (byFor) return byFor;
  }
  return input.closest('label') || input.querySelector('label') || input.parentElement;
};
const locate = (t) => {
  if (t.kind === 'css') return Array.from(document.querySelectorAll(t.selector));
  if (t.kind === 'radio') {
    const byName = Array.from(document.querySelectorAll('input[type="radio"][name="' + t.name + '"]'));
    if (byName.length) return byName;
    return Array.from(document.querySelectorAll('div.radioOption[id^="radio_' + t.name + '"]'))
      .map((div) => div.querySelector('input[type="radio"]') || div);
  }
  if (t.kind === 'field') {
    const needle = t.label.toLowerCase();
    const key = needle.replace(/\s+/g, '');
    return Array.from(document.querySelectorAll('.field'))
      .filter((f) => {
        const l = f.querySelector('label');
        if (!l) return false;
        return text(l).toLowerCase().includes(needle)
          || (l.getAttribute('for') || '').toLowerCase().includes(key);
      })
      .map((f) => f.querySelector(t.selector))
      .filter(Boolean);
  }
  const needle = t.text.toLowerCase();
  return Array.from(document.querySelectorAll(t.tag))
    .filter((el) => text(el).toLowerCase().includes(needle));
};
const shown = (el) => visible(el) || (el.type === 'radio' && visible(labelOf(el)));
const first = (t) => locate(t).find(shown);
const setValue = (el, value) => {
  const proto = el instanceof HTMLTextAreaElement
    ? HTMLTextAreaElement.prototype
    : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
  setter.call(el, value);
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
};
"#;

const IS_VISIBLE: &str = "return !!first(t);";

const FILL: &str = r#"
const el = first(t);
if (!el) return false;
el.focus();
setValue(el, '');
setValue(el, arg);
el.blur();
return true;
"#;

const CLEAR: &str = r#"
const el = first(t);
if (!el) return false;
el.focus();
setValue(el, '');
return true;
"#;

/// Modals render after the page body, so the last visible match is the
/// topmost one (the page and its modal both carry `#Next`).
const CLICK: &str = r#"
const matches = locate(t).filter(shown);
const el = matches[matches.length - 1];
if (!el) return false;
el.scrollIntoView({ block: 'center' });
el.click();
return true;
"#;

const CHECK: &str = r#"
const el = first(t);
if (!el) return false;
if (!el.checked) el.click();
return true;
"#;

/// Resolves the choice to an index (exact label, then contained label, then
/// ordinal) and clicks the option's label. Returns the index or null.
const SELECT_RADIO: &str = r#"
const inputs = locate(t);
const labels = inputs.map((i) => (text(labelOf(i)) || i.value || '').toLowerCase());
let idx = -1;
if (arg.label !== null) {
  const wanted = arg.label.toLowerCase();
  idx = labels.findIndex((l) => l === wanted);
  if (idx < 0) idx = labels.findIndex((l) => l.includes(wanted));
}
if (idx < 0 && arg.ordinal !== null && arg.ordinal < inputs.length) idx = arg.ordinal;
if (idx < 0) return null;
const input = inputs[idx];
const label = labelOf(input);
(label && visible(label) ? label : input).click();
return idx;
"#;

const OPTION_LABELS: &str = r#"
return locate(t).map((i) => text(labelOf(i)) || i.value || '');
"#;

const OPEN_DROPDOWN: &str = r#"
const el = first(t);
if (!el) return false;
el.click();
const search = el.querySelector('input.search');
if (search) {
  search.focus();
  setValue(search, arg);
}
return true;
"#;

const PICK_DROPDOWN_OPTION: &str = r#"
const options = Array.from(document.querySelectorAll(arg.options)).filter(visible);
const wanted = arg.value.toUpperCase();
const hit = options.find((o) => text(o).toUpperCase().includes(wanted));
if (!hit) return false;
hit.click();
return true;
"#;

const SUGGESTIONS_SHOWN: &str = r#"
return Array.from(document.querySelectorAll(arg)).some(visible);
"#;

const PICK_FIRST_SUGGESTION: &str = r#"
const item = Array.from(document.querySelectorAll(arg)).find(visible);
if (!item) return null;
const picked = text(item);
item.click();
return picked;
"#;

/// Substring that marks the portal's sign-in pages
const LOGIN_MARKER: &str = "login";

pub struct ChromiumPortal {
    job_id: String,
    browser: Browser,
    js: JsExecutor,
    handler: Option<JoinHandle<()>>,
    profile_dir: PathBuf,
    login_url: String,
    quote_url: String,
    element_timeout: Duration,
    login_timeout: Duration,
    /// Stage of the last locator seen, used to attribute page-level timeouts
    stage: Stage,
    closed: bool,
}

impl ChromiumPortal {
    pub fn new(job_id: &str, launched: LaunchedBrowser, config: &Config) -> Self {
        let LaunchedBrowser {
            browser,
            page,
            handler,
            profile_dir,
        } = launched;

        Self {
            job_id: job_id.to_string(),
            browser,
            js: JsExecutor::new(page),
            handler: Some(handler),
            profile_dir,
            login_url: config.portal_login_url.clone(),
            quote_url: config.portal_quote_url.clone(),
            element_timeout: config.element_timeout(),
            login_timeout: config.login_timeout(),
            stage: Stage::Login,
            closed: false,
        }
    }

    async fn run<T: serde::de::DeserializeOwned>(
        &self,
        body: &str,
        target: &JsonValue,
        arg: JsonValue,
    ) -> Result<T, PortalError> {
        let function = format!("(t, arg) => {{ {} {} }}", HELPERS, body);
        self.js.call_as(&function, &[target.clone(), arg]).await
    }

    /// Wait for the locator, returning its descriptor
    async fn visible_target(
        &mut self,
        locator: Locator,
        timeout: Duration,
    ) -> Result<JsonValue, PortalError> {
        self.stage = locator.stage;
        let target = descriptor(selectors::target(locator));
        let check = invocation(
            &format!("(t) => {{ {} {} }}", HELPERS, IS_VISIBLE),
            &[target.clone()],
        );

        if self.js.wait_until(&check, timeout).await? {
            Ok(target)
        } else {
            debug!("[job {}] {} not visible after {:?}", self.job_id, locator, timeout);
            Err(not_found(locator, timeout))
        }
    }

    async fn current_url(&self) -> Result<String, PortalError> {
        Ok(self.js.page().url().await?.unwrap_or_default())
    }

    async fn goto(&mut self, url: &str) -> Result<(), PortalError> {
        let stage = self.stage;
        match tokio::time::timeout(self.login_timeout, self.js.page().goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(PortalError::timeout(stage, format!("loading {}", url))),
        }
    }

    async fn submit_login_form(&mut self, credentials: &Credentials) -> Result<(), PortalError> {
        if !self.current_url().await?.to_lowercase().contains(LOGIN_MARKER) {
            let login_url = self.login_url.clone();
            self.goto(&login_url).await?;
        }

        let login = |field| Locator::new(Stage::Login, field);
        self.fill(login(Field::Username), &credentials.username).await?;
        self.fill(login(Field::Password), &credentials.password).await?;

        let remember = descriptor(selectors::target(login(Field::RememberMe)));
        if !self.run::<bool>(CHECK, &remember, JsonValue::Null).await? {
            debug!("[job {}] remember-me checkbox not rendered", self.job_id);
        }

        self.click(login(Field::LoginButton)).await
    }
}

#[async_trait]
impl PortalDriver for ChromiumPortal {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), PortalError> {
        self.stage = Stage::Login;
        let quote_url = self.quote_url.clone();
        self.goto(&quote_url)
            .await
            .map_err(|e| login_failure("opening the quote page", e))?;

        if !self.current_url().await?.to_lowercase().contains(LOGIN_MARKER) {
            info!("[job {}] ✓ existing portal session reused", self.job_id);
            return Ok(());
        }

        info!("[job {}] signing in as {}", self.job_id, credentials.username);
        self.submit_login_form(credentials)
            .await
            .map_err(|e| login_failure("login form", e))?;

        let left_login = format!(
            "!window.location.href.toLowerCase().includes('{}')",
            LOGIN_MARKER
        );
        if !self.js.wait_until(&left_login, self.login_timeout).await? {
            return Err(PortalError::session(format!(
                "still on the login page after {}s",
                self.login_timeout.as_secs()
            )));
        }

        if !self.current_url().await?.starts_with(&self.quote_url) {
            self.goto(&quote_url)
                .await
                .map_err(|e| login_failure("returning to the quote page", e))?;
        }

        info!("[job {}] ✓ logged in", self.job_id);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), PortalError> {
        self.goto(url).await
    }

    async fn wait_for_visible(
        &mut self,
        locator: Locator,
        timeout: Duration,
    ) -> Result<(), PortalError> {
        self.visible_target(locator, timeout).await.map(|_| ())
    }

    async fn fill(&mut self, locator: Locator, value: &str) -> Result<(), PortalError> {
        let target = self.visible_target(locator, self.element_timeout).await?;
        if self.run::<bool>(FILL, &target, json!(value)).await? {
            Ok(())
        } else {
            Err(not_found(locator, self.element_timeout))
        }
    }

    async fn select_radio(
        &mut self,
        locator: Locator,
        choice: RadioChoice,
    ) -> Result<(), PortalError> {
        let target = self.visible_target(locator, self.element_timeout).await?;
        let (label, ordinal) = match choice {
            RadioChoice::Label(label) => (Some(label), None),
            RadioChoice::Ordinal(idx) => (None, Some(idx)),
            RadioChoice::LabelOrOrdinal(label, idx) => (Some(label), Some(idx)),
        };

        let picked: Option<usize> = self
            .run(SELECT_RADIO, &target, json!({ "label": label, "ordinal": ordinal }))
            .await?;

        match picked {
            Some(idx) => {
                debug!("[job {}] {} -> option #{}", self.job_id, locator, idx + 1);
                Ok(())
            }
            None => Err(PortalError::NoSelectableOption {
                stage: locator.stage,
                field: locator.field,
                reason: format!("no option matching {}", choice),
            }),
        }
    }

    async fn select_from_dropdown(
        &mut self,
        locator: Locator,
        value: &str,
    ) -> Result<(), PortalError> {
        let target = self.visible_target(locator, self.element_timeout).await?;
        if !self.run::<bool>(OPEN_DROPDOWN, &target, json!(value)).await? {
            return Err(not_found(locator, self.element_timeout));
        }

        let pick = invocation(
            &format!("(t, arg) => {{ {} {} }}", HELPERS, PICK_DROPDOWN_OPTION),
            &[target, json!({ "options": DROPDOWN_OPTIONS, "value": value })],
        );
        if self.js.wait_until(&pick, self.element_timeout).await? {
            Ok(())
        } else {
            Err(PortalError::NoSelectableOption {
                stage: locator.stage,
                field: locator.field,
                reason: format!("no dropdown option containing '{}'", value),
            })
        }
    }

    async fn select_first_autocomplete_suggestion(
        &mut self,
        locator: Locator,
        text: &str,
    ) -> Result<String, PortalError> {
        let target = self.visible_target(locator, self.element_timeout).await?;

        // geosuggest only reacts to real key events
        match selectors::target(locator) {
            Target::Css(css) => {
                self.run::<bool>(CLEAR, &target, JsonValue::Null).await?;
                self.js
                    .page()
                    .find_element(css)
                    .await?
                    .click()
                    .await?
                    .type_str(text)
                    .await?;
            }
            _ => {
                self.run::<bool>(FILL, &target, json!(text)).await?;
            }
        }

        let shown = invocation(
            &format!("(t, arg) => {{ {} {} }}", HELPERS, SUGGESTIONS_SHOWN),
            &[target.clone(), json!(SUGGESTION_ITEMS)],
        );
        if !self.js.wait_until(&shown, self.element_timeout).await? {
            return Err(PortalError::timeout(
                locator.stage,
                format!("waiting for suggestions of {}", locator.field),
            ));
        }

        let picked: Option<String> = self
            .run(PICK_FIRST_SUGGESTION, &target, json!(SUGGESTION_ITEMS))
            .await?;
        picked.ok_or_else(|| PortalError::NoSelectableOption {
            stage: locator.stage,
            field: locator.field,
            reason: "suggestion list vanished before it could be clicked".to_string(),
        })
    }

    async fn click(&mut self, locator: Locator) -> Result<(), PortalError> {
        let target = self.visible_target(locator, self.element_timeout).await?;
        if self.run::<bool>(CLICK, &target, JsonValue::Null).await? {
            Ok(())
        } else {
            Err(not_found(locator, self.element_timeout))
        }
    }

    async fn option_labels(&mut self, locator: Locator) -> Result<Vec<String>, PortalError> {
        let target = self.visible_target(locator, self.element_timeout).await?;
        self.run(OPTION_LABELS, &target, JsonValue::Null).await
    }

    async fn is_present(&mut self, locator: Locator) -> Result<bool, PortalError> {
        self.stage = locator.stage;
        let target = descriptor(selectors::target(locator));
        self.run(IS_VISIBLE, &target, JsonValue::Null).await
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), PortalError> {
        let params = ScreenshotParams::builder().full_page(true).build();
        match tokio::time::timeout(
            self.element_timeout,
            self.js.page().save_screenshot(params, path),
        )
        .await
        {
            Ok(saved) => {
                saved?;
                Ok(())
            }
            Err(_) => Err(PortalError::timeout(self.stage, "taking a screenshot")),
        }
    }

    async fn close(&mut self) -> Result<(), PortalError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("[job {}] ⚠️ browser process wait failed: {}", self.job_id, e);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!(
            "[job {}] browser closed, profile kept at {}",
            self.job_id,
            self.profile_dir.display()
        );

        closed?;
        Ok(())
    }
}

impl Drop for ChromiumPortal {
    fn drop(&mut self) {
        // dropping `Browser` ends the child process; the event pump is ours
        if let Some(handler) = self.handler.take() {
            warn!("[job {}] ⚠️ browser dropped without close", self.job_id);
            handler.abort();
        }
    }
}

/// Opens a Chromium-backed driver per job
pub struct ChromiumSessionFactory {
    config: Config,
}

impl ChromiumSessionFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn open(&self, job_id: &str) -> Result<Box<dyn PortalDriver>, PortalError> {
        let launched = launch_job_browser(&self.config, job_id).await?;
        Ok(Box::new(ChromiumPortal::new(job_id, launched, &self.config)))
    }
}

/// JSON form of a target, as read by the page helpers
fn descriptor(target: Target) -> JsonValue {
    match target {
        Target::Css(selector) => json!({ "kind": "css", "selector": selector }),
        Target::RadioGroup(name) => json!({ "kind": "radio", "name": name }),
        Target::Text { tag, text } => json!({ "kind": "text", "tag": tag, "text": text }),
        Target::InField { label, selector } => {
            json!({ "kind": "field", "label": label, "selector": selector })
        }
    }
}

/// Anything short of a CDP failure that stops login is a session failure
fn login_failure(context: &str, err: PortalError) -> PortalError {
    match err {
        PortalError::Browser(_) | PortalError::Session { .. } => err,
        other => PortalError::session(format!("{}: {}", context, other)),
    }
}

fn not_found(locator: Locator, waited: Duration) -> PortalError {
    PortalError::ElementNotFound {
        stage: locator.stage,
        field: locator.field,
        waited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn descriptors_match_the_page_helpers() {
        assert_eq!(
            descriptor(Target::RadioGroup("protectionClass")),
            json!({ "kind": "radio", "name": "protectionClass" })
        );
        assert_eq!(
            descriptor(Target::Text { tag: "button", text: "login" })["kind"],
            "text"
        );
        assert_eq!(
            descriptor(Target::InField {
                label: "class code",
                selector: ".ui.search.selection.dropdown",
            }),
            json!({
                "kind": "field",
                "label": "class code",
                "selector": ".ui.search.selection.dropdown",
            })
        );
    }

    #[test]
    fn login_timeouts_become_session_failures() {
        let slow = PortalError::timeout(Stage::Login, "loading https://portal/quote");
        let err = login_failure("opening the quote page", slow);
        assert_eq!(err.kind(), FailureKind::Session);
        assert!(err.to_string().contains("opening the quote page"));

        let missing = not_found(
            Locator::new(Stage::Login, Field::Username),
            Duration::from_secs(10),
        );
        assert!(matches!(
            login_failure("login form", missing),
            PortalError::Session { .. }
        ));

        let rejected = PortalError::session("still on the login page");
        assert_eq!(
            login_failure("login form", rejected).to_string(),
            "session error: still on the login page"
        );
    }

    #[tokio::test]
    #[ignore = "needs a local Chromium and portal credentials"]
    async fn logs_into_the_live_portal() {
        let config = Config::from_env().expect("config");
        let factory = ChromiumSessionFactory::new(config.clone());
        let mut driver = factory.open("live-login-check").await.expect("browser");
        driver
            .login(&config.credentials())
            .await
            .expect("login should succeed");
        driver.close().await.expect("close");
    }
}
