//! JS executor - infrastructure layer
//!
//! Holds the job's page and exposes script evaluation. DOM lookups of the
//! Chromium driver all go through here.

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::PortalError;

/// Poll interval for `wait_until`
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Evaluate an expression and return its JSON value
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, PortalError> {
        let result = self.page.evaluate(js_code.into()).await?;
        // `undefined` results carry no value
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    /// Evaluate and deserialize into `T`
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, PortalError> {
        let json_value = self.eval(js_code).await?;
        Ok(serde_json::from_value(json_value)?)
    }

    /// Invoke a function expression with JSON arguments, e.g.
    /// `call_as("(sel) => !!document.querySelector(sel)", &[json!("#id")])`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        function: &str,
        args: &[JsonValue],
    ) -> Result<T, PortalError> {
        self.eval_as(invocation(function, args)).await
    }

    /// Re-evaluate `js_code` until it yields `true` or `timeout` elapses.
    /// Returns whether the condition was met.
    pub async fn wait_until(
        &self,
        js_code: &str,
        timeout: Duration,
    ) -> Result<bool, PortalError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval(js_code).await?.as_bool().unwrap_or(false) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Source text calling `function` with `args` inlined as JSON literals
pub fn invocation(function: &str, args: &[JsonValue]) -> String {
    let encoded: Vec<String> = args.iter().map(JsonValue::to_string).collect();
    format!("({})({})", function, encoded.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invocation_inlines_json_arguments() {
        let src = invocation("(a, b) => a + b", &[json!("x\"y"), json!(2)]);
        assert_eq!(src, r#"((a, b) => a + b)("x\"y", 2)"#);
    }
}
