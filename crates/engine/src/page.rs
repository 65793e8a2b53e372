//! Page driving over CDP.
//!
//! Element lookup runs inside the page: controls are addressed by accessible
//! role and label the way the login flow names them, resolved by an injected
//! script. The act scripts are find-and-act in one evaluation, so polling
//! them has no side effect until the control exists.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::warn;

use crmv_auth::driver::DriverResult;
use crmv_auth::{DriverError, PageDriver, Role, Target};
use crmv_protocol::{Cookie, LocalStorageEntry, OriginState, SameSite, StorageState};

use crate::cdp::CdpConnection;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const FIND_TEXTBOX: &str = r#"
const findTarget = () => {
  const name = __NAME__;
  const norm = (t) => (t || '').trim().replace(/\s+/g, ' ');
  const matches = (t) => norm(t) === name;
  const fields = Array.from(document.querySelectorAll('input, textarea')).filter(
    (el) => !['hidden', 'submit', 'button', 'checkbox', 'radio'].includes(el.type)
  );
  for (const el of fields) {
    if (matches(el.getAttribute('aria-label')) || matches(el.placeholder)) return el;
    if (el.labels && Array.from(el.labels).some((l) => matches(l.textContent))) return el;
    if (el.id) {
      const label = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (label && matches(label.textContent)) return el;
    }
  }
  return null;
};
"#;

const FIND_BUTTON: &str = r#"
const findTarget = () => {
  const name = __NAME__;
  const norm = (t) => (t || '').trim().replace(/\s+/g, ' ');
  const matches = (t) => norm(t) === name;
  const candidates = Array.from(
    document.querySelectorAll('button, input[type="submit"], input[type="button"], [role="button"]')
  );
  for (const el of candidates) {
    const text = el.tagName === 'INPUT' ? el.value : el.textContent;
    if (matches(text) || matches(el.getAttribute('aria-label')) || matches(el.getAttribute('title'))) {
      return el;
    }
  }
  return null;
};
"#;

const FILL_ACTION: &str = r#"
const el = findTarget();
if (!el) return false;
const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
el.focus();
setter.call(el, __VALUE__);
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

const CLICK_ACTION: &str = r#"
const el = findTarget();
if (!el) return false;
el.click();
return true;
"#;

const LOCAL_STORAGE_SNAPSHOT: &str = r#"
(() => {
  const entries = [];
  for (let i = 0; i < localStorage.length; i++) {
    const key = localStorage.key(i);
    entries.push([key, localStorage.getItem(key)]);
  }
  return { origin: window.location.origin, entries };
})()
"#;

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn find_snippet(target: &Target) -> String {
    let template = match target.role {
        Role::Textbox => FIND_TEXTBOX,
        Role::Button => FIND_BUTTON,
    };
    template.replace("__NAME__", &js_string(&target.name))
}

fn wrap(find: &str, action: &str) -> String {
    format!("(() => {{\n{find}\n{action}\n}})()")
}

fn presence_script(target: &Target) -> String {
    wrap(&find_snippet(target), "return findTarget() !== null;")
}

fn fill_script(target: &Target, value: &str) -> String {
    let action = FILL_ACTION.replace("__VALUE__", &js_string(value));
    wrap(&find_snippet(target), &action)
}

fn click_script(target: &Target) -> String {
    wrap(&find_snippet(target), CLICK_ACTION)
}

/// One CDP page session implementing the login-flow driver seam.
pub struct CdpPage {
    conn: Arc<CdpConnection>,
    session_id: String,
}

impl CdpPage {
    pub(crate) fn new(conn: Arc<CdpConnection>, session_id: String) -> Self {
        Self { conn, session_id }
    }

    async fn eval(&self, expression: &str) -> DriverResult<Value> {
        let result = self
            .conn
            .call(
                Some(&self.session_id),
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("uncaught exception");
            return Err(DriverError::Protocol(format!("evaluate failed: {text}")));
        }

        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn eval_bool(&self, expression: &str) -> DriverResult<bool> {
        Ok(self.eval(expression).await?.as_bool().unwrap_or(false))
    }

    /// Polls an act script (returns `true` once it found and acted on the
    /// control) until it succeeds or `timeout` passes.
    async fn act_when_present(
        &self,
        target: &Target,
        script: &str,
        timeout: Duration,
    ) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval_bool(script).await? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DriverError::ElementNotFound {
                    target: target.to_string(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn url(&self) -> DriverResult<String> {
        Ok(self
            .eval("window.location.href")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;

        let result = self
            .conn
            .call(Some(&self.session_id), "Page.navigate", json!({ "url": url }))
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                source: anyhow::Error::new(e),
            })?;

        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    source: anyhow::anyhow!("{error_text}"),
                });
            }
        }

        // No load-event plumbing: readiness is polled, bounded by `timeout`.
        loop {
            let ready = self
                .eval("document.readyState")
                .await
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            if ready == "interactive" || ready == "complete" {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DriverError::Timeout {
                    ms: timeout.as_millis() as u64,
                    condition: format!("load of {url}"),
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn fill(&self, target: &Target, value: &str, timeout: Duration) -> DriverResult<()> {
        self.act_when_present(target, &fill_script(target, value), timeout)
            .await
    }

    async fn click(&self, target: &Target, timeout: Duration) -> DriverResult<()> {
        self.act_when_present(target, &click_script(target), timeout)
            .await
    }

    async fn is_present(&self, target: &Target) -> DriverResult<bool> {
        self.eval_bool(&presence_script(target)).await
    }

    async fn storage_state(&self) -> DriverResult<StorageState> {
        let result = self.conn.call(None, "Storage.getCookies", json!({})).await?;
        let cookies = result
            .get("cookies")
            .and_then(Value::as_array)
            .map(|cookies| cookies.iter().map(map_cookie).collect())
            .unwrap_or_default();

        // Cookie material is what authentication lives in; the localStorage
        // snapshot of the landing origin is best-effort.
        let origins = match self.eval(LOCAL_STORAGE_SNAPSHOT).await {
            Ok(snapshot) => map_origin(&snapshot).into_iter().collect(),
            Err(err) => {
                warn!(target = "crmv.engine", error = %err, "localStorage capture failed");
                Vec::new()
            }
        };

        Ok(StorageState { cookies, origins })
    }
}

fn map_cookie(value: &Value) -> Cookie {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Cookie {
        name: field("name"),
        value: field("value"),
        domain: field("domain"),
        path: field("path"),
        // CDP reports -1 for session cookies.
        expires: value
            .get("expires")
            .and_then(Value::as_f64)
            .filter(|e| *e > 0.0),
        http_only: value
            .get("httpOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        secure: value
            .get("secure")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        same_site: match value.get("sameSite").and_then(Value::as_str) {
            Some("Strict") => SameSite::Strict,
            Some("None") => SameSite::None,
            _ => SameSite::Lax,
        },
    }
}

fn map_origin(snapshot: &Value) -> Option<OriginState> {
    let origin = snapshot.get("origin")?.as_str()?.to_string();
    let entries = snapshot.get("entries")?.as_array()?;

    let local_storage: Vec<LocalStorageEntry> = entries
        .iter()
        .filter_map(|entry| {
            let pair = entry.as_array()?;
            Some(LocalStorageEntry {
                name: pair.first()?.as_str()?.to_string(),
                value: pair.get(1)?.as_str()?.to_string(),
            })
        })
        .collect();

    if local_storage.is_empty() {
        return None;
    }
    Some(OriginState {
        origin,
        local_storage,
    })
}
