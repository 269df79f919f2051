//! Page scripts and their evaluation.
//!
//! Every script returns an envelope, `{ value }` or `{ missing: selector }`, so a
//! null result and an absent element stay distinguishable on the Rust side.

use chromiumoxide::Page;
use inbot_engine::error::BackendError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Prevents hanging when a dialog blocks the JS thread.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors during page navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;

const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    missing: Option<String>,
    value: Option<T>,
}

fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
) -> Result<serde_json::Value, BackendError> {
    match tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await {
        Err(_) => Err(BackendError::Timeout(
            "script evaluation, possibly blocked by a dialog".into(),
        )),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(BackendError::Context(err_str))
            } else {
                Err(BackendError::Script(err_str))
            }
        }
        Ok(Ok(remote_object)) => remote_object
            .into_value::<serde_json::Value>()
            .map_err(|e| BackendError::Script(format!("Failed to get result: {}", e))),
    }
}

/// Evaluate `expression`, retrying while the page is between documents. `Ok(None)`
/// means the script ran and produced a null value.
pub async fn evaluate<T: DeserializeOwned>(
    page: &Page,
    expression: &str,
) -> Result<Option<T>, BackendError> {
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match evaluate_with_timeout(page, expression).await {
            Ok(raw) => {
                let envelope: Envelope<T> = serde_json::from_value(raw)?;
                if let Some(selector) = envelope.missing {
                    return Err(BackendError::ElementNotFound(selector));
                }
                return Ok(envelope.value);
            }
            Err(BackendError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during evaluation (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(err) => return Err(err),
        }
    }

    Err(BackendError::Context(last_error.unwrap_or_else(|| {
        "evaluation failed after retries".to_string()
    })))
}

/// Like [`evaluate`], for scripts that always produce a value.
pub async fn evaluate_value<T: DeserializeOwned>(
    page: &Page,
    expression: &str,
) -> Result<T, BackendError> {
    evaluate(page, expression)
        .await?
        .ok_or_else(|| BackendError::Script(format!("script returned no value: {}", expression)))
}

/// JS string literal for `value`.
fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Script running `body` against the `index`-th match of `selector`, bound to `el`.
fn with_element(selector: &str, index: usize, body: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelectorAll({sel})[{index}]; \
         if (!el) return {{ missing: {label} }}; {body} }})()",
        sel = quote(selector),
        label = quote(&format!("{}[{}]", selector, index)),
    )
}

/// Like [`with_element`], with the first descendant of the scope matching `child`
/// bound to `found` (or null).
fn with_descendant(selector: &str, index: usize, child: &str, body: &str) -> String {
    with_element(
        selector,
        index,
        &format!("const found = el.querySelector({}); {}", quote(child), body),
    )
}

pub fn count(selector: &str) -> String {
    format!(
        "(() => ({{ value: document.querySelectorAll({}).length }}))()",
        quote(selector)
    )
}

pub fn contains(selector: &str, index: usize, child: &str) -> String {
    with_descendant(selector, index, child, "return { value: found !== null };")
}

pub fn descendant_text(selector: &str, index: usize, child: &str) -> String {
    with_descendant(
        selector,
        index,
        child,
        &format!(
            "if (!found) return {{ missing: {} }}; return {{ value: found.innerText }};",
            quote(child)
        ),
    )
}

pub fn element_text(selector: &str, index: usize) -> String {
    with_element(selector, index, "return { value: el.innerText };")
}

pub fn descendant_attribute(selector: &str, index: usize, child: &str, name: &str) -> String {
    with_descendant(
        selector,
        index,
        child,
        &format!(
            "return {{ value: found ? found.getAttribute({}) : null }};",
            quote(name)
        ),
    )
}

pub fn focus(selector: &str, index: usize) -> String {
    with_element(selector, index, "el.focus(); return { value: true };")
}

/// One scroll step: jump to the bottom and report the resulting position.
pub fn scroll_step(selector: &str) -> String {
    with_element(
        selector,
        0,
        "el.scrollTop = el.scrollHeight; return { value: el.scrollTop };",
    )
}
