//! Page helpers shared by the run components.

use crate::backend::{Backend, ElementRef, NavigationResult};
use crate::error::{BackendError, InboxError};
use crate::retry::RetryPolicy;
use std::time::Duration;

pub async fn navigate<B: Backend + ?Sized>(
    backend: &mut B,
    retry: &RetryPolicy,
    url: &str,
) -> Result<NavigationResult, BackendError> {
    let target = url.to_string();
    retry
        .run_on("navigation", backend, move |b| {
            let target = target.clone();
            Box::pin(async move { b.navigate(&target).await })
        })
        .await
}

/// Wait for an element the caller cannot proceed without. Transient failures are
/// retried; a selector that never shows up becomes `MissingElement`.
pub async fn wait_required<B: Backend + ?Sized>(
    backend: &mut B,
    retry: &RetryPolicy,
    selector: &str,
    timeout: Duration,
    context: &str,
) -> Result<(), InboxError> {
    let target = selector.to_string();
    retry
        .run_on("element wait", backend, move |b| {
            let target = target.clone();
            Box::pin(async move { b.wait_for(&target, timeout).await })
        })
        .await
        .map_err(|err| {
            if err.is_missing() {
                InboxError::missing(selector, context)
            } else {
                InboxError::Backend(err)
            }
        })
}

/// Text of a descendant that may legitimately be absent.
pub async fn optional_text<B: Backend + ?Sized>(
    backend: &mut B,
    scope: &ElementRef,
    selector: &str,
) -> Result<Option<String>, BackendError> {
    match backend.read_text(scope, selector).await {
        Ok(text) => Ok(Some(text.trim().to_string())),
        Err(BackendError::ElementNotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}
