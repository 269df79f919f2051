//! Browser session lifecycle: acquire, authenticate, release.

use crate::backend::{Backend, ElementRef, LaunchOptions};
use crate::config::SelectorPack;
use crate::error::InboxError;
use crate::page;
use crate::retry::RetryPolicy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Builds a fresh, not yet launched backend for each session.
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The authenticated browser context of one run.
pub struct Session {
    backend: Box<dyn Backend>,
    released: bool,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            released: false,
        }
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Close the browser. Later calls are no-ops, so every exit path can call this.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.backend.close().await {
            Ok(()) => info!("Session released"),
            Err(e) => warn!("Error while releasing session: {}", e),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.released {
            warn!("Session dropped without being released");
        }
    }
}

pub struct SessionManager {
    factory: BackendFactory,
    selectors: Arc<SelectorPack>,
    retry: RetryPolicy,
    wait_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        factory: BackendFactory,
        selectors: Arc<SelectorPack>,
        retry: RetryPolicy,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            selectors,
            retry,
            wait_timeout,
        }
    }

    /// Launch one browser. The caller owns the session and must release it.
    pub async fn acquire(&self, headless: bool) -> Result<Session, InboxError> {
        let options = LaunchOptions::for_mode(headless);
        info!(
            "Acquiring {} session",
            if headless { "headless" } else { "visible" }
        );
        let mut backend = (self.factory)();
        if let Err(err) = backend.launch(&options).await {
            // A half-started browser still has to go.
            if let Err(close_err) = backend.close().await {
                warn!("Error while closing failed launch: {}", close_err);
            }
            return Err(err.into());
        }
        Ok(Session::new(backend))
    }

    /// Log in with `credentials`. On failure the session is released before the
    /// error is returned, so nothing can navigate with it afterwards.
    pub async fn authenticate(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), InboxError> {
        let outcome = self
            .try_authenticate(session.backend_mut(), credentials)
            .await
            .map_err(|err| match err {
                InboxError::AuthenticationFailure(_) => err,
                other => InboxError::AuthenticationFailure(other.to_string()),
            });

        if let Err(err) = &outcome {
            error!("{}", err);
            session.release().await;
        }
        outcome
    }

    pub async fn release(&self, session: &mut Session) {
        session.release().await;
    }

    async fn try_authenticate<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        credentials: &Credentials,
    ) -> Result<(), InboxError> {
        let login = &self.selectors.login;

        page::navigate(backend, &self.retry, &login.url).await?;
        page::wait_required(
            backend,
            &self.retry,
            &login.username,
            self.wait_timeout,
            "waiting for the login form",
        )
        .await?;

        backend
            .type_text(&ElementRef::first(&login.username), &credentials.email)
            .await?;
        backend
            .type_text(&ElementRef::first(&login.password), &credentials.password)
            .await?;
        backend.click(&ElementRef::first(&login.submit)).await?;
        backend.wait_for_navigation().await?;

        let url = backend.current_url().await?;
        if let Some(marker) = login
            .failure_markers
            .iter()
            .find(|marker| url.contains(marker.as_str()))
        {
            return Err(InboxError::AuthenticationFailure(format!(
                "still on '{}' after submitting credentials ({})",
                marker, url
            )));
        }

        info!("Authenticated as {}", credentials.email);
        Ok(())
    }
}
