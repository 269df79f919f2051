use crate::backend::{Backend, ElementRef};
use crate::config::SelectorPack;
use crate::error::{BackendError, InboxError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct ReplyDispatcher {
    selectors: Arc<SelectorPack>,
    input_timeout: Duration,
    /// Pause after typing and after sending, for the client-side UI to catch up.
    settle: Duration,
}

impl ReplyDispatcher {
    pub fn new(selectors: Arc<SelectorPack>, input_timeout: Duration, settle: Duration) -> Self {
        Self {
            selectors,
            input_timeout,
            settle,
        }
    }

    /// Whether the open conversation has a reply input. Checked before asking for a
    /// reply so no generation is wasted on conversations that cannot be answered.
    pub async fn ready<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<bool, InboxError> {
        match backend
            .wait_for(&self.selectors.composer.input, self.input_timeout)
            .await
        {
            Ok(()) => Ok(true),
            Err(err) if err.is_missing() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn dispatch<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        reply: &str,
    ) -> Result<(), InboxError> {
        let composer = &self.selectors.composer;
        let input = ElementRef::first(&composer.input);

        backend
            .click(&input)
            .await
            .map_err(|e| dispatch_error("reply input", e))?;
        backend
            .type_text(&input, reply)
            .await
            .map_err(|e| dispatch_error("reply input", e))?;
        tokio::time::sleep(self.settle).await;

        backend
            .click(&ElementRef::first(&composer.send))
            .await
            .map_err(|e| dispatch_error("send control", e))?;
        tokio::time::sleep(self.settle).await;

        // The reply is out; overlay trouble from here on is only logged.
        match backend.exists(&composer.overlay_dismiss).await {
            Ok(true) => {
                debug!("Dismissing confirmation overlay");
                if let Err(e) = backend
                    .click(&ElementRef::first(&composer.overlay_dismiss))
                    .await
                {
                    warn!("Could not dismiss confirmation overlay: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Could not check for a confirmation overlay: {}", e),
        }
        Ok(())
    }
}

fn dispatch_error(control: &str, err: BackendError) -> InboxError {
    InboxError::Dispatch(format!("{}: {}", control, err))
}
