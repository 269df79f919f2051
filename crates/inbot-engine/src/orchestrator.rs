//! One full pass over both inbox views.
//!
//! States: `Idle -> SessionAcquired -> Authenticated -> Viewing(Priority) ->
//! Viewing(Other) -> Closed`. A failed login goes straight to `Closed`. Inside a
//! view, conversations are handled strictly one after another and a failing
//! conversation never stops the loop. The session is released exactly once on
//! every path that acquired it.

use crate::backend::Backend;
use crate::composer::ReplyComposer;
use crate::config::SelectorPack;
use crate::discovery::ConversationDiscovery;
use crate::dispatcher::ReplyDispatcher;
use crate::error::InboxError;
use crate::extractor::MessageExtractor;
use crate::generator::ReplyGenerator;
use crate::model::{Conversation, ConversationLocator, InboxView};
use crate::retry::RetryPolicy;
use crate::session::{BackendFactory, Credentials, SessionManager};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SessionAcquired,
    Authenticated,
    Viewing(InboxView),
    Closed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::SessionAcquired => f.write_str("session acquired"),
            Self::Authenticated => f.write_str("authenticated"),
            Self::Viewing(view) => write!(f, "viewing {} inbox", view),
            Self::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoMessages,
    NoReplyInput,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMessages => f.write_str("no messages to answer"),
            Self::NoReplyInput => f.write_str("no reply input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationOutcome {
    Replied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReport {
    pub view: InboxView,
    pub discovered: usize,
    pub replied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub rejected: usize,
    /// Set when the view could not be processed at all.
    pub error: Option<String>,
}

impl ViewReport {
    fn new(view: InboxView) -> Self {
        Self {
            view,
            discovered: 0,
            replied: 0,
            skipped: 0,
            failed: 0,
            rejected: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub views: Vec<ViewReport>,
}

impl RunReport {
    pub fn replied(&self) -> usize {
        self.views.iter().map(|v| v.replied).sum()
    }

    pub fn failed(&self) -> usize {
        self.views.iter().map(|v| v.failed).sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .views
            .iter()
            .map(|v| {
                format!(
                    "{}: {} found, {} replied, {} skipped, {} failed, {} rejected{}",
                    v.view,
                    v.discovered,
                    v.replied,
                    v.skipped,
                    v.failed,
                    v.rejected,
                    v.error
                        .as_ref()
                        .map(|e| format!(" (aborted: {})", e))
                        .unwrap_or_default()
                )
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Tuning knobs of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub headless: bool,
    pub retry: RetryPolicy,
    /// Upper bound for page-level waits (login form, lists).
    pub wait_timeout: Duration,
    /// How long to look for the reply input before skipping a conversation.
    pub input_timeout: Duration,
    pub settle: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            headless: true,
            retry: RetryPolicy::default(),
            wait_timeout: Duration::from_secs(10),
            input_timeout: Duration::from_secs(5),
            settle: Duration::from_secs(1),
        }
    }
}

pub struct RunOrchestrator {
    sessions: SessionManager,
    discovery: ConversationDiscovery,
    extractor: MessageExtractor,
    composer: ReplyComposer,
    dispatcher: ReplyDispatcher,
    generator: Arc<dyn ReplyGenerator>,
    credentials: Credentials,
    settings: RunSettings,
}

impl RunOrchestrator {
    pub fn new(
        factory: BackendFactory,
        selectors: Arc<SelectorPack>,
        credentials: Credentials,
        generator: Arc<dyn ReplyGenerator>,
        composer: ReplyComposer,
        settings: RunSettings,
    ) -> Self {
        Self {
            sessions: SessionManager::new(
                factory,
                selectors.clone(),
                settings.retry,
                settings.wait_timeout,
            ),
            discovery: ConversationDiscovery::new(
                selectors.clone(),
                settings.retry,
                settings.wait_timeout,
            ),
            extractor: MessageExtractor::new(
                selectors.clone(),
                settings.retry,
                settings.wait_timeout,
            ),
            dispatcher: ReplyDispatcher::new(selectors, settings.input_timeout, settings.settle),
            composer,
            generator,
            credentials,
            settings,
        }
    }

    /// Replace the message extractor, e.g. to pin its fallback clock.
    pub fn with_extractor(mut self, extractor: MessageExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub async fn run(&self) -> Result<RunReport, InboxError> {
        let mut state = RunState::Idle;

        let mut session = self.sessions.acquire(self.settings.headless).await?;
        advance(&mut state, RunState::SessionAcquired);

        if let Err(err) = self
            .sessions
            .authenticate(&mut session, &self.credentials)
            .await
        {
            advance(&mut state, RunState::Closed);
            return Err(err);
        }
        advance(&mut state, RunState::Authenticated);

        let mut report = RunReport::default();
        for view in InboxView::ALL {
            advance(&mut state, RunState::Viewing(view));
            let view_report = self.process_view(session.backend_mut(), view).await;
            report.views.push(view_report);
        }

        self.sessions.release(&mut session).await;
        advance(&mut state, RunState::Closed);
        info!("Run finished: {}", report);
        Ok(report)
    }

    async fn process_view<B: Backend + ?Sized>(&self, backend: &mut B, view: InboxView) -> ViewReport {
        let mut report = ViewReport::new(view);

        let outcome = match self.discovery.discover(backend, view).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Cannot process the {} inbox: {}", view, err);
                report.error = Some(err.to_string());
                return report;
            }
        };
        report.discovered = outcome.conversations.len();
        report.rejected = outcome.rejected.len();

        for conversation in &outcome.conversations {
            match self.answer(backend, conversation).await {
                Ok(ConversationOutcome::Replied) => {
                    info!("Replied to {} ({} inbox)", conversation.name, view);
                    report.replied += 1;
                }
                Ok(ConversationOutcome::Skipped(reason)) => {
                    warn!(
                        "Skipped {} ({} inbox): {}",
                        conversation.name, view, reason
                    );
                    report.skipped += 1;
                }
                Err(err) => {
                    error!(
                        "Failed to answer {} ({} inbox): {}",
                        conversation.name, view, err
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Extract, compose, generate and dispatch for one conversation.
    pub async fn answer<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        conversation: &Conversation,
    ) -> Result<ConversationOutcome, InboxError> {
        // A list position only means something on its own view's list.
        if let ConversationLocator::ListItem(_) = conversation.locator {
            self.discovery
                .reopen_list(backend, conversation.view)
                .await?;
        }
        let messages = self.extractor.extract(backend, conversation).await?;
        if messages.is_empty() {
            return Ok(ConversationOutcome::Skipped(SkipReason::NoMessages));
        }

        if !self.dispatcher.ready(backend).await? {
            return Ok(ConversationOutcome::Skipped(SkipReason::NoReplyInput));
        }

        let prompt = self.composer.build_prompt(&messages, &conversation.name);
        let generator = self.generator.as_ref();
        let prompt = prompt.as_str();
        let generated = self
            .settings
            .retry
            .run("reply generation", move || generator.generate(prompt))
            .await?;

        let reply = self.composer.finalize_reply(&generated);
        self.dispatcher.dispatch(backend, &reply).await?;
        Ok(ConversationOutcome::Replied)
    }
}

fn advance(state: &mut RunState, next: RunState) {
    tracing::debug!("Run state: {} -> {}", state, next);
    *state = next;
}
