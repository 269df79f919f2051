use inbot_engine::error::InboxError;
use inbot_engine::guard::RunGuard;
use inbot_engine::{RunOrchestrator, RunReport};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Http,
    Schedule,
    Cli,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Schedule => f.write_str("schedule"),
            Self::Cli => f.write_str("cli"),
        }
    }
}

/// Starts runs on behalf of the outer surfaces.
pub trait RunTrigger: Send + Sync {
    /// Start one run in the background. Fails with `AlreadyRunning` while another
    /// run holds the guard.
    fn trigger(&self, source: TriggerSource) -> Result<(), InboxError>;
}

pub struct Runner {
    orchestrator: Arc<RunOrchestrator>,
    guard: RunGuard,
}

impl Runner {
    pub fn new(orchestrator: RunOrchestrator) -> Self {
        Self::with_guard(orchestrator, RunGuard::new())
    }

    pub fn with_guard(orchestrator: RunOrchestrator, guard: RunGuard) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            guard,
        }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Run in the foreground and wait for the report.
    pub async fn run_now(&self, source: TriggerSource) -> Result<RunReport, InboxError> {
        let _permit = self.guard.try_acquire().ok_or(InboxError::AlreadyRunning)?;
        info!("Starting run ({})", source);
        self.orchestrator.run().await
    }
}

impl RunTrigger for Runner {
    fn trigger(&self, source: TriggerSource) -> Result<(), InboxError> {
        let permit = self.guard.try_acquire().ok_or(InboxError::AlreadyRunning)?;
        let orchestrator = self.orchestrator.clone();

        info!("Starting run ({})", source);
        tokio::spawn(async move {
            let _permit = permit;
            match orchestrator.run().await {
                Ok(report) => info!("Run ({}) complete: {}", source, report),
                Err(err) => error!("Run ({}) aborted: {}", source, err),
            }
        });
        Ok(())
    }
}
