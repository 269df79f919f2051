mod runner;
mod scheduler;
mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inbot_engine::backend::Backend;
use inbot_engine::composer::ReplyComposer;
use inbot_engine::config::{AppConfig, ConfigLoader};
use inbot_engine::generator::OpenAiGenerator;
use inbot_engine::session::BackendFactory;
use inbot_engine::{RunOrchestrator, RunSettings};
use inbot_h::HeadlessBackend;
use runner::{RunTrigger, Runner, TriggerSource};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "inbot",
    version,
    about = "Answers unread LinkedIn conversations with generated replies"
)]
struct Args {
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve the HTTP trigger and run on the CRON schedule (default)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Perform a single run in the foreground
    Run {
        /// Launch the browser in visible mode (overrides HEADLESS)
        #[arg(long)]
        visible: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    match args.mode.unwrap_or(Mode::Serve { port: None }) {
        Mode::Serve { port } => {
            let runner = Arc::new(Runner::new(build_orchestrator(&config, config.headless).await?));
            let trigger: Arc<dyn RunTrigger> = runner.clone();

            if let Some(expression) = &config.cron {
                let schedule = scheduler::parse_schedule(expression)
                    .with_context(|| format!("Invalid CRON expression {:?}", expression))?;
                info!("Scheduled runs: {}", expression);
                scheduler::spawn_cron(schedule, trigger.clone());
            }

            server::serve(port.unwrap_or(config.port), trigger, shutdown_signal()).await?;
            if runner.is_running() {
                warn!("Shutting down with a run in progress; it will be abandoned");
            }
        }
        Mode::Run { visible } => {
            let headless = config.headless && !visible;
            let runner = Runner::new(build_orchestrator(&config, headless).await?);
            let report = runner.run_now(TriggerSource::Cli).await?;
            println!("{}", report);
        }
    }
    Ok(())
}

async fn build_orchestrator(config: &AppConfig, headless: bool) -> anyhow::Result<RunOrchestrator> {
    let selectors = ConfigLoader::load_default(config.selectors_path.as_deref())
        .await
        .context("Failed to load selector pack")?;
    let generator = OpenAiGenerator::new(config.completion.clone())?;
    let factory: BackendFactory =
        Arc::new(|| Box::new(HeadlessBackend::new()) as Box<dyn Backend>);

    Ok(RunOrchestrator::new(
        factory,
        Arc::new(selectors),
        config.credentials.clone(),
        Arc::new(generator),
        ReplyComposer::new(config.repository_url.clone()),
        RunSettings {
            headless,
            retry: config.retry,
            ..RunSettings::default()
        },
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
