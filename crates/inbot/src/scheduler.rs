use crate::runner::{RunTrigger, TriggerSource};
use chrono::Local;
use cron::Schedule;
use inbot_engine::error::InboxError;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Accept classic five-field expressions by prepending a seconds field.
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_schedule(expression: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalize_cron(expression))
}

/// Trigger one run per schedule tick. Ticks that land while a run is active are
/// skipped.
pub fn spawn_cron(schedule: Schedule, trigger: Arc<dyn RunTrigger>) -> JoinHandle<()> {
    tokio::spawn(async move {
        for next in schedule.upcoming(Local) {
            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            info!("Running scheduled run ({})", next.format("%Y-%m-%d %H:%M:%S"));
            match trigger.trigger(TriggerSource::Schedule) {
                Ok(()) => {}
                Err(InboxError::AlreadyRunning) => {
                    warn!("Skipping scheduled run: previous run still in progress")
                }
                Err(err) => error!("Scheduled run failed to start: {}", err),
            }
        }
        warn!("Schedule has no upcoming runs");
    })
}
