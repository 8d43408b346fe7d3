use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::sleep;

use crate::swagent::notify::{DAILY_REMINDER, STREAK_WARNING};
use crate::swagent::runtime::AgentHandle;

/// Time from `now` until the next occurrence of `hour`:00 UTC. If that is exactly
/// now, the next one is tomorrow's.
pub fn duration_until_hour(now: DateTime<Utc>, hour: u32) -> Result<std::time::Duration> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .with_context(|| format!("{hour} is not an hour of the day"))?
        .and_utc();
    let target = if today > now { today } else { today + ChronoDuration::days(1) };

    (target - now)
        .to_std()
        .context("Reminder target is in the past")
}

/// Which reminder fires next, and how long until it does.
fn next_reminder(
    now: DateTime<Utc>,
    reminder_hour: u32,
    streak_warning_hour: Option<u32>,
) -> Result<(std::time::Duration, &'static str)> {
    let daily = (duration_until_hour(now, reminder_hour)?, DAILY_REMINDER);
    match streak_warning_hour {
        Some(hour) => {
            let warning = (duration_until_hour(now, hour)?, STREAK_WARNING);
            Ok(if warning.0 < daily.0 { warning } else { daily })
        }
        None => Ok(daily),
    }
}

fn payload_for(kind: &str) -> serde_json::Value {
    if kind == STREAK_WARNING {
        serde_json::json!({
            "type": STREAK_WARNING,
            "title": "Your streak is at risk!",
            "body": "You haven't solved today's crossword yet. There's still time.",
            "tag": "streak-warning",
        })
    } else {
        serde_json::json!({ "type": DAILY_REMINDER })
    }
}

/// Pushes the daily reminder (and the streak warning, if configured) through the
/// agent at their UTC hours. Runs until the agent goes away.
pub async fn run_reminders(
    handle: AgentHandle,
    reminder_hour: u32,
    streak_warning_hour: Option<u32>,
) -> Result<()> {
    loop {
        let (wait, kind) = next_reminder(Utc::now(), reminder_hour, streak_warning_hour)?;
        log::info!("[run_reminders] Next {kind} in {} minutes.", wait.as_secs() / 60);
        sleep(wait).await;

        let payload = serde_json::to_vec(&payload_for(kind))?;
        let shown = handle.push(Some(payload)).await?;
        log::info!("[run_reminders] Sent {kind} [{}].", shown.tag);
    }
}
