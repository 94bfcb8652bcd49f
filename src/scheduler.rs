//! In-process daily scheduler
//!
//! Runs the forecast append job and the alert sweep once per day at a
//! configured UTC hour. A lightweight alternative to an external cron:
//! the loop sleeps until the next run time, executes both jobs, and
//! repeats.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::AppState;

/// Duration until the next run at `hour_utc:00` from `now`.
///
/// If today's run time has already passed, targets tomorrow.
pub fn next_run_delay(now: DateTime<Utc>, hour_utc: u32) -> std::time::Duration {
    let today_target = Utc
        .with_ymd_and_hms(
            now.date_naive().year(),
            now.date_naive().month(),
            now.date_naive().day(),
            hour_utc,
            0,
            0,
        )
        .single()
        .unwrap_or(now);

    let target = if today_target > now {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };

    (target - now).to_std().unwrap_or_default()
}

/// Spawn the daily job loop as a background task
pub fn spawn(state: AppState) {
    tokio::spawn(run_loop(state));
}

async fn run_loop(state: AppState) {
    let hour = state.config.jobs.daily_hour_utc;
    tracing::info!(hour_utc = hour, "daily scheduler started");

    loop {
        let delay = next_run_delay(Utc::now(), hour);
        tracing::info!(seconds = delay.as_secs(), "next scheduled run");
        tokio::time::sleep(delay).await;

        match state.collection_service().run_daily_append().await {
            Ok(summary) => {
                tracing::info!(
                    success = summary.success,
                    skipped = summary.skipped,
                    errors = summary.errors,
                    "daily append finished"
                );
            }
            Err(e) => tracing::error!("daily append failed: {}", e),
        }

        match state.evaluation_service().run_sweep().await {
            Ok(summary) => {
                tracing::info!(
                    evaluated = summary.evaluated,
                    matched = summary.matched,
                    emails_sent = summary.emails_sent,
                    "alert sweep finished"
                );
            }
            Err(e) => tracing::error!("alert sweep failed: {}", e),
        }
    }
}
