use anyhow::Result;
use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone};
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{error, info};

const EXPORT_POLL: Duration = Duration::from_secs(30);

/// Exports the daily report once per day at the time returned by `export_time`.
/// The time is re-read every poll, so `config set report_time` applies without a restart.
/// Each run exports the date of the slot it was scheduled for.
pub async fn run_daily_export_loop<S, F, Fut>(mut export_time: S, mut export: F) -> Result<()>
where
    S: FnMut() -> Result<NaiveTime>,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut announced = None;
    let mut last_exported = None;

    loop {
        let time = match export_time() {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, "failed to read report_time");
                sleep(EXPORT_POLL).await;
                continue;
            }
        };

        let now = Local::now();
        let Some(next) = next_export_at(now, time) else {
            error!(time = %time, "no valid local time for the next export");
            sleep(EXPORT_POLL).await;
            continue;
        };

        if announced != Some(next) {
            info!(at = %next.format("%Y-%m-%d %H:%M"), "next daily report export");
            announced = Some(next);
        }

        let wait = (next - now).to_std().unwrap_or_default();
        if wait > EXPORT_POLL {
            sleep(EXPORT_POLL).await;
            continue;
        }
        sleep(wait).await;

        let date = next.date_naive();
        if last_exported == Some(date) {
            continue;
        }

        match export(date).await {
            Ok(()) => info!(date = %date, "daily report exported"),
            Err(error) => error!(error = %error, date = %date, "daily report export failed"),
        }
        last_exported = Some(date);
    }
}

/// First instant strictly after `now` whose local wall clock reads `time`.
/// A day where `time` falls in a DST gap is skipped.
pub fn next_export_at(now: DateTime<Local>, time: NaiveTime) -> Option<DateTime<Local>> {
    (0..=2).find_map(|offset| {
        let day = now.date_naive().checked_add_days(Days::new(offset))?;
        Local
            .from_local_datetime(&day.and_time(time))
            .earliest()
            .filter(|candidate| *candidate > now)
    })
}
