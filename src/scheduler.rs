//! Runs the import job on a cron schedule.

use std::{str::FromStr, time::Duration};

use chrono::{DateTime, Local, TimeDelta, TimeZone};
use cron::Schedule;

use crate::{
    Error,
    autoimport::ImportRunner,
    healthcheck::{HealthCheck, HealthEvent},
    telegram::TelegramBot,
};

/// How long to wait after startup before the catch-up run.
const CATCH_UP_DELAY: Duration = Duration::from_secs(10);

/// The catch-up run is skipped if the next scheduled run is fewer than this
/// many minutes away.
const CATCH_UP_MIN_LEAD_MINUTES: i64 = 3;

const NEXT_RUN_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Parse a cron expression.
///
/// Standard five field expressions get a leading seconds field of `0`, six
/// and seven field expressions are used as they are.
///
/// # Errors
/// Returns [Error::InvalidCronSchedule] if the expression is not valid.
pub fn parse_schedule(expression: &str) -> Result<Schedule, Error> {
    let expression = expression.trim();
    let full_expression = if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_owned()
    };

    Schedule::from_str(&full_expression)
        .map_err(|error| Error::InvalidCronSchedule(expression.to_owned(), error.to_string()))
}

/// Whether a run should happen shortly after startup, given when the first
/// scheduled run is.
fn should_catch_up<Tz: TimeZone>(next_run: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
    next_run.clone() - now.clone() >= TimeDelta::minutes(CATCH_UP_MIN_LEAD_MINUTES)
}

/// Triggers imports and reports how they went.
#[derive(Debug, Clone)]
pub struct Scheduler {
    schedule: Schedule,
    runner: ImportRunner,
    health_check: Option<HealthCheck>,
    telegram: TelegramBot,
}

impl Scheduler {
    /// Create a scheduler that runs `runner` according to `schedule`.
    pub fn new(
        schedule: Schedule,
        runner: ImportRunner,
        health_check: Option<HealthCheck>,
        telegram: TelegramBot,
    ) -> Self {
        Self {
            schedule,
            runner,
            health_check,
            telegram,
        }
    }

    /// The next time the import is scheduled to run.
    pub fn next_run(&self) -> Option<DateTime<Local>> {
        self.schedule.upcoming(Local).next()
    }

    /// Run the job on schedule until the task is cancelled.
    ///
    /// If the first scheduled run is a while away, the job also runs once
    /// shortly after startup.
    pub async fn run(self) {
        match self.next_run() {
            Some(next_run) if should_catch_up(&next_run, &Local::now()) => {
                tracing::info!(
                    "Next scheduled import is at {}, importing once in {} seconds",
                    next_run.format(NEXT_RUN_FORMAT),
                    CATCH_UP_DELAY.as_secs()
                );
                tokio::time::sleep(CATCH_UP_DELAY).await;
                // Failures are already reported by `run_job`.
                let _ = self.run_job().await;
            }
            Some(_) => {}
            None => {
                tracing::error!("The import schedule has no upcoming runs");
                return;
            }
        }

        while let Some(next_run) = self.next_run() {
            let wait = (next_run - Local::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            let _ = self.run_job().await;
        }

        tracing::warn!("The import schedule has no more upcoming runs");
    }

    /// Run the import once.
    ///
    /// The health check is pinged before and after the run. Failures are
    /// also sent to the Telegram chat.
    ///
    /// # Errors
    /// Returns the error that stopped the import.
    pub async fn run_job(&self) -> Result<(), Error> {
        tracing::info!("Starting import");
        self.ping(HealthEvent::Start).await;

        let result = self.runner.run().await;

        if let Some(next_run) = self.next_run() {
            tracing::info!("Next import at {}", next_run.format(NEXT_RUN_FORMAT));
        }

        match &result {
            Ok(()) => {
                tracing::info!("Import finished");
                self.ping(HealthEvent::Success).await;
            }
            Err(error) => {
                tracing::error!("Import failed: {error}");
                self.ping(HealthEvent::Fail).await;

                if let Err(notify_error) = self.telegram.notify_error(error).await {
                    tracing::error!("Could not send import error to Telegram: {notify_error}");
                }
            }
        }

        result
    }

    async fn ping(&self, event: HealthEvent) {
        if let Some(health_check) = &self.health_check {
            health_check.ping(event).await;
        }
    }
}

#[cfg(test)]
mod parse_schedule_tests {
    use chrono::{Local, TimeZone, Timelike};

    use crate::{Error, scheduler::parse_schedule};

    #[test]
    fn five_fields_run_at_second_zero() {
        let schedule = parse_schedule("30 6 * * *").unwrap();

        let next = schedule.upcoming(Local).next().unwrap();

        assert_eq!((next.hour(), next.minute(), next.second()), (6, 30, 0));
    }

    #[test]
    fn six_fields_are_kept() {
        let schedule = parse_schedule("15 30 6 * * *").unwrap();

        let next = schedule.upcoming(Local).next().unwrap();

        assert_eq!(next.second(), 15);
    }

    #[test]
    fn next_run_follows_previous() {
        let schedule = parse_schedule("0 6 * * *").unwrap();
        let start = Local.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap();

        let next = schedule.after(&start).next().unwrap();

        assert_eq!(next, Local.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap());
    }

    #[test]
    fn invalid_expression_is_an_error() {
        let result = parse_schedule("every morning");

        assert!(
            matches!(result, Err(Error::InvalidCronSchedule(expression, _)) if expression == "every morning")
        );
    }
}

#[cfg(test)]
mod scheduler_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Path, Request, State},
        http::StatusCode,
        routing::post,
    };
    use chrono::{TimeDelta, TimeZone, Utc};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use crate::{
        autoimport::ImportRunner,
        healthcheck::HealthCheck,
        scheduler::{Scheduler, parse_schedule, should_catch_up},
        telegram::{TelegramBot, TelegramClient},
        test_utils::serve,
    };

    type Received = Arc<Mutex<Vec<String>>>;

    async fn fake_health_check() -> (HealthCheck, Received) {
        let received = Received::default();
        let app = Router::new()
            .fallback(|State(received): State<Received>, request: Request| async move {
                received.lock().unwrap().push(request.uri().path().to_owned());
                StatusCode::OK
            })
            .with_state(received.clone());

        let url = format!("{}/check", serve(app).await);
        (HealthCheck::new(&url).unwrap(), received)
    }

    async fn fake_telegram() -> (TelegramBot, Arc<Mutex<Vec<Value>>>) {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let app = Router::new()
            .route(
                "/bottoken/{method}",
                post(
                    |State(received): State<Arc<Mutex<Vec<Value>>>>,
                     Path(_method): Path<String>,
                     Json(body): Json<Value>| async move {
                        received.lock().unwrap().push(body);
                        Json(json!({
                            "ok": true,
                            "result": {"message_id": 1, "chat": {"id": 1}}
                        }))
                    },
                ),
            )
            .with_state(received.clone());

        let api = TelegramClient::new(&serve(app).await, "token").unwrap();
        (TelegramBot::new(api, 1), received)
    }

    async fn fake_importer() -> String {
        let app = Router::new().route("/autoupload", post(|| async { StatusCode::OK }));
        serve(app).await
    }

    #[test]
    fn catches_up_when_next_run_is_far_away() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        assert!(should_catch_up(&(now + TimeDelta::hours(5)), &now));
        assert!(should_catch_up(&(now + TimeDelta::minutes(3)), &now));
        assert!(!should_catch_up(&(now + TimeDelta::minutes(2)), &now));
    }

    #[tokio::test]
    async fn successful_run_pings_start_and_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ing.json"), "{}").unwrap();
        let (health_check, pings) = fake_health_check().await;
        let (telegram, messages) = fake_telegram().await;
        let runner = ImportRunner::new(&fake_importer().await, "secret", dir.path()).unwrap();
        let scheduler = Scheduler::new(
            parse_schedule("0 6 * * *").unwrap(),
            runner,
            Some(health_check),
            telegram,
        );

        scheduler.run_job().await.unwrap();

        assert_eq!(*pings.lock().unwrap(), vec!["/check/start", "/check"]);
        assert!(messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_run_pings_fail_and_notifies() {
        let dir = TempDir::new().unwrap();
        let (health_check, pings) = fake_health_check().await;
        let (telegram, messages) = fake_telegram().await;
        let runner = ImportRunner::new(&fake_importer().await, "secret", dir.path()).unwrap();
        let scheduler = Scheduler::new(
            parse_schedule("0 6 * * *").unwrap(),
            runner,
            Some(health_check),
            telegram,
        );

        let result = scheduler.run_job().await;

        assert!(result.is_err());
        assert_eq!(*pings.lock().unwrap(), vec!["/check/start", "/check/fail"]);
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(
            messages[0]["text"]
                .as_str()
                .unwrap()
                .contains("did not detect any configuration files")
        );
    }

    #[tokio::test]
    async fn runs_without_health_check() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ing.json"), "{}").unwrap();
        let (telegram, _) = fake_telegram().await;
        let runner = ImportRunner::new(&fake_importer().await, "secret", dir.path()).unwrap();
        let scheduler = Scheduler::new(parse_schedule("0 6 * * *").unwrap(), runner, None, telegram);

        assert!(scheduler.run_job().await.is_ok());
        assert!(scheduler.next_run().is_some());
    }
}
