//! Pings a healthchecks.io style monitoring endpoint.

use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The stage of a job that is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthEvent {
    /// The job started.
    Start,
    /// The job finished successfully.
    Success,
    /// The job failed.
    Fail,
}

impl HealthEvent {
    fn suffix(self) -> &'static str {
        match self {
            HealthEvent::Start => "/start",
            HealthEvent::Success => "",
            HealthEvent::Fail => "/fail",
        }
    }
}

/// Reports job runs to a monitoring URL.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    client: reqwest::Client,
    url: String,
}

impl HealthCheck {
    /// Create a health check that pings `url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self, crate::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_owned(),
        })
    }

    /// The URL that is pinged for `event`.
    pub fn url_for(&self, event: HealthEvent) -> String {
        format!("{}{}", self.url, event.suffix())
    }

    /// Report `event`. Failures are logged and otherwise ignored.
    pub async fn ping(&self, event: HealthEvent) {
        let url = self.url_for(event);

        match self.client.head(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Sent {event:?} health ping");
            }
            Ok(response) => {
                tracing::warn!(
                    "Health ping {event:?} answered with status {}",
                    response.status()
                );
            }
            Err(error) => tracing::warn!("Could not send {event:?} health ping: {error}"),
        }
    }
}

#[cfg(test)]
mod health_check_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, extract::Request, extract::State, http::StatusCode};

    use crate::{
        healthcheck::{HealthCheck, HealthEvent},
        test_utils::serve,
    };

    #[test]
    fn urls_for_events() {
        let health_check = HealthCheck::new("https://hc-ping.com/abc/").unwrap();

        assert_eq!(
            health_check.url_for(HealthEvent::Start),
            "https://hc-ping.com/abc/start"
        );
        assert_eq!(
            health_check.url_for(HealthEvent::Success),
            "https://hc-ping.com/abc"
        );
        assert_eq!(
            health_check.url_for(HealthEvent::Fail),
            "https://hc-ping.com/abc/fail"
        );
    }

    #[tokio::test]
    async fn pings_with_head_requests() {
        let received: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
        let app = Router::new()
            .fallback(
                |State(received): State<Arc<Mutex<Vec<(String, String)>>>>,
                 request: Request| async move {
                    received
                        .lock()
                        .unwrap()
                        .push((request.method().to_string(), request.uri().path().to_owned()));
                    StatusCode::OK
                },
            )
            .with_state(received.clone());
        let health_check = HealthCheck::new(&format!("{}/abc", serve(app).await)).unwrap();

        health_check.ping(HealthEvent::Start).await;
        health_check.ping(HealthEvent::Fail).await;

        assert_eq!(
            *received.lock().unwrap(),
            vec![
                ("HEAD".to_owned(), "/abc/start".to_owned()),
                ("HEAD".to_owned(), "/abc/fail".to_owned())
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_not_fatal() {
        let health_check = HealthCheck::new("http://127.0.0.1:1").unwrap();

        health_check.ping(HealthEvent::Success).await;
    }
}
