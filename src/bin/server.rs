use std::{net::SocketAddr, process::ExitCode, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use firefly_fix_rs::{
    AppState, Config, Error, FireflyClient, HealthCheck, ImportRunner, RuleEngine, Scheduler,
    TELEGRAM_API_URL, TelegramBot, TelegramClient, WebhookAttributes, build_router,
    graceful_shutdown, parse_schedule,
};

/// How long to wait for the server to start before checking the webhook URL.
const WEBHOOK_CHECK_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let config = Config::parse();
    tracing::info!("Running version {}", env!("CARGO_PKG_VERSION"));

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), Error> {
    let schedule = parse_schedule(&config.cron_schedule)?;
    let rule_engine = RuleEngine::with_default_rules()?;
    let firefly = FireflyClient::new(config.firefly_url(), &config.firefly_token)?;
    let telegram = TelegramBot::new(
        TelegramClient::new(TELEGRAM_API_URL, &config.telegram_token)?,
        config.telegram_chat_id,
    );
    let runner = ImportRunner::new(
        &config.autoimporter_base_url(),
        &config.autoimporter_secret,
        &config.config_dir,
    )?;
    let health_check = config.healthchecks_url().map(HealthCheck::new).transpose()?;

    let webhook_url = config.webhook_url();
    tracing::info!("Ensuring webhook exists...");
    let url = firefly
        .ensure_webhook(&WebhookAttributes::store_transaction(&webhook_url))
        .await?;
    tracing::info!("Webhook ready at {url}");

    tokio::spawn(telegram.clone().listen(firefly.clone()));
    tokio::spawn(Scheduler::new(schedule, runner, health_check, telegram.clone()).run());

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));
    tokio::spawn(check_webhook_url(webhook_url));

    let router = add_tracing_layer(build_router(AppState::new(rule_engine, firefly, telegram)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening for webhooks on {addr}");
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

/// Check that the public webhook URL reaches this server.
async fn check_webhook_url(url: String) {
    tokio::time::sleep(WEBHOOK_CHECK_DELAY).await;

    match reqwest::get(&url).await {
        Ok(response) if response.status().is_success() => {
            tracing::info!("Webhook URL {url} is reachable");
        }
        Ok(response) => tracing::error!(
            "Webhook URL {url} answered with status {}, Firefly III will not be able to deliver new transactions",
            response.status()
        ),
        Err(error) => tracing::error!("Could not reach webhook URL {url}: {error}"),
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_log = tracing_subscriber::fmt::layer().pretty().with_filter(filter);

    tracing_subscriber::registry().with(stdout_log).init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are handled.
        .on_failure(());

    router.layer(tracing_layer)
}
