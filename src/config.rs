//! Command line and environment configuration for the server.

use std::path::PathBuf;

use clap::Parser;

use crate::endpoints;

/// Fixes transaction descriptions in Firefly III, announces new transactions
/// on Telegram and triggers the Firefly III Data Importer on a schedule.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The URL of the Firefly III instance, e.g. `https://firefly.example.com`.
    #[arg(long, env = "FIREFLY_HTTPS_URL")]
    pub firefly_url: String,

    /// A personal access token for the Firefly III API.
    #[arg(long, env = "FIREFLY_ACCESS_TOKEN", hide_env_values = true)]
    pub firefly_token: String,

    /// The public URL Firefly III should send new transactions to.
    ///
    /// Defaults to the webhook route on the Firefly III host.
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// The port to serve the webhook from.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// The URL of the Firefly III Data Importer, without the port.
    #[arg(long, env = "AUTOIMPORTER_URL")]
    pub autoimporter_url: String,

    /// The port of the Firefly III Data Importer.
    #[arg(long, env = "AUTOIMPORTER_PORT")]
    pub autoimporter_port: u16,

    /// The secret that authorizes uploads to the Firefly III Data Importer.
    #[arg(long, env = "AUTOIMPORTER_SECRET", hide_env_values = true)]
    pub autoimporter_secret: String,

    /// When to run the import, as a cron expression with five to seven fields.
    #[arg(long, env = "AUTOIMPORTER_CRON_SCHEDULE")]
    pub cron_schedule: String,

    /// The folder with the import configuration files.
    #[arg(long, env = "AUTOIMPORTER_CONFIG_DIR", default_value = "/configs")]
    pub config_dir: PathBuf,

    /// The token of the Telegram bot.
    #[arg(long, env = "TELEGRAM_ACCESS_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// The chat the bot sends notifications to.
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_negative_numbers = true)]
    pub telegram_chat_id: i64,

    /// A healthchecks.io style URL that is pinged when an import starts,
    /// succeeds or fails.
    #[arg(long, env = "HEALTHCHECKS_URL")]
    pub healthchecks_url: Option<String>,
}

impl Config {
    /// The Firefly III URL without a trailing slash.
    pub fn firefly_url(&self) -> &str {
        self.firefly_url.trim_end_matches('/')
    }

    /// The URL Firefly III should send new transactions to.
    pub fn webhook_url(&self) -> String {
        match &self.webhook_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("{}{}", self.firefly_url(), endpoints::WEBHOOK),
        }
    }

    /// The base URL of the Firefly III Data Importer, including the port.
    pub fn autoimporter_base_url(&self) -> String {
        format!(
            "{}:{}",
            self.autoimporter_url.trim_end_matches('/'),
            self.autoimporter_port
        )
    }

    /// The health check URL, if one was configured.
    pub fn healthchecks_url(&self) -> Option<&str> {
        self.healthchecks_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod config_tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::Config;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "server",
            "--firefly-url",
            "https://firefly.example.com/",
            "--firefly-token",
            "token",
            "--autoimporter-url",
            "http://importer",
            "--autoimporter-port",
            "8081",
            "--autoimporter-secret",
            "secret",
            "--cron-schedule",
            "0 6 * * *",
            "--telegram-token",
            "bot-token",
            "--telegram-chat-id",
            "-1001234",
        ];
        args.extend_from_slice(extra);

        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn applies_defaults() {
        let config = parse(&[]);

        assert_eq!(config.config_dir, PathBuf::from("/configs"));
        assert_eq!(config.telegram_chat_id, -1001234);
        assert_eq!(config.healthchecks_url(), None);
    }

    #[test]
    fn webhook_url_defaults_to_firefly_host() {
        let config = parse(&[]);

        assert_eq!(config.firefly_url(), "https://firefly.example.com");
        assert_eq!(
            config.webhook_url(),
            "https://firefly.example.com/wh_fix_ing"
        );
    }

    #[test]
    fn webhook_url_can_be_overridden() {
        let config = parse(&["--webhook-url", "https://hooks.example.com/wh_fix_ing"]);

        assert_eq!(config.webhook_url(), "https://hooks.example.com/wh_fix_ing");
    }

    #[test]
    fn autoimporter_url_includes_port() {
        let config = parse(&[]);

        assert_eq!(config.autoimporter_base_url(), "http://importer:8081");
    }

    #[test]
    fn healthchecks_url_without_trailing_slash() {
        let config = parse(&["--healthchecks-url", "https://hc-ping.com/abc/"]);

        assert_eq!(config.healthchecks_url(), Some("https://hc-ping.com/abc"));
    }

    #[test]
    fn missing_required_option_is_an_error() {
        assert!(Config::try_parse_from(["server", "--port", "80"]).is_err());
    }
}
