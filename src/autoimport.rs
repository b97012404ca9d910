//! Uploads import configuration files to the Firefly III Data Importer.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::{
    StatusCode,
    header::ACCEPT,
    multipart::{Form, Part},
};
use serde::Serialize;
use serde_json::{Value, ser::PrettyFormatter};
use time::{Date, OffsetDateTime, macros::format_description};

use crate::Error;

/// The importer route that accepts configuration files.
pub const AUTOUPLOAD: &str = "/autoupload";

/// The name of the multipart field that holds the configuration file.
const CONFIG_FIELD: &str = "json";

/// The configuration key that stops the importer from importing older
/// transactions again.
const DATE_NOT_BEFORE: &str = "date_not_before";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs imports for every configuration file in a folder.
#[derive(Debug, Clone)]
pub struct ImportRunner {
    client: reqwest::Client,
    upload_url: String,
    secret: String,
    config_dir: PathBuf,
}

impl ImportRunner {
    /// Create a runner that uploads the files in `config_dir` to the importer
    /// at `base_url`, e.g. `http://importer:8080`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, secret: &str, config_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            upload_url: format!("{}{AUTOUPLOAD}", base_url.trim_end_matches('/')),
            secret: secret.to_owned(),
            config_dir: config_dir.into(),
        })
    }

    /// Import every configuration file, stopping at the first failure.
    ///
    /// # Errors
    /// Returns [Error::NoImportConfigs] if there is nothing to import, or
    /// [Error::ImportConfig] naming the file that could not be imported.
    pub async fn run(&self) -> Result<(), Error> {
        for path in self.config_paths().await? {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            tracing::info!("Importing {file_name}");
            self.import(&path).await.map_err(|error| Error::ImportConfig {
                file_name,
                source: Box::new(error),
            })?;
        }

        Ok(())
    }

    /// The configuration files in the config folder, sorted by name.
    ///
    /// Every file whose name contains `.json` counts.
    ///
    /// # Errors
    /// Returns an error if the folder cannot be read or contains no
    /// configuration files.
    pub async fn config_paths(&self) -> Result<Vec<PathBuf>, Error> {
        let mut entries = tokio::fs::read_dir(&self.config_dir).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }

            if entry.file_name().to_string_lossy().contains(".json") {
                paths.push(entry.path());
            }
        }

        if paths.is_empty() {
            return Err(Error::NoImportConfigs(self.config_dir.clone()));
        }

        paths.sort();
        Ok(paths)
    }

    /// Upload one configuration file and, once the importer accepted it,
    /// move its start date to yesterday.
    ///
    /// # Errors
    /// Returns [Error::ImportRejected] with the importer's response if it did
    /// not answer with 200 OK, or an error if the file cannot be read or
    /// written.
    pub async fn import(&self, path: &Path) -> Result<(), Error> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let form = Form::new().part(
            CONFIG_FIELD,
            Part::bytes(contents)
                .file_name(file_name)
                .mime_str("application/json")?,
        );

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("secret", &self.secret)])
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error occurred".to_owned());
            return Err(Error::ImportRejected(body));
        }

        update_date_not_before(path, yesterday()).await
    }
}

fn yesterday() -> Date {
    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();

    today.previous_day().unwrap_or(today)
}

/// Set `date_not_before` in the configuration file at `path` to `date`.
///
/// All other keys are kept. The file is written with four space indentation.
async fn update_date_not_before(path: &Path, date: Date) -> Result<(), Error> {
    let contents = tokio::fs::read(path).await?;
    let mut config: Value = serde_json::from_slice(&contents)?;

    let Some(object) = config.as_object_mut() else {
        return Err(Error::InvalidConfig(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };

    let date = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|error| Error::InvalidConfig(error.to_string()))?;
    object.insert(DATE_NOT_BEFORE.to_owned(), Value::String(date));

    let mut output = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut output, PrettyFormatter::with_indent(b"    "));
    config.serialize(&mut serializer)?;

    tokio::fs::write(path, output).await?;
    Ok(())
}
