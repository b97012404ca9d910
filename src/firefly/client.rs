use std::time::Duration;

use reqwest::{
    Method, RequestBuilder,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::de::DeserializeOwned;

use crate::{
    Error,
    firefly::models::{
        ApiResponse, Category, CategoryRead, Transaction, TransactionId, TransactionRead,
        TransactionUpdate, WebhookAttributes, WebhookRead,
    },
    rewrite::TransactionSplitUpdate,
};

/// The route for listing, creating and updating webhooks.
pub const WEBHOOKS_API: &str = "/api/v1/webhooks";
/// The route for reading and updating transactions.
pub const TRANSACTIONS_API: &str = "/api/v1/transactions";
/// The route for listing categories.
pub const CATEGORIES_API: &str = "/api/v1/categories";
/// The web page showing a single transaction.
pub const TRANSACTION_VIEW: &str = "/transactions/show";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What needs to happen to get the webhook into the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookStatus {
    /// No webhook with the title exists.
    Missing,
    /// A webhook exists but has different settings.
    Stale(WebhookRead),
    /// The webhook exists and is up to date.
    Current(WebhookRead),
}

impl WebhookStatus {
    /// Compare the webhook found in Firefly III, if any, against `target`.
    pub fn of(existing: Option<WebhookRead>, target: &WebhookAttributes) -> Self {
        match existing {
            None => Self::Missing,
            Some(webhook) if webhook.attributes.matches(target) => Self::Current(webhook),
            Some(webhook) => Self::Stale(webhook),
        }
    }
}

/// A client for the Firefly III REST API.
#[derive(Debug, Clone)]
pub struct FireflyClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl FireflyClient {
    /// Create a client for the Firefly III instance at `base_url`.
    ///
    /// A trailing slash in `base_url` is removed.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token: access_token.to_owned(),
        })
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The link to the web page of a transaction.
    pub fn transaction_url(&self, transaction_id: TransactionId) -> String {
        format!("{}{TRANSACTION_VIEW}/{transaction_id}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus { status, body });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Find the webhook titled like `target` and create or update it so that
    /// it matches `target`.
    ///
    /// Returns the URL the webhook delivers to.
    ///
    /// # Errors
    /// Returns an error if a request fails or Firefly III does not return the
    /// created or updated webhook.
    pub async fn ensure_webhook(&self, target: &WebhookAttributes) -> Result<String, Error> {
        let existing = self.find_webhook(&target.title).await?;

        let request = match WebhookStatus::of(existing, target) {
            WebhookStatus::Current(webhook) => {
                tracing::info!("Webhook #{} is up to date", webhook.id);
                return Ok(webhook.attributes.url);
            }
            WebhookStatus::Missing => {
                tracing::info!("Creating webhook \"{}\"", target.title);
                self.request(Method::POST, WEBHOOKS_API)
            }
            WebhookStatus::Stale(webhook) => {
                tracing::info!("Updating webhook #{}", webhook.id);
                self.request(Method::PUT, &format!("{WEBHOOKS_API}/{}", webhook.id))
            }
        };

        let response: ApiResponse<WebhookRead> = self.send(request.json(target)).await?;

        if response.data.attributes.title.is_empty() {
            return Err(Error::WebhookRegistration);
        }

        Ok(response.data.attributes.url)
    }

    /// Find a webhook by its title.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn find_webhook(&self, title: &str) -> Result<Option<WebhookRead>, Error> {
        let response: ApiResponse<Vec<WebhookRead>> =
            self.send(self.request(Method::GET, WEBHOOKS_API)).await?;

        Ok(response
            .data
            .into_iter()
            .find(|webhook| webhook.attributes.title == title))
    }

    /// Fetch a transaction.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get_transaction(&self, transaction_id: TransactionId) -> Result<Transaction, Error> {
        let response: ApiResponse<TransactionRead> = self
            .send(self.request(Method::GET, &format!("{TRANSACTIONS_API}/{transaction_id}")))
            .await?;

        Ok(response.data.into())
    }

    /// Apply the rewritten splits to a transaction.
    ///
    /// Returns the transaction as stored after the update.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn update_transaction(
        &self,
        transaction_id: TransactionId,
        splits: Vec<TransactionSplitUpdate>,
    ) -> Result<Transaction, Error> {
        tracing::info!("Communicating with Firefly III...");
        let body = TransactionUpdate::from_splits(splits);

        let response: ApiResponse<TransactionRead> = self
            .send(
                self.request(Method::PUT, &format!("{TRANSACTIONS_API}/{transaction_id}"))
                    .json(&body),
            )
            .await?;

        Ok(response.data.into())
    }

    /// Set the category of every split of a transaction.
    ///
    /// Returns the transaction as stored after the update.
    ///
    /// # Errors
    /// Returns an error if one of the requests fails.
    pub async fn set_transaction_category(
        &self,
        transaction_id: TransactionId,
        category_id: &str,
    ) -> Result<Transaction, Error> {
        let transaction = self.get_transaction(transaction_id).await?;
        let body = TransactionUpdate::set_category(&transaction, category_id);

        let response: ApiResponse<TransactionRead> = self
            .send(
                self.request(Method::PUT, &format!("{TRANSACTIONS_API}/{transaction_id}"))
                    .json(&body),
            )
            .await?;

        Ok(response.data.into())
    }

    /// List all categories, following pagination.
    ///
    /// # Errors
    /// Returns an error if one of the requests fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, Error> {
        let mut categories = Vec::new();
        let mut page = 1;

        loop {
            let response: ApiResponse<Vec<CategoryRead>> = self
                .send(
                    self.request(Method::GET, CATEGORIES_API)
                        .query(&[("page", page)]),
                )
                .await?;

            categories.extend(response.data.into_iter().map(Category::from));

            let pagination = response.meta.and_then(|meta| meta.pagination);
            match pagination {
                Some(pagination) if page < pagination.total_pages => page += 1,
                _ => break,
            }
        }

        Ok(categories)
    }
}
