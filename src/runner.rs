use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use crate::client::{ApiClient, ApiError, ClientOptions};
use crate::drain::{DrainObserver, NoopObserver};
use crate::model::User;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Drain every page of the listing.
    List,
    /// Drain every page, meant for the tabular view.
    Table,
    /// Fetch a single user by id.
    User(u64),
}

impl Mode {
    pub fn drains(self) -> bool {
        matches!(self, Self::List | Self::Table)
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    pub client: ClientOptions,
    pub mode: Mode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            client: ClientOptions::default(),
            mode: Mode::List,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    #[error(transparent)]
    Client(#[from] ApiError),
}

#[derive(Clone, Debug)]
pub struct FetchResult {
    pub mode: Mode,
    pub users: Vec<User>,
    pub elapsed: Duration,
}

impl FetchResult {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// The fetched user in [`Mode::User`].
    pub fn user(&self) -> Option<&User> {
        match self.mode {
            Mode::User(_) => self.users.first(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
    client: ApiClient,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.client.base_url.trim().is_empty() {
            return Err(RunnerError::InvalidOptions {
                message: "base URL is empty".to_string(),
            });
        }
        if options.client.api_key_header.trim().is_empty() {
            return Err(RunnerError::InvalidOptions {
                message: "API key header name is empty".to_string(),
            });
        }
        if let Mode::User(0) = options.mode {
            return Err(RunnerError::InvalidOptions {
                message: "user id must be at least 1".to_string(),
            });
        }
        let client = ApiClient::new(&options.client)?;
        Ok(Self { options, client })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn run(&self) -> FetchResult {
        self.run_with_observer(&NoopObserver).await
    }

    /// Fetch failures never surface here; they come back as an empty result.
    pub async fn run_with_observer<O>(&self, observer: &O) -> FetchResult
    where
        O: DrainObserver + ?Sized,
    {
        let started_at = Instant::now();
        let users: Vec<User> = match self.options.mode {
            Mode::List | Mode::Table => self.client.fetch_all_with_observer(observer).await,
            Mode::User(id) => self.client.fetch_one(id).await.into_iter().collect(),
        };
        let elapsed = started_at.elapsed();
        info!(
            users = users.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "fetch finished"
        );
        FetchResult {
            mode: self.options.mode,
            users,
            elapsed,
        }
    }
}
