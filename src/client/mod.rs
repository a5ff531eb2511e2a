mod error;

use std::future::Future;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

pub use error::ApiError;

use crate::drain::{self, DrainObserver, PageSource};
use crate::model::{PageResponse, SingleResponse};

pub const DEFAULT_BASE_URL: &str = "https://reqres.in/api";
pub const DEFAULT_API_KEY: &str = "reqres-free-v1";
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("pagedrain/", env!("CARGO_PKG_VERSION"));

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub user_agent: String,
    /// Requests per second; `0` disables the limiter.
    pub rate: u32,
    /// Extra `Key: Value` header sent with every request.
    pub header: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Some(DEFAULT_API_KEY.to_string()),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate: 0,
            header: None,
        }
    }
}

/// HTTP access to the users API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Option<Arc<Limiter>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(options: &ClientOptions) -> Result<Self, ApiError> {
        let base_url = options.base_url.trim().trim_end_matches('/').to_string();
        match reqwest::Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ApiError::InvalidBaseUrl {
                    url: options.base_url.clone(),
                })
            }
        }

        let headers = build_default_headers(options)?;
        let timeout = Duration::from_secs(options.timeout_seconds.max(1));
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout);

        // Only an explicitly configured proxy is used, never the environment's.
        match options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy).map_err(|e| ApiError::ProxySetup {
                    proxy: proxy.to_string(),
                    source: e,
                })?;
                builder = builder.proxy(proxy);
            }
            None => builder = builder.no_proxy(),
        }

        let http = builder
            .build()
            .map_err(|e| ApiError::ClientBuild { source: e })?;

        let limiter = NonZeroU32::new(options.rate)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));

        Ok(Self {
            http,
            base_url,
            limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    pub fn user_url(&self, id: u64) -> String {
        format!("{}/users/{}", self.base_url, id)
    }

    /// `GET /users?page={page}`.
    pub async fn get_page<R>(&self, page: u32) -> Result<PageResponse<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        let url = self.users_url();
        let request = self.http.get(&url).query(&[("page", page)]);
        let (status, body) = self.send(&url, request).await?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status { url, status });
        }
        decode(&url, &body)
    }

    /// `GET /users/{id}`. A 404 or a body without `data` means the record
    /// does not exist.
    pub async fn try_fetch_one<R>(&self, id: u64) -> Result<Option<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        let url = self.user_url(id);
        let request = self.http.get(&url);
        let (status, body) = self.send(&url, request).await?;
        if status == 404 {
            warn!(id, "user not found");
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            return Err(ApiError::Status { url, status });
        }
        let response: SingleResponse<R> = decode(&url, &body)?;
        if response.data.is_none() {
            warn!(id, "response carried no user data");
        }
        Ok(response.data)
    }

    /// Fetch one record, or `None` on any failure.
    pub async fn fetch_one<R>(&self, id: u64) -> Option<R>
    where
        R: DeserializeOwned,
    {
        match self.try_fetch_one(id).await {
            Ok(record) => record,
            Err(e) => {
                error!(id, error = %e, "error fetching user");
                None
            }
        }
    }

    /// Drain every page of the listing. Empty on any failure.
    pub async fn fetch_all<R>(&self) -> Vec<R>
    where
        R: DeserializeOwned,
    {
        drain::drain(self).await
    }

    pub async fn fetch_all_with_observer<R, O>(&self, observer: &O) -> Vec<R>
    where
        R: DeserializeOwned,
        O: DrainObserver + ?Sized,
    {
        drain::drain_with_observer(self, observer).await
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<(u16, Vec<u8>), ApiError> {
        if let Some(limiter) = self.limiter.as_ref() {
            limiter.until_ready().await;
        }
        debug!(url, "GET");
        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        debug!(url, status, bytes = body.len(), "response");
        Ok((status, body.to_vec()))
    }
}

impl<R> PageSource<R> for ApiClient
where
    R: DeserializeOwned,
{
    type Error = ApiError;

    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<PageResponse<R>, ApiError>> {
        self.get_page(page)
    }
}

fn decode<T>(url: &str, body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        source: e,
    })
}

fn build_default_headers(options: &ClientOptions) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(options.user_agent.trim()).map_err(|_| {
        ApiError::InvalidHeader {
            header: format!("user-agent: {}", options.user_agent),
        }
    })?;
    headers.insert(reqwest::header::USER_AGENT, user_agent);
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
    );

    if let Some(key) = options.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        let (name, value) = header_pair(&options.api_key_header, key)?;
        headers.insert(name, value);
    }

    if let Some(raw) = options.header.as_deref().filter(|h| !h.trim().is_empty()) {
        let (key, value) = crate::utils::split_header(raw).ok_or_else(|| {
            ApiError::InvalidHeader {
                header: raw.to_string(),
            }
        })?;
        let (name, value) = header_pair(key, value)?;
        headers.append(name, value);
    }

    Ok(headers)
}

fn header_pair(key: &str, value: &str) -> Result<(HeaderName, HeaderValue), ApiError> {
    let invalid = || ApiError::InvalidHeader {
        header: format!("{}: {}", key.trim(), value.trim()),
    };
    let name = HeaderName::from_str(key.trim()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((name, value))
}
