//! HTTP client shared by the resolve and submit calls.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting so a misbehaving caller cannot flood the server
//! * Consistent connect timeout, keep-alive and `User-Agent`
//! * JSON request/response exchange with status checking
//!
//! The underlying connection pool is shared read-only infrastructure: one
//! `Client` serves every request of a session. Progress subscriptions do not
//! go through this client; each opens its own websocket connection.
//!
//! # Example
//!
//! ```no_run
//! use sharelink::{
//!     config::Config,
//!     http::Client,
//!     protocol::resolve::{Request, TrackRecord},
//! };
//!
//! # async fn example() -> sharelink::error::Result<()> {
//! let config = Config::default();
//! let client = Client::new(&config)?;
//!
//! let request = Request { link: "https://youtu.be/abc123" };
//! let tracks: Vec<TrackRecord> = client
//!     .post_json(config.resolve_url.clone(), &request, config.resolve_timeout, "resolve")
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::{fmt::Debug, future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT},
    Body, Method, Url,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    protocol,
};

/// HTTP client with built-in rate limiting.
pub struct Client {
    /// Direct access to underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    rate_limiter: DefaultDirectRateLimiter,
}

impl Client {
    /// Interval over which the request quota replenishes.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum requests per interval. A session makes two, so this only
    /// kicks in for runaway callers.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 10;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    const JSON_CONTENT: &'static str = "application/json; charset=utf-8";

    /// Creates a new client.
    ///
    /// Request timeouts are set per request, because resolving may take
    /// minutes while submitting should not.
    ///
    /// # Errors
    ///
    /// Returns error if the user agent is not a valid header value, or the
    /// HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);

        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .default_headers(headers);

        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(quota),
        })
    }

    /// Builds a request with specified method, URL and body.
    pub fn request<U, T>(&self, method: Method, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        let body_mut = request.body_mut();
        *body_mut = Some(body.into());

        request
    }

    /// Builds a POST request.
    pub fn post<U, T>(&self, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        self.request(Method::POST, url, body)
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if the request could not be sent or no response was
    /// received in time.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }

    /// POSTs `body` as JSON and parses the JSON response.
    ///
    /// # Arguments
    ///
    /// * `url` - Endpoint to post to
    /// * `body` - Request payload
    /// * `timeout` - Deadline for the entire exchange
    /// * `origin` - Description of the endpoint for logging
    ///
    /// # Errors
    ///
    /// * `Network` - connection, timeout or I/O failure
    /// * `Server` - non-success status, carrying the status line
    /// * `InvalidResponse` - the body is not the expected JSON
    pub async fn post_json<B, T>(
        &self,
        url: Url,
        body: &B,
        timeout: Duration,
        origin: &str,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de> + Debug,
    {
        let body = serde_json::to_string(body).map_err(Error::internal)?;
        trace!("{origin}: {body}");

        let mut request = self.post(url, body);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(Self::JSON_CONTENT));
        *request.timeout_mut() = Some(timeout);

        debug!("{origin}: {} {}", request.method(), request.url());
        let response = self.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::server(status.to_string()));
        }

        let text = response.text().await?;
        protocol::json(&text, origin)
    }
}
