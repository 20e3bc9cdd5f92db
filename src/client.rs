use std::{sync::Arc, time::Duration};

use crate::{error::Error, models::ApiReply, result::Result};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Client as ReqwestClient, StatusCode,
};
use serde::de::DeserializeOwned;
use tokio::{
    sync::{Semaphore, SemaphorePermit},
    task::JoinHandle,
    time::interval,
};

const PUBLIC_BASE: &str = "https://www.reddit.com";
const OAUTH_BASE: &str = "https://oauth.reddit.com";
const AGENT: &str = "RedrulesClient/0.1";

/// Dispatches rate-limited requests against the Reddit API.
#[derive(Debug)]
pub struct Client {
    http: ReqwestClient,
    base_url: String,
    token: Option<String>,
    limiter: RateLimit,
}

#[derive(Debug)]
pub(crate) struct RateLimit {
    pub(crate) permit: Arc<Semaphore>,
    pub(crate) replenisher: JoinHandle<()>,
}

impl RateLimit {
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.permit.acquire().await.map_err(Into::into)
    }

    fn new() -> RateLimit {
        let permit = Arc::new(Semaphore::new(0));
        let clone = permit.clone();

        let replenisher = tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if clone.available_permits() == 0 {
                    clone.add_permits(1);
                }
            }
        });

        RateLimit {
            permit,
            replenisher,
        }
    }
}

impl Client {
    /// Creates an unauthenticated client against the public API host.
    ///
    /// Read-only endpoints work without a token; the moderation endpoints
    /// reject unauthenticated requests server-side.
    ///
    /// # Panics
    ///
    /// Must be called within a tokio runtime: the rate limiter spawns a
    /// replenisher task.
    pub fn new() -> Client {
        Client {
            http: ReqwestClient::new(),
            base_url: PUBLIC_BASE.to_string(),
            token: None,
            limiter: RateLimit::new(),
        }
    }

    /// Creates a client that sends `token` as an OAuth bearer token
    /// against the OAuth API host.
    ///
    /// # Panics
    ///
    /// Must be called within a tokio runtime: the rate limiter spawns a
    /// replenisher task.
    pub fn with_token(token: &str) -> Client {
        Client {
            http: ReqwestClient::new(),
            base_url: OAUTH_BASE.to_string(),
            token: Some(token.to_string()),
            limiter: RateLimit::new(),
        }
    }

    /// Overrides the API host, e.g. to point at a local test server.
    pub fn with_base_url(mut self, base_url: &str) -> Client {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub(crate) async fn get_json<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let permit = self.limiter.acquire().await?;
        let response = {
            let mut builder = self.http.get(&url).header(USER_AGENT, AGENT);
            if let Some(token) = &self.token {
                builder = builder.header(AUTHORIZATION, format!("bearer {token}"));
            }
            log::info!("request for {} dispatched", url);
            builder.send().await?
        };

        // reduce the permit count
        permit.forget();

        log::debug!("response status: {}", response.status());
        match response.status() {
            StatusCode::OK => response.json::<T>().await.map_err(Into::into),
            code => Err(Error::UnexpectedStatus(code)),
        }
    }

    /// Posts a pre-encoded form body and unwraps the `api_type=json`
    /// reply envelope.
    pub(crate) async fn post_api(&self, path: &str, body: String) -> Result<ApiReply> {
        let url = format!("{}/{path}", self.base_url);
        let permit = self.limiter.acquire().await?;
        let response = {
            let mut builder = self
                .http
                .post(&url)
                .header(USER_AGENT, AGENT)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
            if let Some(token) = &self.token {
                builder = builder.header(AUTHORIZATION, format!("bearer {token}"));
            }
            log::info!("request for {} dispatched", url);
            builder.send().await?
        };

        // reduce the permit count
        permit.forget();

        log::debug!("response status: {}", response.status());
        let reply = match response.status() {
            StatusCode::OK => response.json::<ApiReply>().await?,
            code => return Err(Error::UnexpectedStatus(code)),
        };
        reply.check()
    }
}

impl Drop for RateLimit {
    fn drop(&mut self) {
        self.replenisher.abort();
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
