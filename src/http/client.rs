use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;

use super::decode::{charset_of, decode_body};
use super::source::{FetchFailure, FetchOutcome, Page, PageSource};
use crate::config::ScraperSettings;
use crate::rate_limiter::RequestLimiter;
use crate::retry::{RetryPolicy, Step, retry};

/// HTTP client for the results site with retries and a request cap
pub struct VugraphClient {
    client: Client,
    limiter: RequestLimiter,
    retry_policy: RetryPolicy,
}

enum Attempt {
    Page(Page),
    NotFound,
}

impl VugraphClient {
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        let client = Self::build_client(settings.user_agent, settings.timeout_secs)?;

        Ok(Self {
            client,
            limiter: RequestLimiter::new(settings.max_concurrent_requests),
            retry_policy: settings.http_retry,
        })
    }

    fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    // --- HTTP Fetching ---

    async fn fetch_once(&self, url: &str) -> Result<Attempt, FetchFailure> {
        let _permit = self.limiter.acquire().await;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::classify_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Attempt::NotFound);
        }
        Self::check_response_status(&response)?;

        let declared = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_of)
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Body(e.to_string()))?;

        let (body, encoding) = decode_body(&bytes, declared.as_deref());
        let page = Page {
            url: url.to_string(),
            body,
            encoding,
        };

        if page.is_not_found() {
            return Ok(Attempt::NotFound);
        }
        Ok(Attempt::Page(page))
    }

    fn check_response_status(response: &reqwest::Response) -> Result<(), FetchFailure> {
        if !response.status().is_success() {
            return Err(FetchFailure::Status(response.status().as_u16()));
        }
        Ok(())
    }

    fn classify_error(err: reqwest::Error) -> FetchFailure {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else if let Some(status) = err.status() {
            FetchFailure::Status(status.as_u16())
        } else {
            FetchFailure::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl PageSource for VugraphClient {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let outcome = retry(url, &self.retry_policy, |_| async {
            match self.fetch_once(url).await {
                Ok(attempt) => Step::Done(attempt),
                Err(failure) if failure.is_transient() => Step::Retry(failure),
                Err(failure) => Step::Abort(failure),
            }
        })
        .await;

        match outcome {
            Ok((Attempt::Page(page), _)) => FetchOutcome::Page(page),
            Ok((Attempt::NotFound, _)) => {
                debug!("Not found: {}", url);
                FetchOutcome::NotFound
            }
            Err(exhausted) => {
                warn!(
                    "Unavailable after {} attempt(s): {} ({})",
                    exhausted.attempts, url, exhausted.last_error
                );
                FetchOutcome::Unavailable(exhausted.last_error)
            }
        }
    }
}
