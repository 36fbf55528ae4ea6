//! Embedding provider client with exponential backoff retry logic.
//!
//! The scorer's relevance factor wants a semantic embedding for each topic
//! and each item. This module provides the client side of that contract:
//!
//! - [`EmbedAsync`]: core trait for async text-to-vector lookup
//! - [`HttpEmbedder`]: OpenAI-compatible `/embeddings` HTTP client
//! - [`RetryEmbed`]: decorator adding retry logic to any [`EmbedAsync`]
//! - [`NoEmbedder`]: placeholder for keyword-only runs
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Failures here are never fatal: the scorer degrades the affected item to a
//! default relevance and moves on.

use rand::{rng, Rng};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{instrument, warn};

/// Trait for async embedding lookup.
///
/// Implementors turn a text into a vector. The decorator pattern lets retry
/// policy wrap any implementation, and tests substitute deterministic mocks.
pub trait EmbedAsync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Any transport, authentication, or decoding failure. Callers treat an
    /// error as "no embedding for this text," never as a batch failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>>;
}

/// Placeholder provider used when no embedding backend is configured.
///
/// Always fails, which routes the scorer onto its keyword fallback.
#[derive(Debug)]
pub struct NoEmbedder;

impl EmbedAsync for NoEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        Err("embedding provider not configured".into())
    }
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpEmbedder {
    /// Build a new embeddings client.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1`); the
    /// `/embeddings` path is appended here.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        if api_key.trim().is_empty() {
            return Err("missing embedding API key".into());
        }
        if model.trim().is_empty() {
            return Err("missing embedding model name".into());
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| "embedding API key is not a valid header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

impl fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl EmbedAsync for HttpEmbedder {
    #[instrument(level = "debug", skip_all)]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or("embedding response contained no vectors")?;

        Ok(vector)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Decorator adding exponential backoff retry logic to any [`EmbedAsync`]
/// implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryEmbed<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryEmbed<T>
where
    T: EmbedAsync,
{
    /// Wrap an existing provider with retry policy.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryEmbed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryEmbed")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> EmbedAsync for RetryEmbed<T>
where
    T: EmbedAsync,
{
    #[instrument(level = "debug", skip_all)]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %e,
                            "embed() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "embed() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyEmbedder {
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    impl EmbedAsync for FlakyEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err("transient".into())
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let flaky = FlakyEmbedder {
            failures_before_success: 2,
            calls: AtomicUsize::new(0),
        };
        let retrying = RetryEmbed::new(flaky, 3, Duration::from_millis(1));

        let vector = retrying.embed("text").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let flaky = FlakyEmbedder {
            failures_before_success: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let retrying = RetryEmbed::new(flaky, 2, Duration::from_millis(1));

        assert!(retrying.embed("text").await.is_err());
        // Initial attempt plus two retries.
        assert_eq!(retrying.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_embedder_always_fails() {
        assert!(NoEmbedder.embed("anything").await.is_err());
    }

    #[test]
    fn test_http_embedder_requires_key_and_model() {
        assert!(HttpEmbedder::new("", "https://api.openai.com/v1", "m", Duration::from_secs(1))
            .is_err());
        assert!(HttpEmbedder::new("k", "https://api.openai.com/v1", "", Duration::from_secs(1))
            .is_err());
    }
}
