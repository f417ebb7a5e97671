//! Embedder: turns symbol text into vectors via a remote embedding endpoint
//! (spec.md §4.4).
//!
//! The default adapter speaks the OpenAI embeddings wire format over
//! `reqwest` with `rustls-tls`. Rate limiting is a small hand-rolled token
//! bucket rather than pulling in a dedicated crate, matching the project's
//! preference for a focused dependency set over a broad one.

use crate::config::EmbeddingConfig;
use crate::error::{CoreError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Token-bucket rate limiter enforcing `max_rps`.
struct TokenBucket {
    capacity: f64,
    tokens: Mutex<(f64, Instant)>,
    refill_per_sec: f64,
}

impl TokenBucket {
    fn new(rps: u32) -> Self {
        let rps = rps.max(1) as f64;
        Self {
            capacity: rps,
            tokens: Mutex::new((rps, Instant::now())),
            refill_per_sec: rps,
        }
    }

    /// Blocks (via `tokio::time::sleep`) until a token is available.
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut guard = self.tokens.lock().unwrap();
                let (tokens, last) = &mut *guard;
                let elapsed = last.elapsed().as_secs_f64();
                *tokens = (*tokens + elapsed * self.refill_per_sec).min(self.capacity);
                *last = Instant::now();
                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - *tokens;
                    Some(Duration::from_secs_f64(deficit / self.refill_per_sec))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

pub struct Embedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
    bucket: TokenBucket,
}

impl Embedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CoreError::new(ErrorKind::Embedding, format!("failed to build http client: {e}")))?;
        let bucket = TokenBucket::new(config.max_rps);
        Ok(Self { config, client, bucket })
    }

    /// Embeds `texts`, returning vectors in the same order, each exactly
    /// `config.dimensions` long. Batches internally by `config.batch_size`.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let vectors = self.embed_batch(chunk).await?;
            out.extend(vectors);
        }
        Ok(out)
    }

    async fn embed_batch(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut attempt: u32 = 0;
        loop {
            self.bucket.acquire().await;
            match self.send_once(chunk).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if err.retryable && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_retry_delay_ms as f64;
        let capped = (base * 2f64.powi(attempt as i32 - 1)).min(self.config.max_retry_delay_ms as f64);
        let jitter = capped * (0.5 + rand_fraction(attempt) * 0.5);
        Duration::from_millis(jitter as u64)
    }

    async fn send_once(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let url = format!("{}/embeddings", self.config.endpoint_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&OpenAiEmbeddingRequest {
            model: &self.config.model,
            input: chunk,
        });
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let retryable = e.is_timeout() || e.is_connect();
            CoreError::new(ErrorKind::Embedding, format!("embedding request failed: {e}")).retryable(retryable)
        })?;

        let status = response.status();
        if !status.is_success() {
            let retryable = status.is_server_error() || status.as_u16() == 429;
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::new(
                ErrorKind::Embedding,
                format!("embedding endpoint returned {status}: {body}"),
            )
            .retryable(retryable));
        }

        let parsed: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CoreError::new(ErrorKind::Embedding, format!("malformed embedding response: {e}")).retryable(false))?;

        let mut ordered = vec![Vec::new(); chunk.len()];
        for datum in parsed.data {
            if datum.index < ordered.len() {
                if datum.embedding.len() != self.config.dimensions {
                    return Err(CoreError::new(
                        ErrorKind::Embedding,
                        format!(
                            "embedding has {} dimensions, expected {}",
                            datum.embedding.len(),
                            self.config.dimensions
                        ),
                    )
                    .retryable(false));
                }
                ordered[datum.index] = datum.embedding;
            }
        }
        Ok(ordered)
    }
}

/// Deterministic pseudo-jitter derived from the retry attempt number, so
/// backoff delays vary without pulling in a `rand` dependency the rest of
/// the stack does not otherwise need.
fn rand_fraction(attempt: u32) -> f64 {
    let seed = (attempt.wrapping_mul(2654435761)) % 1000;
    seed as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_is_capped() {
        let mut config = EmbeddingConfig::default();
        config.base_retry_delay_ms = 100;
        config.max_retry_delay_ms = 500;
        let embedder = Embedder::new(config).unwrap();
        let delay = embedder.backoff_delay(10);
        assert!(delay.as_millis() <= 500);
    }

    #[test]
    fn backoff_delay_grows_with_attempt() {
        let mut config = EmbeddingConfig::default();
        config.base_retry_delay_ms = 100;
        config.max_retry_delay_ms = 100_000;
        let embedder = Embedder::new(config).unwrap();
        assert!(embedder.backoff_delay(1).as_millis() <= embedder.backoff_delay(4).as_millis() + 1);
    }

    #[tokio::test]
    async fn token_bucket_allows_burst_up_to_capacity() {
        let bucket = TokenBucket::new(5);
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
