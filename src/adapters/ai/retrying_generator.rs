//! Retrying Text Generator - Wrapper that retries transient failures.
//!
//! Each attempt runs under a timeout; a timed-out attempt counts as a
//! retryable `GenerationError::Timeout`. Non-retryable errors are returned
//! at once. When every attempt fails the last error is wrapped in
//! `GenerationError::Exhausted`.
//!
//! # Example
//!
//! ```ignore
//! let generator = RetryingTextGenerator::new(provider)
//!     .with_max_attempts(3)
//!     .with_timeout(Duration::from_secs(120));
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, warn};

use crate::ports::{GeneratedText, GenerationError, GenerationOptions, TextGenerator};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Retry decorator around any `TextGenerator`.
#[derive(Debug, Clone)]
pub struct RetryingTextGenerator<G: TextGenerator> {
    inner: G,
    max_attempts: u32,
    timeout: Duration,
    backoff: Duration,
}

impl<G: TextGenerator> RetryingTextGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Total attempts including the first (at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay between attempts, multiplied by the attempt number.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn attempt(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedText, GenerationError> {
        match timeout(self.timeout, self.inner.generate(prompt, options)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl<G: TextGenerator + 'static> TextGenerator for RetryingTextGenerator<G> {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedText, GenerationError> {
        let session_id = options
            .session_id
            .map(|id| id.to_string())
            .unwrap_or_default();

        let mut attempt = 1;
        loop {
            let err = match self.attempt(prompt, options).await {
                Ok(text) => return Ok(text),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            if attempt >= self.max_attempts {
                error!(
                    generator = self.inner.name(),
                    session_id = %session_id,
                    attempts = attempt,
                    error = %err,
                    "Text generation failed, giving up"
                );
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                generator = self.inner.name(),
                session_id = %session_id,
                attempt,
                error = %err,
                "Text generation failed, retrying"
            );
            sleep(self.backoff * attempt).await;
            attempt += 1;
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockTextGenerator;

    fn retrying(mock: &MockTextGenerator) -> RetryingTextGenerator<MockTextGenerator> {
        RetryingTextGenerator::new(mock.clone())
            .with_max_attempts(3)
            .with_backoff(Duration::ZERO)
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let mock = MockTextGenerator::new()
            .with_errors(GenerationError::unavailable("busy"), 2)
            .with_response("ok");

        let text = retrying(&mock)
            .generate("p", &GenerationOptions::new())
            .await
            .unwrap();
        assert_eq!(text.content, "ok");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mock = MockTextGenerator::new().with_errors(GenerationError::network("reset"), 5);

        let result = retrying(&mock).generate("p", &GenerationOptions::new()).await;
        match result {
            Err(GenerationError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(*last, GenerationError::network("reset"));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let mock = MockTextGenerator::new()
            .with_error(GenerationError::AuthenticationFailed)
            .with_response("never reached");

        let result = retrying(&mock).generate("p", &GenerationOptions::new()).await;
        assert_eq!(result.unwrap_err(), GenerationError::AuthenticationFailed);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let mock = MockTextGenerator::new()
            .with_response("late")
            .with_delay(Duration::from_millis(200));

        let result = RetryingTextGenerator::new(mock.clone())
            .with_max_attempts(1)
            .with_timeout(Duration::from_millis(20))
            .generate("p", &GenerationOptions::new())
            .await;

        match result {
            Err(GenerationError::Exhausted { attempts: 1, last }) => {
                assert!(matches!(*last, GenerationError::Timeout { .. }));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
