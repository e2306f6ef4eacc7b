//! Mock text generator for testing.
//!
//! Responses are scripted up front and consumed in order. When the script
//! runs out the mock fails instead of inventing text, so a test that forgets
//! to script a call fails loudly.
//!
//! # Example
//!
//! ```ignore
//! let generator = MockTextGenerator::new()
//!     .with_response(r#"{"title": "Python Basics", "sections": []}"#)
//!     .with_error(GenerationError::unavailable("down"));
//!
//! let text = generator.generate("outline please", &GenerationOptions::new()).await?;
//! assert_eq!(generator.call_count(), 1);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    GeneratedText, GenerationError, GenerationOptions, TextGenerator, TokenUsage,
};

const MOCK_MODEL: &str = "mock-model-1";

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub options: GenerationOptions,
}

/// Scripted text generator.
#[derive(Debug, Clone, Default)]
pub struct MockTextGenerator {
    responses: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        locked(&self.responses).push_back(Ok(content.into()));
        self
    }

    /// Queues an error.
    pub fn with_error(self, error: GenerationError) -> Self {
        locked(&self.responses).push_back(Err(error));
        self
    }

    /// Queues the same error `times` times.
    pub fn with_errors(self, error: GenerationError, times: usize) -> Self {
        (0..times).fold(self, |mock, _| mock.with_error(error.clone()))
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues a response on an existing (possibly shared) mock.
    pub fn push_response(&self, content: impl Into<String>) {
        locked(&self.responses).push_back(Ok(content.into()));
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        locked(&self.calls).clone()
    }

    pub fn remaining(&self) -> usize {
        locked(&self.responses).len()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GeneratedText, GenerationError> {
        locked(&self.calls).push(RecordedCall {
            prompt: prompt.to_string(),
            options: options.clone(),
        });

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let next = locked(&self.responses).pop_front();
        match next {
            Some(Ok(content)) => {
                let completion_tokens = content.split_whitespace().count() as u32;
                let prompt_tokens = prompt.split_whitespace().count() as u32;
                Ok(GeneratedText::new(content, MOCK_MODEL)
                    .with_usage(TokenUsage::new(prompt_tokens, completion_tokens)))
            }
            Some(Err(error)) => Err(error),
            None => Err(GenerationError::InvalidRequest(
                "mock generator has no scripted response left".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
