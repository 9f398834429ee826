//! Scripted gateway for tests and harness verification.
//!
//! Deterministic stand-in for a live model backend: answers come from a
//! fixed queue or a handler closure, optionally after a fixed artificial
//! delay so latency statistics have a stable shape. Prompts are recorded
//! for assertion.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;

use crate::error::GatewayError;

use super::{CompletionOptions, Gateway, TextStream};

type Handler = dyn Fn(&str) -> Result<String, GatewayError> + Send + Sync;

/// A gateway whose behavior is fully scripted by the test.
#[derive(Default)]
pub struct ScriptedGateway {
    queue: Mutex<VecDeque<Result<String, GatewayError>>>,
    handler: Option<Box<Handler>>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    /// Answers come from a queue, in order. Exhausting the queue is a
    /// connection failure, which keeps silent test under-scripting loud.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            ..Self::default()
        }
    }

    /// Every prompt is answered by the handler.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::default()
        }
    }

    /// Every prompt gets the same answer.
    pub fn always(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::with_handler(move |_| Ok(response.clone()))
    }

    /// Sleep this long before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Append a successful response to the queue.
    pub fn push_response(&self, response: impl Into<String>) {
        self.queue.lock().push_back(Ok(response.into()));
    }

    /// Append a failure to the queue.
    pub fn push_failure(&self, error: GatewayError) {
        self.queue.lock().push_back(Err(error));
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn answer(&self, prompt: &str) -> Result<String, GatewayError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(handler) = &self.handler {
            return handler(prompt);
        }
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::Unavailable {
                    message: "scripted gateway exhausted".into(),
                })
            })
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer(prompt)
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<TextStream, GatewayError> {
        let full = self.complete(prompt, options).await?;
        Ok(Box::pin(stream::iter(vec![Ok(full)])))
    }
}
