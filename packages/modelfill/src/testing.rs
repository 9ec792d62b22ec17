//! Testing utilities including mock implementations.
//!
//! Useful for testing applications that fill models without making real
//! completion calls.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use openai_client::{ChatRequest, OpenAIError};

use crate::query::Completion;

/// A mock completion capability for testing.
///
/// Returns a canned response and records every request for assertions.
#[derive(Clone)]
pub struct MockCompletion {
    response: Arc<std::result::Result<String, String>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockCompletion {
    /// Create a mock that answers every request with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Arc::new(Ok(response.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that fails every request with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Arc::new(Err(message.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Completion for MockCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<String, OpenAIError> {
        self.requests.lock().unwrap().push(request);
        match self.response.as_ref() {
            Ok(content) => Ok(content.clone()),
            Err(message) => Err(OpenAIError::Api(message.clone())),
        }
    }
}
