//! Shared test helpers for sequencer tests.

use promptseq_core::error::ProviderError;
use promptseq_core::provider::{FinishReason, Provider, ProviderRequest, ProviderResponse};
use std::sync::Mutex;

/// One scripted reply.
pub enum Reply {
    Text(&'static str),
    Truncated(&'static str),
    Fail(&'static str),
    /// Never resolves.
    Stall,
}

/// A mock provider that returns a sequence of scripted replies and records
/// every request it receives.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Vec<Reply>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call stops normally with the given texts, in order.
    pub fn texts(texts: &[&'static str]) -> Self {
        Self::new(texts.iter().copied().map(Reply::Text).collect())
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        let Some(reply) = self.replies.get(call) else {
            panic!(
                "ScriptedProvider: no more replies (call #{}, have {})",
                call,
                self.replies.len()
            );
        };

        match reply {
            Reply::Text(text) => Ok(ProviderResponse::text(*text)),
            Reply::Truncated(text) => Ok(ProviderResponse {
                finish_reason: FinishReason::Length,
                ..ProviderResponse::text(*text)
            }),
            Reply::Fail(message) => Err(ProviderError::ApiError {
                status_code: 500,
                message: message.to_string(),
            }),
            Reply::Stall => futures::future::pending().await,
        }
    }
}
