//! Scripted transport for unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use verge_core::{ApiRequest, Result, Transport};

/// Replays queued responses in order, then keeps answering `fallback`.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Option<Value>>>>,
    fallback: Result<Option<Value>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Option<Value>>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            fallback: Ok(Some(json!({"status": "running"}))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_fallback(mut self, fallback: Result<Option<Value>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == reqwest::Method::GET)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Records requests and never answers them.
#[derive(Default)]
pub(crate) struct StalledTransport {
    requests: Mutex<Vec<ApiRequest>>,
}

impl StalledTransport {
    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for StalledTransport {
    async fn request(&self, request: ApiRequest) -> Result<Option<Value>> {
        self.requests.lock().unwrap().push(request);
        std::future::pending().await
    }
}
