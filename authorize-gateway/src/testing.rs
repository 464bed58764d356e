//! In-memory SOAP transport for tests
//!
//! [`RecordingTransport`] keeps every request it is asked to send and answers
//! from a queue of scripted replies, so adapter and gateway behavior can be
//! checked without a network.

use crate::error::{GatewayError, GatewayResult};
use crate::soap::{SoapRequest, SoapResponse, SoapTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A request seen by [`RecordingTransport`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Action name, e.g. `CreateCustomerProfile`
    pub action: &'static str,
    /// Request body as JSON, keyed by wire names
    pub body: serde_json::Value,
    /// The request itself
    pub request: SoapRequest,
}

enum Reply {
    Response(SoapResponse),
    Failure(String),
}

/// Scripted [`SoapTransport`].
///
/// Replies are consumed in order. A call with nothing queued fails with a
/// connection error.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply
    pub fn respond(&self, response: SoapResponse) -> &Self {
        lock(&self.replies).push_back(Reply::Response(response));
        self
    }

    /// Queue a transport failure
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        lock(&self.replies).push_back(Reply::Failure(message.into()));
        self
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Action names received so far, in order
    pub fn actions(&self) -> Vec<&'static str> {
        lock(&self.calls).iter().map(|call| call.action).collect()
    }

    /// Most recent request
    pub fn last_call(&self) -> Option<RecordedCall> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait]
impl SoapTransport for RecordingTransport {
    async fn call(&self, request: &SoapRequest) -> GatewayResult<SoapResponse> {
        let body = serde_json::to_value(request)
            .map_err(|e| GatewayError::connection(format!("could not record request: {}", e)))?;
        lock(&self.calls).push(RecordedCall {
            action: request.action(),
            body,
            request: request.clone(),
        });

        match lock(&self.replies).pop_front() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(GatewayError::connection(message)),
            None => Err(GatewayError::connection(format!(
                "no reply scripted for {}",
                request.action()
            ))),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
