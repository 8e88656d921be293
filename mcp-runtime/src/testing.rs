//! In-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dokploy_core::ExecutionError;
use serde_json::{Map, Value, json};

use crate::backend::DokployBackend;
use crate::coaching::InvocationCoach;
use crate::invocation::ToolInvoker;
use crate::tools::ToolRegistry;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub endpoint: String,
    /// POST body, or the query pairs of a GET as an object.
    pub payload: Value,
}

enum Reply {
    Body(Value),
    Status(u16, String),
}

/// Records every request and answers from canned replies, `{"ok": true}`
/// when none is configured for the endpoint.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<HashMap<String, Reply>>,
}

impl RecordingBackend {
    pub fn reply(self, endpoint: &str, body: Value) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Reply::Body(body));
        self
    }

    pub fn fail(self, endpoint: &str, status: u16, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Reply::Status(status, message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(
        &self,
        method: &'static str,
        endpoint: &str,
        payload: Value,
    ) -> Result<Value, ExecutionError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            payload,
        });
        match self.replies.lock().unwrap().get(endpoint) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status, message)) => Err(ExecutionError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(json!({"ok": true})),
        }
    }
}

#[async_trait]
impl DokployBackend for RecordingBackend {
    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, ExecutionError> {
        let payload: Map<String, Value> = query
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
            .collect();
        self.answer("GET", endpoint, Value::Object(payload))
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ExecutionError> {
        self.answer("POST", endpoint, body)
    }
}

/// Builtin registry wired to `backend`; the backend handle is returned for
/// inspecting recorded calls.
pub fn invoker_with(backend: RecordingBackend) -> (ToolInvoker, Arc<RecordingBackend>) {
    let backend = Arc::new(backend);
    let invoker = ToolInvoker::new(
        Arc::new(ToolRegistry::builtin()),
        InvocationCoach::default(),
        backend.clone(),
    );
    (invoker, backend)
}
