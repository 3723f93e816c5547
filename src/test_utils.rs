//! Scripted transport for exercising the client without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{Request, Response};
use crate::error::{Error, Result};
use crate::http::HttpTransport;

enum Scripted {
    Response {
        content: String,
        status: u16,
        headers: Vec<(String, String)>,
    },
    Failure(String),
}

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct MockTransport {
    requests: Mutex<Vec<Request>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response with a JSON content type.
    pub(crate) fn fake_json(&self, content: &str, status: u16) -> &Self {
        self.fake_response(
            content,
            status,
            vec![("Content-Type".to_string(), "application/json".to_string())],
        )
    }

    /// Queue a response.
    pub(crate) fn fake_response(
        &self,
        content: &str,
        status: u16,
        headers: Vec<(String, String)>,
    ) -> &Self {
        self.script.lock().unwrap().push_back(Scripted::Response {
            content: content.to_string(),
            status,
            headers,
        });
        self
    }

    /// Queue a transport-level failure.
    pub(crate) fn fake_failure(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(message.to_string()));
        self
    }

    /// Every request dispatched so far, in order.
    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());

        let scripted = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("mock transport script exhausted");

        match scripted {
            Scripted::Response {
                content,
                status,
                headers,
            } => {
                let response = Response::new(
                    Arc::new(request.clone()),
                    content,
                    status,
                    headers,
                    HashMap::new(),
                );
                match response.to_error() {
                    Some(error) => Err(error),
                    None => Ok(response),
                }
            }
            Scripted::Failure(message) => Err(Error::request_failed(message)),
        }
    }
}
