//! Scripted transport for exercising the pipeline without a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{StatusCode, header::AUTHORIZATION};
use serde_json::Value;

use crate::{ApiRequest, ApiResponse, TollgateHttpError, Transport};

type Responder =
    dyn Fn(&ApiRequest) -> Result<ApiResponse, TollgateHttpError> + Send + Sync + 'static;

/// A [Transport] that answers every request with a closure and records
/// what it was sent.
pub struct MockTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

impl MockTransport {
    /// Answer with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TollgateHttpError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `200 {}`
    pub fn ok() -> Self {
        Self::new(|_| Ok(reply(StatusCode::OK, &Value::Object(Default::default()))))
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// How many requests were sent to a path ending in `path`
    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.path.ends_with(path))
            .count()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError> {
        self.requests.lock().push(request.clone());
        (self.responder)(&request)
    }
}

/// A JSON response
pub fn reply(status: StatusCode, body: &Value) -> ApiResponse {
    ApiResponse::json_body(status, body)
}

/// The token carried in a request's `Authorization` header, if any
pub fn bearer_of(request: &ApiRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}
