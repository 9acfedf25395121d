use reqwest::{Method, StatusCode, header::HeaderMap};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::TollgateHttpError;

/// Per-request bookkeeping owned by the pipeline.
///
/// The record belongs to one request and travels with it; a retry produces
/// a new request carrying a new record, so nothing here is shared between
/// requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestMeta {
    retried: bool,
    refresh_epoch: u64,
}

impl RequestMeta {
    /// True if this request is already the retry of a refreshed request
    pub fn retried(&self) -> bool {
        self.retried
    }

    /// The number of completed token refreshes at the time the request was
    /// first sent
    pub fn refresh_epoch(&self) -> u64 {
        self.refresh_epoch
    }
}

/// An outgoing API request
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL
    pub path: String,
    /// Headers to send. `Authorization` is managed by the pipeline.
    pub headers: HeaderMap,
    /// Optional JSON body
    pub body: Option<Value>,
    meta: RequestMeta,
}

impl ApiRequest {
    /// A request with no headers and no body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            meta: RequestMeta::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[allow(missing_docs)]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attaches a JSON body
    pub fn with_json<B>(mut self, body: &B) -> Result<Self, TollgateHttpError>
    where
        B: Serialize + ?Sized,
    {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// The pipeline's bookkeeping for this request
    pub fn meta(&self) -> RequestMeta {
        self.meta
    }

    pub(crate) fn observed_at(mut self, refresh_epoch: u64) -> Self {
        self.meta.refresh_epoch = refresh_epoch;
        self
    }

    pub(crate) fn into_retry(mut self) -> Self {
        self.meta.retried = true;
        self
    }
}

/// How the pipeline arrived at a response
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Recovery {
    /// Answered on the first attempt
    #[default]
    Normal,
    /// Answered by the retry issued after a successful token refresh
    Retried,
}

/// A response that made it back through the pipeline
#[derive(Clone, Debug)]
pub struct ApiResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Vec<u8>,
    recovery: Recovery,
}

impl ApiResponse {
    /// A response with the given status and body
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            recovery: Recovery::Normal,
        }
    }

    /// A response whose body is `value` encoded as JSON
    pub fn json_body(status: StatusCode, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body as JSON
    pub fn json<T>(&self) -> Result<T, TollgateHttpError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body, lossily decoded as UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether this response came from a retry
    pub fn recovery(&self) -> Recovery {
        self.recovery
    }

    pub(crate) fn recovered(mut self) -> Self {
        self.recovery = Recovery::Retried;
        self
    }
}
