use async_trait::async_trait;
use url::Url;

use crate::{ApiRequest, ApiResponse, ClientConfig, TollgateHttpError, Transport};

/// A [Transport] backed by [reqwest], usable natively and in the browser
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport for the base URL and timeout in `config`
    pub fn new(config: &ClientConfig) -> Result<Self, TollgateHttpError> {
        let base_url = Url::parse(&config.base_url)?;

        #[allow(unused_mut)]
        let mut client_builder = reqwest::Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = config.timeout_seconds {
            client_builder = client_builder.timeout(std::time::Duration::from_secs(timeout));
        }

        let client = client_builder
            .build()
            .map_err(|e| TollgateHttpError::Transport(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Resolve a request path: absolute URLs are used as is, anything else
    /// is appended to the base URL
    pub fn resolve(&self, path: &str) -> Result<Url, TollgateHttpError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError> {
        let url = self.resolve(&request.path)?;

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut reply = ApiResponse::new(status, body.to_vec());
        reply.headers = headers;
        Ok(reply)
    }
}
