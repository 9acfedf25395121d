use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tollgate_session::SessionStore;

use crate::{ApiRequest, ApiResponse, Middleware, Next, TollgateHttpError};

/// Attaches the session's current access token to every request.
///
/// The token is read from the [SessionStore] when the request passes
/// through, not when the middleware is built. Any `Authorization` header the
/// caller set is replaced; with no token, it is removed.
#[derive(Clone, Debug)]
pub struct BearerAuth {
    session: SessionStore,
    scheme: String,
}

impl BearerAuth {
    #[allow(missing_docs)]
    pub fn new(session: SessionStore, scheme: impl Into<String>) -> Self {
        Self {
            session,
            scheme: scheme.into(),
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Middleware for BearerAuth {
    async fn handle(
        &self,
        mut request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, TollgateHttpError> {
        let token = self.session.access_token();

        if token.is_empty() {
            request.headers.remove(AUTHORIZATION);
        } else {
            let mut value = HeaderValue::from_str(&format!("{} {token}", self.scheme))
                .map_err(|e| TollgateHttpError::InvalidRequest(e.to_string()))?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }

        next.run(request).await
    }
}
