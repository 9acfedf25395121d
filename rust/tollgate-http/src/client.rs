use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tollgate_session::{SessionStore, SessionSync};

use crate::{
    ApiRequest, ApiResponse, BearerAuth, ClientConfig, Middleware, Next, RefreshCoordinator,
    RefreshMiddleware, ReqwestTransport, TollgateHttpError, Transport,
};

/// The application's API client.
///
/// Every request goes through [RefreshMiddleware], then [BearerAuth], then
/// any middleware added with [ApiClient::with_middleware], and finally the
/// transport. Callers never touch the `Authorization` header. Clones share
/// the same pipeline and refresh state.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    session: SessionStore,
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
    chain: Vec<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("middleware", &self.chain.len())
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

impl ApiClient {
    /// A client that talks to `config.base_url` over [reqwest]
    pub fn new(config: ClientConfig, session: SessionStore) -> Result<Self, TollgateHttpError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, session, Arc::new(transport)))
    }

    /// A client that delivers requests through `transport`
    pub fn with_transport(
        config: ClientConfig,
        session: SessionStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let coordinator = Arc::new(RefreshCoordinator::new(
            session.clone(),
            transport.clone(),
            config.clone(),
        ));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(RefreshMiddleware::new(coordinator.clone())),
            Arc::new(BearerAuth::new(
                session.clone(),
                config.authorization_scheme.clone(),
            )),
        ];

        Self {
            config,
            session,
            transport,
            coordinator,
            chain,
        }
    }

    /// Appends `middleware` to the chain, after the credential handling
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.chain.push(middleware);
        self
    }

    /// The session this client reads credentials from
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The client's configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The refresh state shared by every clone of this client
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Starts a session from a sign-in response: the access token and
    /// identity go to the session store, the refresh token is kept by the
    /// pipeline.
    pub fn establish(&self, payload: &SessionSync) {
        self.coordinator.establish(payload);
    }

    /// Signs out: clears identity, access token and refresh token
    pub fn end_session(&self) {
        self.coordinator.forget();
        self.session.reset();
    }

    /// Sends `request` through the pipeline.
    ///
    /// Resolves with the response for 2xx statuses. Authorization failures
    /// that could not be recovered surface as
    /// [TollgateHttpError::Unauthorized] or [TollgateHttpError::SessionEnded];
    /// any other status as [TollgateHttpError::Status].
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError> {
        let response = Next::new(self.transport.as_ref(), &self.chain)
            .run(request)
            .await?;

        if response.is_success() {
            Ok(response)
        } else if self.config.is_authorization_status(response.status) {
            Err(TollgateHttpError::Unauthorized {
                status: response.status,
            })
        } else {
            Err(TollgateHttpError::Status {
                status: response.status,
                body: response.text(),
            })
        }
    }

    /// `GET path` and decode the JSON response
    pub async fn get_json<T>(&self, path: &str) -> Result<T, TollgateHttpError>
    where
        T: DeserializeOwned,
    {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// `POST path` with a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TollgateHttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).with_json(body)?)
            .await?
            .json()
    }
}
