use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tollgate_common::StateCell;
use tollgate_session::{SessionStore, SessionSync};

use crate::{
    ApiRequest, ApiResponse, ClientConfig, Middleware, Next, TollgateHttpError, Transport,
};

/// Phases a failing request moves through while the pipeline recovers it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryState {
    /// No authorization failure observed
    Normal,
    /// Waiting on a token refresh
    Refreshing,
    /// Refresh succeeded and the request was re-issued
    Retried,
    /// Refresh failed; the session's tokens were cleared
    Failed,
}

/// Why a refresh did not produce a new access token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshFailure(pub String);

#[derive(Default)]
struct Flight {
    epoch: u64,
    outcome: Option<Result<String, RefreshFailure>>,
}

/// Owns the refresh token and performs refreshes on behalf of every request
/// sharing one [SessionStore].
///
/// Refreshes are single-flight: every completed refresh advances an epoch,
/// and a request remembers the epoch it was sent under. When its
/// authorization failure arrives after a newer refresh already finished, it
/// reuses that refresh's outcome instead of starting another. Requests that
/// fail while a refresh is in progress wait for it and reuse its outcome in
/// the same way.
pub struct RefreshCoordinator {
    session: SessionStore,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    refresh_token: StateCell<Option<String>>,
    epoch: AtomicU64,
    flight: Mutex<Flight>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.config.refresh_path)
            .field("has_refresh_token", &self.refresh_token.read().is_some())
            .field("epoch", &self.epoch())
            .finish()
    }
}

impl RefreshCoordinator {
    /// `transport` is used directly for refresh calls, bypassing every
    /// middleware, so a refresh can never trigger another refresh.
    pub fn new(session: SessionStore, transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            session,
            transport,
            config,
            refresh_token: StateCell::new(None),
            epoch: AtomicU64::new(0),
            flight: Mutex::new(Flight::default()),
        }
    }

    /// Number of refreshes completed so far
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// True when a refresh token is held
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.read().is_some()
    }

    /// Applies a server-issued session update: the session store takes the
    /// access token and identity, the refresh token stays here.
    pub fn establish(&self, payload: &SessionSync) {
        self.session.sync_from_server(payload);
        self.keep_refresh_token(payload);
    }

    fn keep_refresh_token(&self, payload: &SessionSync) {
        if let Some(refresh_token) = payload.refresh_token.clone() {
            *self.refresh_token.write() = Some(refresh_token);
        }
    }

    /// Drops the refresh token
    pub fn forget(&self) {
        *self.refresh_token.write() = None;
    }

    /// Whether a response with `status` to `request` should be recovered by
    /// refreshing
    pub fn should_refresh(&self, request: &ApiRequest, status: reqwest::StatusCode) -> bool {
        self.config.is_authorization_status(status)
            && !request.meta().retried()
            && !self.config.is_refresh_path(&request.path)
    }

    /// Obtain an access token newer than the one a request sent under
    /// `observed_epoch` was rejected with
    pub async fn recover(&self, observed_epoch: u64) -> Result<String, RefreshFailure> {
        let mut flight = self.flight.lock().await;

        if flight.epoch > observed_epoch {
            tracing::debug!(
                observed_epoch,
                epoch = flight.epoch,
                "Reusing the outcome of a refresh that completed after the request was sent"
            );
            return flight
                .outcome
                .clone()
                .unwrap_or_else(|| Err(RefreshFailure("no refresh outcome recorded".into())));
        }

        tracing::debug!(epoch = flight.epoch, "Refreshing access token");
        let outcome = self.refresh().await;

        flight.epoch += 1;
        flight.outcome = Some(outcome.clone());
        self.epoch.store(flight.epoch, Ordering::Release);

        outcome
    }

    /// The outcome only lands in the session it was requested for: a
    /// sign-out or sign-in while the refresh is in flight discards it.
    async fn refresh(&self) -> Result<String, RefreshFailure> {
        let generation = self.session.generation();
        let outcome = self.request_refresh().await;

        if self.session.generation() != generation {
            tracing::debug!(generation, "Session replaced during token refresh; discarding outcome");
            return Err(RefreshFailure("session ended while refreshing".into()));
        }

        match outcome {
            Ok(payload) => {
                let token = payload.token.clone().unwrap_or_default();
                if !self.session.sync_from_server_if_current(generation, &payload) {
                    return Err(RefreshFailure("session ended while refreshing".into()));
                }
                self.keep_refresh_token(&payload);
                tracing::debug!("Access token refreshed");
                Ok(token)
            }
            Err(failure) => {
                tracing::warn!(reason = %failure.0, "Token refresh failed; ending session");
                self.session.reset_access_token();
                self.forget();
                Err(failure)
            }
        }
    }

    async fn request_refresh(&self) -> Result<SessionSync, RefreshFailure> {
        let body = match self.refresh_token.read().as_deref() {
            Some(refresh_token) => json!({ "refresh_token": refresh_token }),
            None => json!({}),
        };
        let mut request = ApiRequest::post(self.config.refresh_path.clone());
        request.body = Some(body);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|error| RefreshFailure(error.to_string()))?;

        if !response.is_success() {
            return Err(RefreshFailure(format!(
                "refresh endpoint responded with {}",
                response.status
            )));
        }

        let payload = response
            .json::<serde_json::Value>()
            .and_then(|value| Ok(SessionSync::from_value(&value)?))
            .map_err(|error| RefreshFailure(error.to_string()))?;

        match payload.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(payload),
            _ => Err(RefreshFailure("refresh response carried no token".into())),
        }
    }
}

/// Recovers requests rejected for an expired credential: refreshes the
/// token through the [RefreshCoordinator] and re-issues the request once.
///
/// Must sit in front of [crate::BearerAuth] so that the retry picks up the
/// refreshed token.
#[derive(Clone, Debug)]
pub struct RefreshMiddleware {
    coordinator: Arc<RefreshCoordinator>,
}

impl RefreshMiddleware {
    #[allow(missing_docs)]
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Middleware for RefreshMiddleware {
    async fn handle(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, TollgateHttpError> {
        let request = if request.meta().retried() {
            request
        } else {
            request.observed_at(self.coordinator.epoch())
        };

        let response = next.run(request.clone()).await?;
        if !self.coordinator.should_refresh(&request, response.status) {
            return Ok(response);
        }

        let status = response.status;
        let mut state = RecoveryState::Refreshing;
        tracing::debug!(path = %request.path, %status, ?state, "Credential rejected");

        match self.coordinator.recover(request.meta().refresh_epoch()).await {
            Ok(_) => {
                state = RecoveryState::Retried;
                tracing::debug!(path = %request.path, ?state, "Re-issuing request");
                Ok(next.run(request.into_retry()).await?.recovered())
            }
            Err(RefreshFailure(reason)) => {
                state = RecoveryState::Failed;
                tracing::debug!(path = %request.path, ?state, %reason, "Request not recovered");
                Err(TollgateHttpError::SessionEnded { status })
            }
        }
    }
}
