use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tollgate_session::{Identity, SessionStore, SessionSync};
use tollgate_storage::{MemoryStorage, PersistedStore};

use crate::{
    ApiClient, ApiRequest, ClientConfig, MockTransport, Recovery, TollgateHttpError, bearer_of,
    reply,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_test::wasm_bindgen_test;

const REFRESH: &str = "/auth/refresh";

fn signed_in() -> (SessionStore, MemoryStorage) {
    let storage = MemoryStorage::default();
    let session = SessionStore::open(storage.clone());
    session.set_identity(Some(Identity::new("u1").with_role("r1")));
    session.set_access_token("stale");
    (session, storage)
}

fn client(session: &SessionStore, transport: &Arc<MockTransport>) -> ApiClient {
    ApiClient::with_transport(ClientConfig::default(), session.clone(), transport.clone())
}

/// Accepts only the most recently issued token; every refresh issues
/// `fresh-N` and rotates the refresh token to `rN`.
fn rotating_server(issued: Arc<AtomicUsize>) -> MockTransport {
    MockTransport::new(move |request| {
        if request.path.ends_with(REFRESH) {
            let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(reply(
                StatusCode::OK,
                &json!({ "token": format!("fresh-{n}"), "refresh_token": format!("r{n}") }),
            ));
        }
        let current = format!("fresh-{}", issued.load(Ordering::SeqCst));
        if bearer_of(request).as_deref() == Some(current.as_str()) {
            Ok(reply(StatusCode::OK, &json!({ "ok": true })))
        } else {
            Ok(reply(StatusCode::UNAUTHORIZED, &json!({ "error": "expired" })))
        }
    })
}

fn refresh_bodies(transport: &MockTransport) -> Vec<Value> {
    transport
        .requests()
        .into_iter()
        .filter(|request| request.path.ends_with(REFRESH))
        .map(|request| request.body.unwrap_or(Value::Null))
        .collect()
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_attaches_the_token_current_at_send_time() -> anyhow::Result<()> {
    let session = SessionStore::open(MemoryStorage::default());
    let transport = Arc::new(MockTransport::ok());
    let api = client(&session, &transport);

    api.send(ApiRequest::get("/modules")).await?;
    session.set_access_token("T");
    api.send(ApiRequest::get("/modules")).await?;
    session.set_access_token("T2");
    api.send(ApiRequest::get("/modules")).await?;

    let sent: Vec<Option<String>> = transport.requests().iter().map(bearer_of).collect();
    assert_eq!(sent, vec![None, Some("T".into()), Some("T2".into())]);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_refreshes_and_retries_a_rejected_request() -> anyhow::Result<()> {
    let (session, storage) = signed_in();
    let transport = Arc::new(rotating_server(Arc::new(AtomicUsize::new(0))));
    let api = client(&session, &transport);
    api.establish(&SessionSync::default().with_refresh_token("r0"));

    let response = api.send(ApiRequest::get("/modules")).await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.recovery(), Recovery::Retried);
    assert_eq!(transport.count(REFRESH), 1);
    assert_eq!(transport.count("/modules"), 2);
    assert_eq!(refresh_bodies(&transport), vec![json!({ "refresh_token": "r0" })]);

    let sent: Vec<Option<String>> = transport.requests().iter().map(bearer_of).collect();
    assert_eq!(sent, vec![Some("stale".into()), None, Some("fresh-1".into())]);

    assert_eq!(session.access_token(), "fresh-1");
    assert_eq!(session.identity(), Some(Identity::new("u1").with_role("r1")));
    assert_eq!(storage.get("access_token")?.as_deref(), Some("\"fresh-1\""));
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_retries_a_request_at_most_once() -> anyhow::Result<()> {
    let (session, _) = signed_in();
    let transport = Arc::new(MockTransport::new(|request| {
        if request.path.ends_with(REFRESH) {
            Ok(reply(StatusCode::OK, &json!({ "token": "fresh" })))
        } else {
            Ok(reply(StatusCode::UNAUTHORIZED, &json!({})))
        }
    }));
    let api = client(&session, &transport);

    let error = api.send(ApiRequest::get("/modules")).await.unwrap_err();

    assert_eq!(
        error,
        TollgateHttpError::Unauthorized {
            status: StatusCode::UNAUTHORIZED
        }
    );
    assert_eq!(transport.count(REFRESH), 1);
    assert_eq!(transport.count("/modules"), 2);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_never_refreshes_on_behalf_of_the_refresh_endpoint() -> anyhow::Result<()> {
    let (session, _) = signed_in();
    let transport = Arc::new(MockTransport::new(|_| {
        Ok(reply(StatusCode::UNAUTHORIZED, &json!({})))
    }));
    let api = client(&session, &transport);

    let error = api
        .send(ApiRequest::post(format!("{REFRESH}?source=manual")))
        .await
        .unwrap_err();

    assert!(error.is_authorization());
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(session.access_token(), "stale");
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_ends_the_session_when_refresh_fails() -> anyhow::Result<()> {
    let (session, storage) = signed_in();
    let transport = Arc::new(MockTransport::new(|request| {
        if request.path.ends_with(REFRESH) {
            Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, &json!({})))
        } else {
            Ok(reply(StatusCode::UNAUTHORIZED, &json!({})))
        }
    }));
    let api = client(&session, &transport);
    api.establish(&SessionSync::default().with_refresh_token("r0"));

    let error = api.send(ApiRequest::get("/modules")).await.unwrap_err();

    assert_eq!(
        error,
        TollgateHttpError::SessionEnded {
            status: StatusCode::UNAUTHORIZED
        }
    );
    assert_eq!(transport.count("/modules"), 1);
    assert_eq!(session.access_token(), "");
    assert_eq!(session.identity(), Some(Identity::new("u1").with_role("r1")));
    assert_eq!(storage.get("access_token")?, None);
    assert!(!api.coordinator().has_refresh_token());
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_treats_a_refresh_without_a_token_as_failed() -> anyhow::Result<()> {
    let (session, _) = signed_in();
    let transport = Arc::new(MockTransport::new(|request| {
        if request.path.ends_with(REFRESH) {
            Ok(reply(StatusCode::OK, &json!({ "refresh_token": "r9" })))
        } else {
            Ok(reply(StatusCode::UNAUTHORIZED, &json!({})))
        }
    }));
    let api = client(&session, &transport);

    let error = api.send(ApiRequest::get("/modules")).await.unwrap_err();

    assert!(matches!(error, TollgateHttpError::SessionEnded { .. }));
    assert_eq!(session.access_token(), "");
    assert!(!api.coordinator().has_refresh_token());
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_passes_other_failures_through() -> anyhow::Result<()> {
    let (session, _) = signed_in();
    let transport = Arc::new(MockTransport::new(|request| match request.path.as_str() {
        "/forbidden" => Ok(reply(StatusCode::FORBIDDEN, &json!({ "error": "nope" }))),
        _ => Err(TollgateHttpError::Transport("connection refused".into())),
    }));
    let api = client(&session, &transport);

    let forbidden = api.send(ApiRequest::get("/forbidden")).await.unwrap_err();
    assert_eq!(forbidden.status(), Some(StatusCode::FORBIDDEN));
    assert!(!forbidden.is_authorization());

    let offline = api.send(ApiRequest::get("/modules")).await.unwrap_err();
    assert_eq!(
        offline,
        TollgateHttpError::Transport("connection refused".into())
    );

    assert_eq!(transport.count(REFRESH), 0);
    assert_eq!(session.access_token(), "stale");
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_refreshes_again_when_a_refreshed_token_is_later_rejected() -> anyhow::Result<()> {
    let (session, _) = signed_in();
    let issued = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(rotating_server(issued.clone()));
    let api = client(&session, &transport);

    api.send(ApiRequest::get("/modules")).await?;
    assert_eq!(session.access_token(), "fresh-1");

    // The server revokes fresh-1 behind our back
    issued.fetch_add(1, Ordering::SeqCst);

    let response = api.send(ApiRequest::get("/modules")).await?;

    assert_eq!(response.recovery(), Recovery::Retried);
    assert_eq!(transport.count(REFRESH), 2);
    assert_eq!(session.access_token(), "fresh-3");
    assert_eq!(
        refresh_bodies(&transport),
        vec![json!({}), json!({ "refresh_token": "r1" })]
    );
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_establishes_and_ends_sessions() -> anyhow::Result<()> {
    let storage = MemoryStorage::default();
    let session = SessionStore::open(storage.clone());
    let transport = Arc::new(MockTransport::ok());
    let api = client(&session, &transport);

    let signed_in = SessionSync::from_value(&json!({
        "token": "t1",
        "refresh_token": "r1",
        "user": { "id": "u1", "email": "ada@example.com", "role_id": "admin", "is_superuser": true }
    }))?;
    api.establish(&signed_in);

    assert_eq!(session.access_token(), "t1");
    assert_eq!(
        session.identity(),
        Some(
            Identity::new("u1")
                .with_email("ada@example.com")
                .with_role("admin")
        )
    );
    assert!(api.coordinator().has_refresh_token());

    api.end_session();

    assert_eq!(session.snapshot().identity, None);
    assert_eq!(session.access_token(), "");
    assert!(!api.coordinator().has_refresh_token());
    assert!(storage.is_empty());
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn it_decodes_json_helpers() -> anyhow::Result<()> {
    let session = SessionStore::open(MemoryStorage::default());
    let transport = Arc::new(MockTransport::new(|request| {
        Ok(reply(
            StatusCode::OK,
            &json!({ "echo": request.body.clone().unwrap_or(Value::Null) }),
        ))
    }));
    let api = client(&session, &transport);

    let echoed: Value = api.post_json("/echo", &json!({ "name": "algebra" })).await?;

    assert_eq!(echoed, json!({ "echo": { "name": "algebra" } }));
    assert_eq!(transport.requests()[0].method, reqwest::Method::POST);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
mod concurrency {
    use super::*;
    use crate::{ApiResponse, Transport};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::{Barrier, Notify};

    /// Holds back the first two rejections until both requests are in
    /// flight, so both fail against the same stale token.
    struct RacingServer {
        arrivals: Barrier,
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl Transport for RacingServer {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError> {
            if request.path.ends_with(REFRESH) {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                return Ok(reply(StatusCode::OK, &json!({ "token": "fresh" })));
            }

            if bearer_of(&request).as_deref() == Some("fresh") {
                Ok(reply(StatusCode::OK, &json!({})))
            } else {
                self.arrivals.wait().await;
                Ok(reply(StatusCode::UNAUTHORIZED, &json!({})))
            }
        }
    }

    #[tokio::test]
    async fn it_coalesces_concurrent_refreshes_into_one() -> anyhow::Result<()> {
        let (session, _) = signed_in();
        let server = Arc::new(RacingServer {
            arrivals: Barrier::new(2),
            refreshes: AtomicUsize::new(0),
        });
        let api = ApiClient::with_transport(ClientConfig::default(), session.clone(), server.clone());

        let (first, second) = tokio::join!(
            api.send(ApiRequest::get("/modules")),
            api.send(ApiRequest::get("/subjects"))
        );

        assert_eq!(first?.recovery(), Recovery::Retried);
        assert_eq!(second?.recovery(), Recovery::Retried);
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(api.coordinator().epoch(), 1);
        assert_eq!(session.access_token(), "fresh");
        Ok(())
    }

    /// Parks every refresh until released, announcing when one starts.
    struct HeldRefresh {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Transport for HeldRefresh {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TollgateHttpError> {
            if request.path.ends_with(REFRESH) {
                self.started.notify_one();
                self.release.notified().await;
                return Ok(reply(
                    StatusCode::OK,
                    &json!({ "token": "fresh", "refresh_token": "r1" }),
                ));
            }

            if bearer_of(&request).as_deref() == Some("fresh") {
                Ok(reply(StatusCode::OK, &json!({})))
            } else {
                Ok(reply(StatusCode::UNAUTHORIZED, &json!({})))
            }
        }
    }

    #[tokio::test]
    async fn it_discards_a_refresh_that_finishes_after_sign_out() -> anyhow::Result<()> {
        let (session, storage) = signed_in();
        let server = Arc::new(HeldRefresh {
            started: Notify::new(),
            release: Notify::new(),
        });
        let api = ApiClient::with_transport(ClientConfig::default(), session.clone(), server.clone());
        api.establish(&SessionSync::default().with_refresh_token("r0"));

        let (result, _) = tokio::join!(api.send(ApiRequest::get("/modules")), async {
            server.started.notified().await;
            api.end_session();
            server.release.notify_one();
        });

        assert_eq!(
            result.unwrap_err(),
            TollgateHttpError::SessionEnded {
                status: StatusCode::UNAUTHORIZED
            }
        );
        assert_eq!(session.access_token(), "");
        assert_eq!(session.identity(), None);
        assert_eq!(storage.get("access_token")?, None);
        assert_eq!(storage.get("user")?, None);
        assert!(!api.coordinator().has_refresh_token());
        Ok(())
    }
}
