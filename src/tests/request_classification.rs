// Failures that must reach the caller untouched: replays that fail again,
// auth routes, and transport errors.

use std::sync::atomic::Ordering;

use serde_json::{json, Value};

use crate::client::coordinator::RefreshPhase;
use crate::client::error::ClientError;
use crate::client::request::RequestDescriptor;
use crate::events::session_events::SessionEvents;
use crate::tests::common::{
    build_client, memory_token_store, seed_session, wait_for_pending, FakeApi, RefreshMode,
    PROTECTED_PATH,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replayed_request_failing_again_is_not_refreshed_twice() {
    let api = FakeApi::new("not-issued-yet", RefreshMode::Succeed("at2".into()));
    api.always_unauthorized.store(true, Ordering::SeqCst);
    let (server, base_url) = api.spawn().await;
    let (_kv, store) = memory_token_store();
    seed_session(&store, "at1", "rt1").await;
    let events = SessionEvents::new();
    let mut invalidations = events.subscribe();
    let client = build_client(&base_url, store.clone(), events);

    let err = client.get::<Value>(PROTECTED_PATH).await.unwrap_err();
    match &err {
        ClientError::Authentication(failure) => {
            assert_eq!(failure.message, "Token inválido ou expirado");
        }
        other => panic!("expected plain authentication error, got {other:?}"),
    }

    assert_eq!(api.refresh_count(), 1);
    assert_eq!(
        api.protected_headers(),
        vec![Some("Bearer at1".to_string()), Some("Bearer at2".to_string())]
    );
    // the refresh itself succeeded, so the session stays
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("at2"));
    assert!(invalidations.try_recv().is_err());

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn descriptor_already_marked_as_retry_propagates_401() {
    let api = FakeApi::new("not-issued-yet", RefreshMode::Succeed("at2".into()));
    let (server, base_url) = api.spawn().await;
    let (_kv, store) = memory_token_store();
    seed_session(&store, "at1", "rt1").await;
    let client = build_client(&base_url, store, SessionEvents::new());

    let mut request = RequestDescriptor::get(PROTECTED_PATH);
    request.is_retry = true;
    let err = client.execute(request).await.unwrap_err();

    assert!(matches!(err, ClientError::Authentication(_)), "{err:?}");
    assert_eq!(api.refresh_count(), 0);

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_login_never_triggers_refresh() {
    let api = FakeApi::new("at1", RefreshMode::Succeed("at2".into()));
    let (server, base_url) = api.spawn().await;
    let (_kv, store) = memory_token_store();
    seed_session(&store, "stale", "rt1").await;
    let client = build_client(&base_url, store, SessionEvents::new());

    let err = client
        .post::<_, Value>("/auth/login", &json!({"email": "ana@example.com", "password": "errada"}))
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "E-mail ou senha inválidos");
    assert!(matches!(err, ClientError::Authentication(_)));
    assert_eq!(api.refresh_count(), 0);

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn auth_route_401_passes_through_while_a_refresh_is_in_flight() {
    let api = FakeApi::new("not-issued-yet", RefreshMode::Succeed("at2".into())).gated();
    let (server, base_url) = api.spawn().await;
    let (_kv, store) = memory_token_store();
    seed_session(&store, "at1", "rt1").await;
    let client = build_client(&base_url, store, SessionEvents::new());

    let pending_call = {
        let client = client.clone();
        tokio::spawn(async move { client.get::<Value>(PROTECTED_PATH).await })
    };
    wait_for_pending(&client, 1).await;

    let err = client
        .post::<_, Value>("/auth/refresh-token", &json!({"refreshToken": "rt1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)), "{err:?}");
    assert_eq!(client.coordinator().pending().await, 1, "auth route did not join the queue");
    assert_eq!(client.coordinator().phase().await, RefreshPhase::Refreshing);

    api.release_refresh();
    pending_call.await.unwrap().expect("queued call is replayed");
    assert_eq!(api.refresh_count(), 1);

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transport_errors_pass_through_untouched() {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_kv, store) = memory_token_store();
    seed_session(&store, "at1", "rt1").await;
    let events = SessionEvents::new();
    let mut invalidations = events.subscribe();
    let client = build_client(&format!("http://{}/api/v1", addr), store.clone(), events);

    let err = client.get::<Value>(PROTECTED_PATH).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "{err:?}");
    assert_eq!(client.coordinator().phase().await, RefreshPhase::Idle);
    assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("rt1"));
    assert!(invalidations.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_auth_failures_keep_the_server_message() {
    let api = FakeApi::new("at1", RefreshMode::Succeed("at2".into()));
    let (server, base_url) = api.spawn().await;
    let (_kv, store) = memory_token_store();
    seed_session(&store, "at1", "rt1").await;
    let client = build_client(&base_url, store, SessionEvents::new());

    let err = client.get::<Value>("/vehicles/unknown").await.unwrap_err();
    assert!(matches!(err, ClientError::Http(ref f) if f.status == http::StatusCode::NOT_FOUND));
    assert_eq!(api.refresh_count(), 0);

    server.abort();
}
