//! End-to-end middleware tests: a router with session middleware, driven
//! through `tower::ServiceExt::oneshot`, persisting to a `MemoryStore`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    response::Response,
    routing::get,
};
use stowage_session::{
    MemoryStore, Session, SessionCodec, SessionConfig, SessionKey, SessionState, SessionStore,
    session_middleware,
};
use tower::ServiceExt;

async fn visits(session: Session) -> String {
    let visits: u32 = session.get("visits").await.unwrap_or(0) + 1;
    session.insert("visits", visits).await.unwrap();
    visits.to_string()
}

async fn untouched(_session: Session) -> &'static str {
    "ok"
}

fn app(state: SessionState) -> Router {
    Router::new()
        .route("/visits", get(visits))
        .route("/untouched", get(untouched))
        .layer(middleware::from_fn_with_state(state, session_middleware))
}

fn test_state(store: Arc<MemoryStore>) -> SessionState {
    SessionState::new(
        store,
        SessionCodec::new(SessionCodec::generate_key()),
        SessionConfig::default(),
    )
}

/// The `name=value` pair from the response's Set-Cookie header, if any.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(|pair| pair.trim().to_string())
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_session_survives_across_requests() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = app(state);

    // First visit: new session, counter starts at 1, cookie issued.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/visits").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("first response should set a cookie");
    assert_eq!(body_string(response).await, "1");
    assert_eq!(store.len(), 1);

    // Replay the cookie: same session, counter advances.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/visits")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = session_cookie(&response).expect("persist should refresh the cookie");
    assert_eq!(body_string(response).await, "2");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/visits")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "3");

    // Still a single row: replays update, they do not insert.
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_cookie_round_trips_to_stored_row() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let codec = state.codec.clone();
    let app = app(state);

    let response = app
        .oneshot(Request::builder().uri("/visits").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = session_cookie(&response).unwrap();

    // Unseal the cookie ourselves and look the row up directly.
    let sealed = cookie.strip_prefix("session=").unwrap();
    let key = SessionKey::parse(&codec.open("session", sealed).unwrap()).unwrap();

    // The row's payload is sealed too; open it to see the values.
    let data = store.load(&key).await.unwrap().expect("row should exist");
    let plain = codec.open("session", &data).unwrap();
    assert_ne!(data, plain);
    assert!(plain.contains("visits"));
}

#[tokio::test]
async fn test_untouched_session_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let app = app(test_state(store.clone()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/untouched")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_tampered_cookie_degrades_to_new_session() {
    let store = Arc::new(MemoryStore::new());
    let app = app(test_state(store.clone()));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/visits").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = session_cookie(&response).unwrap();

    // Flip the last character of the sealed value.
    let mut tampered = cookie.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/visits")
                .header(header::COOKIE, tampered.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Not an error: the counter restarts in a fresh session.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "1");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_foreign_cookie_degrades_to_new_session() {
    let store = Arc::new(MemoryStore::new());
    let app = app(test_state(store.clone()));

    // Sealed under a key this server has never seen.
    let foreign = SessionCodec::new(SessionCodec::generate_key());
    let sealed = foreign.seal("session", "some-session-key").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/visits")
                .header(header::COOKIE, format!("session={sealed}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "1");
}

#[tokio::test]
async fn test_independent_clients_get_independent_sessions() {
    let store = Arc::new(MemoryStore::new());
    let app = app(test_state(store.clone()));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/visits").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "1");
    }

    assert_eq!(store.len(), 2);
}
