#![allow(
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    clippy::doc_markdown
)]

//! Session Server Example
//!
//! A small Axum server that keeps a visit counter in a cookie session and
//! exposes the same session over a header for API clients.
//!
//! Run with: `cargo run --example session_server`
//!
//! Test endpoints:
//!   curl -c cookies.txt -b cookies.txt http://localhost:8080/visit
//!   curl -b cookies.txt http://localhost:8080/ttl
//!   curl -X POST -b cookies.txt -c cookies.txt http://localhost:8080/logout
//!
//!   TOKEN=$(curl -s -X POST http://localhost:8080/api/login)
//!   curl -H "token: $TOKEN" http://localhost:8080/api/me

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use sessionhub::events::listeners::LoggingListener;
use sessionhub::{Hub, HubConfig, InMemorySessionStore, SecurityKey, SessionError};

type AppHub = Hub<InMemorySessionStore>;

fn status(err: &SessionError) -> StatusCode {
    if err.is_tampered() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn visit(
    State(hub): State<AppHub>,
    headers: HeaderMap,
) -> Result<(HeaderMap, String), StatusCode> {
    let session = hub.resolve_cookie(&headers).await.map_err(|e| status(&e))?;

    let visits = session
        .get("visits")
        .await
        .map_err(|e| status(&e))?
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    session
        .set("visits", &visits.to_string())
        .await
        .map_err(|e| status(&e))?;

    Ok((session.response_headers(), format!("visits: {visits}\n")))
}

async fn ttl(
    State(hub): State<AppHub>,
    headers: HeaderMap,
) -> Result<(HeaderMap, String), StatusCode> {
    let session = hub.resolve_cookie(&headers).await.map_err(|e| status(&e))?;
    let remaining = session.remaining_ttl().await.map_err(|e| status(&e))?;

    let body = match remaining {
        Some(left) => format!("ttl: {}s\n", left.num_seconds()),
        None => "ttl: none\n".to_owned(),
    };
    Ok((session.response_headers(), body))
}

async fn logout(State(hub): State<AppHub>, headers: HeaderMap) -> Result<HeaderMap, StatusCode> {
    let session = hub.resolve_cookie(&headers).await.map_err(|e| status(&e))?;
    session.destroy().await.map_err(|e| status(&e))?;
    Ok(session.response_headers())
}

async fn api_login(State(hub): State<AppHub>) -> Result<String, StatusCode> {
    let token = hub.new_session_id().await.map_err(|e| status(&e))?;
    let session = hub
        .session_by_id(&token)
        .await
        .map_err(|e| status(&e))?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    session
        .set("user", "demo")
        .await
        .map_err(|e| status(&e))?;
    Ok(token)
}

async fn api_me(State(hub): State<AppHub>, headers: HeaderMap) -> Result<String, StatusCode> {
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let session = hub
        .session_by_id(token)
        .await
        .map_err(|e| status(&e))?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let user = session.get("user").await.map_err(|e| status(&e))?;

    Ok(format!("user: {}\n", user.unwrap_or_default()))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // In production, load a 32-byte secret from the environment
    let security_key = std::env::var("SESSION_SECRET")
        .map(SecurityKey::new)
        .unwrap_or_else(|_| SecurityKey::temporary());

    let mut config = HubConfig::new(security_key);
    config.cookie.secure = false; // Set to true in production with HTTPS

    let hub = Hub::builder(InMemorySessionStore::new(), config)
        .listener(LoggingListener::new())
        .build()
        .expect("invalid session configuration");

    let app = Router::new()
        .route("/visit", get(visit))
        .route("/ttl", get(ttl))
        .route("/logout", post(logout))
        .route("/api/login", post(api_login))
        .route("/api/me", get(api_me))
        .with_state(hub);

    println!("Starting session server on http://localhost:8080");
    println!();
    println!("Endpoints:");
    println!("  GET  /visit     - Count visits in a cookie session");
    println!("  GET  /ttl       - Show remaining session lifetime");
    println!("  POST /logout    - Destroy the cookie session");
    println!("  POST /api/login - Issue a token for header clients");
    println!("  GET  /api/me    - Read the session named by the `token` header");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    axum::serve(listener, app).await
}
