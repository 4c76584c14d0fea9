//! HTTP surface of the hub
//!
//! - `POST /.well-known/tidings`: publish an update
//! - `GET /.well-known/tidings`: subscribe as a text/event-stream
//! - `GET /health`
//!
//! Subscriber tokens arrive as a bearer token or in the authorization
//! cookie; publish tokens must be bearer. Every response except CORS
//! preflight carries the discovery Link header.

use crate::error::Error;
use crate::hub::HubRegistry;
use crate::web::{add_discovery_link, AUTHORIZATION_COOKIE_NAME};

use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use futures::stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

pub const WELL_KNOWN_PATH: &str = "/.well-known/tidings";

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub hubs: Arc<HubRegistry>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(WELL_KNOWN_PATH, post(publish_handler).get(subscribe_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    topic: Vec<String>,
    data: String,
    #[serde(default)]
    private: bool,
    /// Hub name; the default hub when omitted.
    hub: Option<String>,
}

async fn publish_handler(State(state): State<AppState>, request: Request) -> Response {
    let headers = request.headers().clone();

    let Some(token) = bearer_token(&headers) else {
        return error_response(&Error::Auth("missing bearer token".to_string()));
    };

    let body = match publish_request(request).await {
        Ok(body) => body,
        Err(err) => return error_response(&err),
    };

    let hub = match state.hubs.get(body.hub.as_deref()) {
        Ok(hub) => hub,
        Err(err) => return error_response(&err),
    };

    match hub.publish(&token, &body.topic, body.data.into_bytes(), body.private) {
        Ok(id) => {
            debug!(id = %id, "update published");
            let mut response = (StatusCode::OK, id.to_string()).into_response();
            add_discovery_link(response.headers_mut(), &Method::POST, &headers, hub.public_url());
            response
        }
        Err(err) => error_response(&err),
    }
}

/// Publications arrive either form-encoded (repeated `topic` keys, as the
/// event-stream protocol posts them) or as JSON.
async fn publish_request(request: Request) -> crate::error::Result<PublishRequest> {
    let form_encoded = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/x-www-form-urlencoded"));

    if form_encoded {
        let Form(body) = Form::<PublishRequest>::from_request(request, &())
            .await
            .map_err(|err| Error::InvalidArgument(err.to_string()))?;
        Ok(body)
    } else {
        let Json(body) = Json::<PublishRequest>::from_request(request, &())
            .await
            .map_err(|err| Error::InvalidArgument(err.to_string()))?;
        Ok(body)
    }
}

async fn subscribe_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let mut topics = Vec::new();
    let mut hub_name = None;
    let mut last_event_id = header_value(&headers, "last-event-id");

    for (key, value) in params {
        match key.as_str() {
            "topic" => topics.push(value),
            "hub" => hub_name = Some(value),
            "lastEventID" => last_event_id = Some(value),
            _ => {}
        }
    }

    let Some(token) = bearer_token(&headers).or_else(|| cookie_token(&headers)) else {
        return error_response(&Error::Auth("missing subscriber token".to_string()));
    };

    let hub = match state.hubs.get(hub_name.as_deref()) {
        Ok(hub) => hub.clone(),
        Err(err) => return error_response(&err),
    };

    let subscriber = match hub.subscribe(&token, &topics, last_event_id.as_deref()) {
        Ok(subscriber) => subscriber,
        Err(err) => return error_response(&err),
    };

    debug!(subscription_id = %subscriber.id(), "event stream opened");

    let events = stream::unfold(subscriber, |mut subscriber| async move {
        let update = subscriber.next().await?;
        let event = Event::default()
            .id(update.id.to_string())
            .data(String::from_utf8_lossy(&update.payload).into_owned());
        Some((Ok::<_, Infallible>(event), subscriber))
    });

    let mut response = Sse::new(events).keep_alive(KeepAlive::default()).into_response();
    add_discovery_link(response.headers_mut(), &Method::GET, &headers, hub.public_url());
    response
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == AUTHORIZATION_COOKIE_NAME).then(|| value.to_string())
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_string)
}

fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::StaleCursor { .. } => StatusCode::CONFLICT,
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, err.to_string()).into_response()
}

/// Run the HTTP server until the listener fails.
pub async fn run_server(bind_addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "hub listening");

    axum::serve(listener, app).await?;

    Ok(())
}
