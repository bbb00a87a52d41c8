//! HTTP routes
//!
//! - `/api/send/<message>` (GET) and `/api/send` (POST/PUT body): broadcast a notification
//! - `/api/messages`: plain-text history dump terminated by `End`
//! - `/api/stream`: WebSocket stream of hub frames
//! - everything else: static files from the document root

use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, Method, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use futures::{future, SinkExt, StreamExt};
use percent_encoding::percent_decode_str;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use webnotify_hub::{Hub, Session};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
}

/// Build the application router around an existing hub
///
/// Notification bodies larger than `max_body_bytes` are refused with 413.
pub fn router(hub: Arc<Hub>, doc_root: impl AsRef<Path>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/send", any(send_handler))
        .route("/send/", any(send_handler))
        .route("/send/{*message}", any(send_handler))
        .route("/messages", get(messages_handler))
        .route("/stream", get(stream_handler))
        .fallback(invalid_api_call)
        .layer(DefaultBodyLimit::max(max_body_bytes));

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(doc_root.as_ref()))
        .with_state(AppState { hub })
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(probe_shortcircuit))
}

/// Answer orchestrator liveness probes without routing or request tracing
async fn probe_shortcircuit(request: Request, next: Next) -> Response {
    let is_probe = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|agent| agent.starts_with("kube-probe"));

    if is_probe {
        return "OK".into_response();
    }
    next.run(request).await
}

async fn send_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Result<&'static str, ApiError> {
    let message = match method {
        Method::GET => message_from_path(uri.path())?,
        Method::POST | Method::PUT => {
            let bytes = body.map_err(|rejection| {
                warn!("Error reading request body: {}", rejection.body_text());
                match rejection {
                    BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
                        ApiError::BodyTooLarge
                    }
                    _ => ApiError::UnreadableBody,
                }
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        _ => return Err(ApiError::InvalidMethod),
    };

    info!("Received message: {}", message);
    state.hub.broadcast(message).await?;
    Ok("OK")
}

/// Extract the message from the path seen by the nested `/api` router (`/send/<message>`)
///
/// `/send/` carries an empty message; only a bare `/send` has none.
fn message_from_path(path: &str) -> Result<String, ApiError> {
    let rest = path.strip_prefix("/send").unwrap_or(path);
    let raw = rest.strip_prefix('/').ok_or(ApiError::MissingMessage)?;
    unescape(raw)
}

/// Query-component unescaping: `+` is a space, `%XY` a byte, result must be UTF-8
fn unescape(raw: &str) -> Result<String, ApiError> {
    let malformed = raw.match_indices('%').any(|(i, _)| {
        raw.get(i + 1..i + 3)
            .map_or(true, |hex| !hex.bytes().all(|b| b.is_ascii_hexdigit()))
    });
    if malformed {
        return Err(ApiError::Undecodable);
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ApiError::Undecodable)
}

async fn messages_handler(State(state): State<AppState>) -> String {
    let mut body = String::new();
    if let Err(e) = state.hub.dump_history(&mut body).await {
        error!("Failed to render history: {}", e);
    }
    body.push_str("End");
    body
}

async fn stream_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_failed_upgrade(|e| warn!("Could not upgrade to websocket: {}", e))
        .on_upgrade(move |socket| stream_socket(socket, state.hub))
}

async fn stream_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (sink, stream) = socket.split();

    let outbound =
        sink.with(|frame: String| future::ready(Ok::<_, axum::Error>(Message::Text(frame.into()))));
    let inbound = stream.take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))));

    match Session::new(hub, outbound).run(inbound).await {
        Ok(summary) => debug!(
            "Writes terminated for subscriber {} ({} frames)",
            summary.id, summary.frames_sent
        ),
        Err(e) => warn!("Stream closed without subscribing: {}", e),
    }
}

async fn invalid_api_call() -> ApiError {
    ApiError::InvalidApiCall
}
