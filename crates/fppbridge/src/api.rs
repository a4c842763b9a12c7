use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::engine::IntegrationError;
use crate::engine::MediaPlayerCommand;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    engine: Arc<Engine>,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/media_players
#[tracing::instrument(skip(state))]
async fn list_media_players(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine.state_snapshot();
    (StatusCode::OK, Json(snapshot.media_players.clone()))
}

/// Handler for GET /v1/media_players/{entity_id}
#[tracing::instrument(skip(state))]
async fn get_media_player(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> axum::response::Response {
    let snapshot = state.engine.state_snapshot();
    match snapshot.media_players.get(&entity_id) {
        Some(player) => (StatusCode::OK, Json(player.clone())).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Unknown media player: {}", entity_id),
        ),
    }
}

/// Handler for POST /v1/media_players/{entity_id}/command
///
/// Accepted commands are queued; their effect shows up in the player state.
#[tracing::instrument(skip(state))]
async fn command_media_player(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
    Json(command): Json<MediaPlayerCommand>,
) -> axum::response::Response {
    match state.engine.send_media_player_command(entity_id, command) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e @ IntegrationError::UnknownEntity(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/media_players", get(list_media_players))
        .route("/v1/media_players/:entity_id", get(get_media_player))
        .route(
            "/v1/media_players/:entity_id/command",
            post(command_media_player),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// This function will bind to the specified address and serve the API endpoints.
/// It will run until the provided shutdown signal is triggered.
///
/// # Arguments
/// * `listen` - The IP address to listen on (e.g., "127.0.0.1")
/// * `port` - The port to listen on (e.g., 8565)
/// * `engine` - Engine to read state from and send commands through
/// * `shutdown_rx` - A oneshot receiver that will trigger graceful shutdown
///
/// # Returns
/// Returns Ok(()) if the server shuts down gracefully, or an error if startup fails
pub async fn serve(
    listen: String,
    port: u16,
    engine: Arc<Engine>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState { version, engine });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn router() -> Router {
        create_router(Arc::new(AppState {
            version: "test",
            engine: Arc::new(Engine::new()),
        }))
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = router()
            .oneshot(Request::get("/v1/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_info_reports_version() {
        let resp = router()
            .oneshot(Request::get("/v1/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["version"], "test");
    }

    #[tokio::test]
    async fn test_list_media_players_empty() {
        let resp = router()
            .oneshot(
                Request::get("/v1/media_players")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unknown_media_player_is_404() {
        let resp = router()
            .oneshot(
                Request::get("/v1/media_players/media_player.nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_command_for_unknown_media_player_is_404() {
        let resp = router()
            .oneshot(
                Request::post("/v1/media_players/media_player.nope/command")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"command": "play"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_command_rejected() {
        let resp = router()
            .oneshot(
                Request::post("/v1/media_players/media_player.nope/command")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"command": "shuffle"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
        assert_ne!(resp.status(), StatusCode::NOT_FOUND);
    }
}
