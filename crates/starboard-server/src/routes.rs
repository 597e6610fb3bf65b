use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio_util::task::TaskTracker;
use tracing::error;

use starboard_engine::{EngineError, EventReactor};
use starboard_types::CommunityId;
use starboard_types::api::{BoardChannelRequest, BoardStatusResponse, ErrorResponse};
use starboard_types::events::PlatformEvent;
use starboard_types::models::BoardChannel;

#[derive(Clone)]
pub struct AppState {
    pub reactor: Arc<EventReactor>,
    /// In-flight event tasks, drained on shutdown.
    pub tasks: TaskTracker,
}

pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::AlreadyEnabled(_) | EngineError::BoardInUse(_) => StatusCode::CONFLICT,
            EngineError::NotEnabled(_) => StatusCode::NOT_FOUND,
            EngineError::Store(_) => StatusCode::BAD_GATEWAY,
            _ => {
                error!("Request failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

/// Accept a platform event and process it in the background.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<PlatformEvent>,
) -> StatusCode {
    let reactor = state.reactor.clone();
    state.tasks.spawn(async move {
        reactor.dispatch(event).await;
    });
    StatusCode::ACCEPTED
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
) -> Result<Json<BoardStatusResponse>, ApiError> {
    let board = state
        .reactor
        .board(community_id)
        .await
        .ok_or(EngineError::NotEnabled(community_id))?;
    Ok(Json(status(&state, board).await))
}

pub async fn enable_board(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(req): Json<BoardChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.reactor.enable(community_id, req.channel_id).await?;
    Ok((StatusCode::CREATED, Json(status(&state, board).await)))
}

pub async fn reconfigure_board(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(req): Json<BoardChannelRequest>,
) -> Result<Json<BoardStatusResponse>, ApiError> {
    let board = state.reactor.reconfigure(community_id, req.channel_id).await?;
    Ok(Json(status(&state, board).await))
}

pub async fn disable_board(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
) -> Result<StatusCode, ApiError> {
    state.reactor.disable(community_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(state: &AppState, board: BoardChannel) -> BoardStatusResponse {
    BoardStatusResponse {
        community_id: board.community_id,
        channel_id: board.channel_id,
        threshold: state.reactor.threshold(board.community_id).await,
    }
}
