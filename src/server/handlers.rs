//! HTTP handlers for sessions, messages and chat turns

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::error::ApiResult;
use super::types::{
    CreateSessionResponse, SaveMessageRequest, SendMessageRequest, SessionMessagesResponse,
    StatusResponse, UpdateSessionRequest,
};
use super::validation::{
    validate_color, validate_message, validate_name, validate_role, validate_session_id,
};
use super::AppState;
use crate::chat::relay::TurnOutcome;
use crate::store::{Session, SessionUpdate, StoredMessage};

/// Health check and status endpoint
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        model: state.relay.provider().model().to_string(),
        database: state.store.health_check().await.is_ok(),
    })
}

pub async fn create_session_handler(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<CreateSessionResponse>)> {
    let session = state.store.create_session().await?;
    info!(session_id = %session.session_id, "Created session");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.session_id,
        }),
    ))
}

/// All sessions as a bare array, most recently updated first
pub async fn list_sessions_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.store.list_sessions().await?))
}

pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Session>> {
    validate_session_id(&session_id)?;
    Ok(Json(state.store.get_session(&session_id).await?))
}

pub async fn update_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<UpdateSessionRequest>, JsonRejection>,
) -> ApiResult<Json<Session>> {
    validate_session_id(&session_id)?;
    let Json(request) = payload?;

    let update = SessionUpdate {
        name: request.new_name.as_deref().map(validate_name).transpose()?,
        color: request.new_color.as_deref().map(validate_color).transpose()?,
    };

    let session = state.store.update_session(&session_id, &update).await?;
    Ok(Json(session))
}

pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    validate_session_id(&session_id)?;

    // Waits for a turn in flight on this session to finish first
    state
        .relay
        .locks()
        .run_exclusive(&session_id, state.store.delete_session(&session_id))
        .await?;

    info!(session_id = %session_id, "Deleted session");
    Ok(StatusCode::NO_CONTENT)
}

/// Full history, oldest first. Unknown sessions have no messages.
pub async fn get_messages_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionMessagesResponse>> {
    validate_session_id(&session_id)?;
    let messages = state.store.get_session_messages(&session_id).await?;

    Ok(Json(SessionMessagesResponse {
        session_id,
        messages,
    }))
}

pub async fn save_message_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SaveMessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StoredMessage>)> {
    validate_session_id(&session_id)?;
    let Json(request) = payload?;
    let role = validate_role(&request.role)?;
    let content = validate_message("content", &request.content)?;

    let store = &state.store;
    let message = state
        .relay
        .locks()
        .run_exclusive(&session_id, async {
            store.ensure_session(&session_id).await?;
            store.append_message(&session_id, role, &content, None).await
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn send_message_handler(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<Json<TurnOutcome>> {
    let Json(request) = payload?;
    if let Some(session_id) = &request.session_id {
        validate_session_id(session_id)?;
    }
    let message = validate_message("message", &request.message)?;

    let outcome = state
        .relay
        .handle_turn(request.session_id.as_deref(), &message)
        .await?;
    Ok(Json(outcome))
}
