// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the `/chat` API.
//!
//! Request bodies use the camelCase field names of the mini-application
//! clients. Failures are JSON `{"error": "..."}` with a status derived from
//! the error kind.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kefu_core::{AgentId, ErrorKind, KefuError, Message, MessageId, UserId};
use kefu_router::{PresenceView, PushStatus};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Confirmation text for a queued reminder.
pub const REMINDER_QUEUED: &str = "推送提醒已发送";

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`KefuError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub KefuError);

impl From<KefuError> for ApiError {
    fn from(err: KefuError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotAssigned | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::MalformedInput | ErrorKind::NotSubscribed => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let error = if self.0.is_user_visible() {
            tracing::debug!(%kind, error = %self.0, "request rejected");
            self.0.to_string()
        } else {
            tracing::error!(%kind, error = %self.0, "request failed");
            "internal server error".to_string()
        };
        (status_for(kind), Json(ErrorResponse { error })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(KefuError::MalformedInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(KefuError::MalformedInput(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(KefuError::MalformedInput(rejection.body_text()))
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Status-only acknowledgement.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

fn status(status: &'static str) -> Json<StatusResponse> {
    Json(StatusResponse { status })
}

/// Body of `POST /chat/send`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageRequest {
    pub app_id: String,
    pub open_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Body of `POST /chat/cs/send`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageRequest {
    pub user_id: UserId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Body of `POST /chat/heartbeat` and query of `GET /chat/history`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub open_id: String,
    pub app_id: String,
}

/// Body of `POST /chat/subscribe`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub open_id: String,
}

#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub status: &'static str,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome: Option<Message>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub status: &'static str,
    /// `false` when the message was user-sent and left unchanged.
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// Agents with a registered live channel.
    pub live_agents: usize,
}

/// POST /chat/send
pub async fn post_user_message(
    State(state): State<GatewayState>,
    body: Result<Json<UserMessageRequest>, JsonRejection>,
) -> ApiResult<SentResponse> {
    let Json(body) = body?;
    let receipt = state
        .router
        .route_user_message(&body.app_id, &body.open_id, &body.content, body.image_url)
        .await?;
    Ok(Json(SentResponse {
        status: "sent",
        message: receipt.message,
        welcome: receipt.welcome,
    }))
}

/// POST /chat/cs/send
pub async fn post_agent_message(
    State(state): State<GatewayState>,
    body: Result<Json<AgentMessageRequest>, JsonRejection>,
) -> ApiResult<SentResponse> {
    let Json(body) = body?;
    let message = state
        .router
        .route_agent_message(body.agent_id, body.user_id, &body.content, body.image_url)
        .await?;
    Ok(Json(SentResponse {
        status: "sent",
        message,
        welcome: None,
    }))
}

/// POST /chat/heartbeat
pub async fn post_heartbeat(
    State(state): State<GatewayState>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(body) = body?;
    state.router.heartbeat(&body.app_id, &body.open_id).await?;
    Ok(status("ok"))
}

/// POST /chat/subscribe
pub async fn post_subscribe(
    State(state): State<GatewayState>,
    body: Result<Json<SubscribeRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(body) = body?;
    state.router.subscribe(&body.open_id).await?;
    Ok(status("subscribed"))
}

/// GET /chat/history?openId=..&appId=..
pub async fn get_user_history(
    State(state): State<GatewayState>,
    query: Result<Query<UserRef>, QueryRejection>,
) -> ApiResult<Vec<Message>> {
    let Query(query) = query?;
    let messages = state
        .router
        .user_history(&query.app_id, &query.open_id)
        .await?;
    Ok(Json(messages))
}

/// GET /chat/cs/{agent_id}/user/{user_id}/messages
pub async fn get_agent_history(
    State(state): State<GatewayState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<Vec<Message>> {
    let Path((agent_id, user_id)) = path?;
    let messages = state
        .router
        .agent_history(AgentId(agent_id), UserId(user_id))
        .await?;
    Ok(Json(messages))
}

/// GET /chat/cs/{agent_id}/user/{user_id}/presence
pub async fn get_presence(
    State(state): State<GatewayState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<PresenceView> {
    let Path((agent_id, user_id)) = path?;
    let view = state
        .router
        .user_presence(AgentId(agent_id), UserId(user_id))
        .await?;
    Ok(Json(view))
}

/// POST /chat/cs/{agent_id}/user/{user_id}/push
pub async fn post_reminder(
    State(state): State<GatewayState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<NoticeResponse> {
    let Path((agent_id, user_id)) = path?;
    state
        .router
        .request_reminder(AgentId(agent_id), UserId(user_id))
        .await?;
    Ok(Json(NoticeResponse {
        message: REMINDER_QUEUED,
    }))
}

/// GET /chat/cs/{agent_id}/user/{user_id}/push-status
pub async fn get_push_status(
    State(state): State<GatewayState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<PushStatus> {
    let Path((agent_id, user_id)) = path?;
    let push_status = state
        .router
        .push_status(AgentId(agent_id), UserId(user_id))
        .await?;
    Ok(Json(push_status))
}

/// DELETE /chat/message/{id}
pub async fn delete_message(
    State(state): State<GatewayState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusResponse> {
    let Path(id) = path?;
    state.router.delete_message(MessageId(id)).await?;
    Ok(status("deleted"))
}

/// POST /chat/message/{id}/read
pub async fn post_message_read(
    State(state): State<GatewayState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<ReadResponse> {
    let Path(id) = path?;
    let updated = state.router.mark_message_read(MessageId(id)).await?;
    Ok(Json(ReadResponse {
        status: "read",
        updated,
    }))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        live_agents: state.router.registry().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_request_uses_camel_case() {
        let json = r#"{"appId": "shop", "openId": "o-1", "content": "hi", "imageUrl": "https://x/a.png"}"#;
        let req: UserMessageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.app_id, "shop");
        assert_eq!(req.open_id, "o-1");
        assert_eq!(req.image_url.as_deref(), Some("https://x/a.png"));
    }

    #[test]
    fn agent_message_request_defaults_content() {
        let json = r#"{"userId": 3, "agentId": 7, "imageUrl": "https://x/a.png"}"#;
        let req: AgentMessageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user_id, UserId(3));
        assert_eq!(req.agent_id, AgentId(7));
        assert!(req.content.is_empty());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(ErrorKind::NotAssigned), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::NotSubscribed), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Storage), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let response = ApiError(KefuError::Internal("secret detail".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"error":"something went wrong"}"#);
    }
}
