// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatroom, message and task handlers.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use murmur_agent::{ChatroomDetail, MessageStatusView, SubmitOutcome, TaskStatusView};
use murmur_core::types::{
    Chatroom, ChatroomId, ChatroomPage, ChatroomUpdate, Message, MessageId, MessagePage,
    Principal, TaskId,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ApiResponse, ApiResult};
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct CreateChatroomRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /v1/chatroom
pub async fn create_chatroom(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateChatroomRequest>,
) -> ApiResult<impl IntoResponse> {
    let chatroom = state
        .services
        .chatrooms
        .create(&principal, &body.name, body.description.as_deref())
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Chatroom created successfully", chatroom),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListChatroomsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub use_cache: Option<bool>,
}

/// GET /v1/chatroom
pub async fn list_chatrooms(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListChatroomsQuery>,
) -> ApiResult<Json<ApiResponse<ChatroomPage>>> {
    let page = state
        .services
        .chatrooms
        .list(
            &principal,
            query.page,
            query.per_page,
            query.use_cache.unwrap_or(true),
        )
        .await?;
    Ok(ApiResponse::ok("Chatrooms retrieved successfully", page))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub limit: Option<u32>,
}

/// GET /v1/chatroom/{id}
pub async fn get_chatroom(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChatroomId>,
    Query(query): Query<DetailQuery>,
) -> ApiResult<Json<ApiResponse<ChatroomDetail>>> {
    let detail = state
        .services
        .chatrooms
        .detail(&principal, id, query.limit)
        .await?;
    Ok(ApiResponse::ok("Chatroom retrieved successfully", detail))
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateChatroomRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// PUT /v1/chatroom/{id}
pub async fn update_chatroom(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChatroomId>,
    Json(body): Json<UpdateChatroomRequest>,
) -> ApiResult<Json<ApiResponse<Chatroom>>> {
    let update = ChatroomUpdate {
        name: body.name,
        description: body.description,
    };
    let chatroom = state
        .services
        .chatrooms
        .update(&principal, id, update)
        .await?;
    Ok(ApiResponse::ok("Chatroom updated successfully", chatroom))
}

/// DELETE /v1/chatroom/{id}
pub async fn delete_chatroom(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChatroomId>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.services.chatrooms.delete(&principal, id).await?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Chatroom deleted successfully".into(),
        data: None,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Body of a synchronously answered message.
#[derive(Debug, Serialize)]
pub struct InlineReply {
    pub user_message: Message,
    pub ai_message: Option<Message>,
    /// Seconds.
    pub processing_time: Option<f64>,
    pub model: Option<String>,
}

/// Body of a message whose reply is being generated in the background.
#[derive(Debug, Serialize)]
pub struct DeferredReply {
    pub user_message: Message,
    pub task_id: TaskId,
    pub status: &'static str,
}

/// POST /v1/chatroom/{id}/message
pub async fn send_message(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChatroomId>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<Response> {
    let outcome = state
        .services
        .pipeline
        .submit(&principal, id, &body.content)
        .await?;
    let response = match outcome {
        SubmitOutcome::Inline {
            user_message,
            reply,
        } => {
            let (ai_message, processing_time, model) = match reply {
                Some(reply) => (
                    Some(reply.message),
                    Some(reply.processing_time.as_secs_f64()),
                    Some(reply.model),
                ),
                None => (None, None, None),
            };
            (
                StatusCode::CREATED,
                ApiResponse::ok(
                    "Message sent successfully",
                    InlineReply {
                        user_message,
                        ai_message,
                        processing_time,
                        model,
                    },
                ),
            )
                .into_response()
        }
        SubmitOutcome::Deferred {
            user_message,
            task_id,
        } => (
            StatusCode::ACCEPTED,
            ApiResponse::ok(
                "Message received. AI response is being generated.",
                DeferredReply {
                    user_message,
                    task_id,
                    status: "processing",
                },
            ),
        )
            .into_response(),
    };
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub include_pending: bool,
}

/// GET /v1/chatroom/{id}/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<ChatroomId>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<ApiResponse<MessagePage>>> {
    let page = state
        .services
        .pipeline
        .list_messages(
            &principal,
            id,
            query.page,
            query.per_page,
            query.include_pending,
        )
        .await?;
    Ok(ApiResponse::ok("Messages retrieved successfully", page))
}

/// GET /v1/message/{id}/status
pub async fn get_message_status(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<MessageId>,
) -> ApiResult<Json<ApiResponse<MessageStatusView>>> {
    let view = state
        .services
        .pipeline
        .message_status(&principal, id)
        .await?;
    Ok(ApiResponse::ok("Message status retrieved successfully", view))
}

/// GET /v1/tasks/{task_id}
pub async fn get_task_status(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Json<ApiResponse<TaskStatusView>>> {
    let view = state
        .services
        .pipeline
        .task_status(&principal, &task_id)
        .await?;
    Ok(ApiResponse::ok("Task status retrieved successfully", view))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_missing_and_null_description() {
        let absent: UpdateChatroomRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateChatroomRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateChatroomRequest =
            serde_json::from_str(r#"{"description":"notes"}"#).unwrap();
        assert_eq!(set.description, Some(Some("notes".into())));
    }
}
