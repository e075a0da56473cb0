use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use application::{recognize, CommandContext, CommandKind};
use domain::{ChatTarget, MessageSegment};

use crate::{error::ApiError, event::OneBotEvent, state::AppState, Delivery};

#[derive(Debug, Deserialize)]
struct OutgoingPayload {
    target: ChatTarget,
    message: Vec<MessageSegment>,
}

#[derive(Debug, Serialize)]
struct CommandResponse {
    command: &'static str,
    reply: String,
    #[serde(flatten)]
    delivery: Delivery,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    pending_recalls: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/onebot/event", post(handle_event))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/recalls", get(recall_status))
}

async fn health() -> &'static str {
    "ok"
}

/// 协议端上报事件入口，只处理插件指令
async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<OneBotEvent>,
) -> Result<Response, ApiError> {
    if !event.is_message() || event.is_from_self() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let (Some(target), Some(sender_id)) = (event.chat_target(), event.sender_id()) else {
        debug!(post_type = %event.post_type, "事件缺少会话信息，忽略");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let message = event.segments();
    let Some(kind) = recognize(&message) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let plugin = &state.plugin;
    let (command, reply) = match kind {
        CommandKind::BatchRecall => {
            let ctx = CommandContext {
                target,
                sender_id,
                sender_is_admin: event.sender_is_group_admin(),
                message,
            };
            ("batch_recall", plugin.batch_recall(&ctx).await)
        }
        CommandKind::RecallConfig => ("recall_config", plugin.config_summary()),
        CommandKind::TestRecall => ("test_recall", plugin.test_recall_reply()),
    };

    let delivery = state.reply(target, reply.clone()).await?;
    Ok(Json(CommandResponse {
        command,
        reply,
        delivery,
    })
    .into_response())
}

/// 其他组件发送机器人消息的入口，同样经过拦截钩子
async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<OutgoingPayload>,
) -> Result<Json<Delivery>, ApiError> {
    if payload.message.is_empty() {
        return Err(ApiError::bad_request("message 不能为空"));
    }
    let delivery = state.deliver(payload.target, payload.message).await?;
    Ok(Json(delivery))
}

async fn recall_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        pending_recalls: state.plugin.scheduler().pending(),
    })
}
