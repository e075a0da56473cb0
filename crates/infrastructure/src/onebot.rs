//! OneBot v11 HTTP API 客户端
//!
//! 每个动作都是 `POST {api_base_url}/{action}`，参数放在 JSON 请求体中，
//! 响应统一为 `{"status": "ok|failed", "retcode": 0, "data": ...}`。

use application::{
    DeleteOutcome, GatewayError, HistoryProvider, MessageDeleter, MessageSender,
    RETCODE_ALREADY_RECALLED,
};
use async_trait::async_trait;
use config::OneBotConfig;
use domain::{ChatTarget, GroupId, HistoryEntry, MessageId, MessageSegment, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const ACTION_SEND_GROUP_MSG: &str = "send_group_msg";
const ACTION_SEND_PRIVATE_MSG: &str = "send_private_msg";
const ACTION_DELETE_MSG: &str = "delete_msg";
const ACTION_GET_GROUP_MSG_HISTORY: &str = "get_group_msg_history";

/// 动作响应
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    data: Value,
    #[serde(default, alias = "msg")]
    message: String,
    #[serde(default)]
    wording: String,
}

impl ActionResponse {
    fn is_ok(&self) -> bool {
        self.retcode == 0 && self.status != "failed"
    }

    fn error_message(&self) -> String {
        if !self.wording.is_empty() {
            self.wording.clone()
        } else if !self.message.is_empty() {
            self.message.clone()
        } else {
            self.status.clone()
        }
    }
}

#[derive(Clone)]
pub struct OneBotHttpClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl OneBotHttpClient {
    pub fn new(config: &OneBotConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Transport(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// 调用动作并返回 `data` 字段
    pub async fn call_action<P: Serialize + ?Sized>(
        &self,
        action: &str,
        params: &P,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}/{}", self.base_url, action);
        let mut request = self.client.post(&url).json(params);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("{}: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "{}: HTTP {}",
                action, status
            )));
        }

        let body: ActionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("{}: {}", action, e)))?;

        if !body.is_ok() {
            return Err(GatewayError::action_failed(
                action,
                body.retcode,
                body.error_message(),
            ));
        }

        debug!(action, "协议端动作调用成功");
        Ok(body.data)
    }
}

#[async_trait]
impl MessageSender for OneBotHttpClient {
    async fn send_message(
        &self,
        target: ChatTarget,
        message: Vec<MessageSegment>,
    ) -> Result<MessageId, GatewayError> {
        let data = match target {
            ChatTarget::Group(group_id) => {
                self.call_action(
                    ACTION_SEND_GROUP_MSG,
                    &json!({ "group_id": group_id.0, "message": message }),
                )
                .await?
            }
            ChatTarget::Private(user_id) => {
                self.call_action(
                    ACTION_SEND_PRIVATE_MSG,
                    &json!({ "user_id": user_id.0, "message": message }),
                )
                .await?
            }
        };

        // 没有 message_id 时返回 0，由调用方决定如何处理
        Ok(data
            .get("message_id")
            .and_then(lenient_i64)
            .map(MessageId)
            .unwrap_or(MessageId::NONE))
    }
}

#[async_trait]
impl MessageDeleter for OneBotHttpClient {
    async fn delete_message(&self, message_id: MessageId) -> Result<DeleteOutcome, GatewayError> {
        match self
            .call_action(ACTION_DELETE_MSG, &json!({ "message_id": message_id.0 }))
            .await
        {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(GatewayError::ActionFailed { retcode, .. })
                if retcode == RETCODE_ALREADY_RECALLED =>
            {
                Ok(DeleteOutcome::AlreadyRecalled)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl HistoryProvider for OneBotHttpClient {
    async fn group_history(
        &self,
        group_id: GroupId,
        count: u32,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        let data = self
            .call_action(
                ACTION_GET_GROUP_MSG_HISTORY,
                &json!({ "group_id": group_id.0, "count": count }),
            )
            .await?;

        let messages = match data.get("messages") {
            Some(Value::Array(messages)) => messages,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(other) => {
                return Err(GatewayError::InvalidResponse(format!(
                    "{}: messages 不是数组: {}",
                    ACTION_GET_GROUP_MSG_HISTORY, other
                )))
            }
        };

        Ok(messages.iter().map(history_entry).collect())
    }
}

fn history_entry(raw: &Value) -> HistoryEntry {
    let message_id = raw
        .get("message_id")
        .and_then(lenient_i64)
        .map(MessageId)
        .unwrap_or(MessageId::NONE);
    let sender_id = raw
        .get("sender")
        .and_then(|sender| sender.get("user_id"))
        .and_then(lenient_i64)
        .map(UserId);
    let time = raw.get("time").and_then(lenient_i64).unwrap_or(0);

    HistoryEntry {
        message_id,
        sender_id,
        time,
    }
}

/// 不同协议端实现会把数字字段返回成字符串
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_history_entries_leniently() {
        let entry = history_entry(&json!({
            "message_id": "123",
            "time": 1700000000,
            "sender": {"user_id": 42, "nickname": "bot"}
        }));
        assert_eq!(entry, HistoryEntry::new(123, Some(UserId(42)), 1700000000));

        let entry = history_entry(&json!({"sender": {}}));
        assert_eq!(entry, HistoryEntry::new(0, None, 0));
    }

    #[test]
    fn response_status_failed_is_error() {
        let body: ActionResponse =
            serde_json::from_value(json!({"status": "failed", "retcode": 0, "msg": "x"})).unwrap();
        assert!(!body.is_ok());
        assert_eq!(body.error_message(), "x");
    }
}
