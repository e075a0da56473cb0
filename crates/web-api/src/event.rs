//! OneBot v11 上报事件（HTTP POST 方式）

use domain::{ChatTarget, GroupId, MessageSegment, UserId};
use serde::Deserialize;

/// 上报事件，只解析插件用到的字段
#[derive(Debug, Clone, Deserialize)]
pub struct OneBotEvent {
    pub post_type: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub self_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub message: EventMessage,
    #[serde(default)]
    pub sender: Option<EventSender>,
}

/// 消息可能以段数组或字符串形式上报
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventMessage {
    Segments(Vec<MessageSegment>),
    Text(String),
}

impl Default for EventMessage {
    fn default() -> Self {
        EventMessage::Segments(Vec::new())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSender {
    #[serde(default)]
    pub user_id: Option<i64>,
    /// 群聊中为 owner / admin / member
    #[serde(default)]
    pub role: Option<String>,
}

impl OneBotEvent {
    pub fn is_message(&self) -> bool {
        self.post_type == "message"
    }

    /// 回复目标：群消息回到群里，私聊回给发送者
    pub fn chat_target(&self) -> Option<ChatTarget> {
        match self.message_type.as_deref()? {
            "group" => self.group_id.map(|id| ChatTarget::Group(GroupId(id))),
            "private" => self.sender_id().map(ChatTarget::Private),
            _ => None,
        }
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.user_id
            .or_else(|| self.sender.as_ref().and_then(|s| s.user_id))
            .map(UserId)
    }

    /// 群主和群管理员视为管理员
    pub fn sender_is_group_admin(&self) -> bool {
        matches!(
            self.sender.as_ref().and_then(|s| s.role.as_deref()),
            Some("owner") | Some("admin")
        )
    }

    /// 机器人自己发出的消息不作为指令处理
    pub fn is_from_self(&self) -> bool {
        matches!((self.user_id, self.self_id), (Some(user), Some(me)) if user == me)
    }

    pub fn segments(&self) -> Vec<MessageSegment> {
        match &self.message {
            EventMessage::Segments(segments) => segments.clone(),
            EventMessage::Text(text) => vec![MessageSegment::text(text.clone())],
        }
    }
}
