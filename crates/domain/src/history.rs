use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, UserId};

/// 群消息历史中的一条记录（只读，由历史查询接口提供）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message_id: MessageId,
    /// 发送者，协议端偶尔会缺失
    pub sender_id: Option<UserId>,
    /// 发送时间（Unix 秒），缺失时按 0 处理
    pub time: i64,
}

impl HistoryEntry {
    pub fn new(message_id: impl Into<MessageId>, sender_id: Option<UserId>, time: i64) -> Self {
        Self {
            message_id: message_id.into(),
            sender_id,
            time,
        }
    }

    pub fn is_from(&self, user_id: UserId) -> bool {
        self.sender_id == Some(user_id)
    }
}
