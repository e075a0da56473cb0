//! 协议端抽象
//!
//! 核心逻辑只通过这几个 trait 访问协议端：发送消息、撤回消息、查询群历史。
//! 具体实现位于 infrastructure（OneBot HTTP 客户端）。

use async_trait::async_trait;
use domain::{ChatTarget, GroupId, HistoryEntry, MessageId, MessageSegment};
use thiserror::Error;

/// 撤回超时或消息已被撤回时协议端返回的 retcode
pub const RETCODE_ALREADY_RECALLED: i64 = 1200;

/// 撤回调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 撤回成功
    Deleted,
    /// 消息已被撤回或超过可撤回时间，不视为错误
    AlreadyRecalled,
}

/// 协议端调用错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("协议端动作 {action} 失败 (retcode={retcode}): {message}")]
    ActionFailed {
        action: String,
        retcode: i64,
        message: String,
    },

    #[error("协议端通信失败: {0}")]
    Transport(String),

    #[error("协议端响应无法解析: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn action_failed(
        action: impl Into<String>,
        retcode: i64,
        message: impl Into<String>,
    ) -> Self {
        Self::ActionFailed {
            action: action.into(),
            retcode,
            message: message.into(),
        }
    }
}

/// 发送消息
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// 发送到群聊或私聊，返回协议端分配的消息 ID
    async fn send_message(
        &self,
        target: ChatTarget,
        message: Vec<MessageSegment>,
    ) -> Result<MessageId, GatewayError>;
}

/// 撤回消息
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageDeleter: Send + Sync {
    async fn delete_message(&self, message_id: MessageId) -> Result<DeleteOutcome, GatewayError>;
}

/// 查询群消息历史
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// 可能返回少于 `count` 条
    async fn group_history(
        &self,
        group_id: GroupId,
        count: u32,
    ) -> Result<Vec<HistoryEntry>, GatewayError>;
}
