use std::sync::Arc;

use application::{AutoRecallPlugin, InterceptOutcome, MessageSender};
use domain::{ChatTarget, MessageId, MessageSegment};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub plugin: Arc<AutoRecallPlugin>,
    pub sender: Arc<dyn MessageSender>,
}

/// 一条机器人消息的投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum Delivery {
    /// 插件代发并安排了撤回
    Scheduled { message_id: MessageId },
    /// 插件不处理，由宿主直接发送
    Direct { message_id: MessageId },
    /// 插件代发失败或没有拿到消息 ID
    Lost,
}

impl AppState {
    pub fn new(plugin: Arc<AutoRecallPlugin>, sender: Arc<dyn MessageSender>) -> Self {
        Self { plugin, sender }
    }

    /// 发送机器人消息：先交给拦截钩子，钩子不处理时再直接发送
    pub async fn deliver(
        &self,
        target: ChatTarget,
        mut message: Vec<MessageSegment>,
    ) -> Result<Delivery, ApiError> {
        match self.plugin.intercept_outgoing(target, &mut message).await {
            InterceptOutcome::Scheduled { message_id } => Ok(Delivery::Scheduled { message_id }),
            InterceptOutcome::SendFailed | InterceptOutcome::MissingMessageId => Ok(Delivery::Lost),
            InterceptOutcome::Skipped => {
                let message_id = self.sender.send_message(target, message).await?;
                Ok(Delivery::Direct { message_id })
            }
        }
    }

    pub async fn reply(&self, target: ChatTarget, text: String) -> Result<Delivery, ApiError> {
        self.deliver(target, vec![MessageSegment::text(text)]).await
    }
}
