use std::sync::{Arc, Mutex};

use application::{
    AutoRecallPlugin, AutoRecallPluginDependencies, DeleteOutcome, GatewayError, HistoryProvider,
    MessageDeleter, MessageSender,
};
use async_trait::async_trait;
use axum::Router;
use config::RecallConfig;
use domain::{ChatTarget, GroupId, HistoryEntry, MessageId, MessageSegment};
use web_api::{router, AppState};

// 内存中的协议端，记录所有调用用于测试
#[derive(Default)]
pub struct FakeGateway {
    pub sent: Mutex<Vec<(ChatTarget, Vec<MessageSegment>)>>,
    pub deleted: Mutex<Vec<MessageId>>,
    pub history: Mutex<Vec<HistoryEntry>>,
    pub fail_history: Mutex<bool>,
}

impl FakeGateway {
    pub fn sent(&self) -> Vec<(ChatTarget, Vec<MessageSegment>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn set_history(&self, entries: Vec<HistoryEntry>) {
        *self.history.lock().unwrap() = entries;
    }
}

#[async_trait]
impl MessageSender for FakeGateway {
    async fn send_message(
        &self,
        target: ChatTarget,
        message: Vec<MessageSegment>,
    ) -> Result<MessageId, GatewayError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((target, message));
        Ok(MessageId(1000 + sent.len() as i64))
    }
}

#[async_trait]
impl MessageDeleter for FakeGateway {
    async fn delete_message(&self, message_id: MessageId) -> Result<DeleteOutcome, GatewayError> {
        self.deleted.lock().unwrap().push(message_id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl HistoryProvider for FakeGateway {
    async fn group_history(
        &self,
        _group_id: GroupId,
        count: u32,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        if *self.fail_history.lock().unwrap() {
            return Err(GatewayError::Transport("history unavailable".into()));
        }
        let history = self.history.lock().unwrap();
        Ok(history.iter().take(count as usize).cloned().collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<FakeGateway>,
    pub plugin: Arc<AutoRecallPlugin>,
}

pub fn build_app(config: RecallConfig) -> TestApp {
    let gateway = Arc::new(FakeGateway::default());
    let plugin = Arc::new(AutoRecallPlugin::new(
        config,
        AutoRecallPluginDependencies {
            sender: gateway.clone(),
            deleter: gateway.clone(),
            history: gateway.clone(),
        },
    ));
    let state = AppState::new(plugin.clone(), gateway.clone());

    TestApp {
        router: router(state),
        gateway,
        plugin,
    }
}
