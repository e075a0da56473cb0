//! 自动撤回插件
//!
//! 宿主通过这里的几个钩子接入：
//! - 每条即将发出的机器人消息都会经过 [`AutoRecallPlugin::intercept_outgoing`]
//! - 管理员指令 `批量撤回` 由 [`AutoRecallPlugin::batch_recall`] 处理
//! - `recall_config` 返回 [`AutoRecallPlugin::config_summary`]
//! - 卸载时必须等待 [`AutoRecallPlugin::terminate`] 完成

use std::sync::Arc;

use config::RecallConfig;
use domain::{BatchRecallRequest, ChatTarget, MessageId, MessageSegment, UserId};
use tracing::{error, info, warn};

use crate::{
    command::parse_batch_recall,
    error::ApplicationError,
    gateway::{HistoryProvider, MessageDeleter, MessageSender},
    scheduler::{DrainReport, RecallScheduler},
    services::{BatchRecallService, BatchRecallServiceDependencies, HistoryFetchPolicy},
};

pub struct AutoRecallPluginDependencies {
    pub sender: Arc<dyn MessageSender>,
    pub deleter: Arc<dyn MessageDeleter>,
    pub history: Arc<dyn HistoryProvider>,
}

/// 拦截结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// 不需要处理，消息原样保留，由宿主照常发送
    Skipped,
    /// 插件已代发消息并安排了撤回
    Scheduled { message_id: MessageId },
    /// 插件代发失败，原消息已被取走
    SendFailed,
    /// 代发成功但没有拿到消息 ID，无法撤回
    MissingMessageId,
}

impl InterceptOutcome {
    /// 宿主是否还需要自己发送原消息
    pub fn needs_host_send(&self) -> bool {
        matches!(self, InterceptOutcome::Skipped)
    }
}

/// 一次指令调用的上下文
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub target: ChatTarget,
    pub sender_id: UserId,
    /// 宿主判断的管理员身份（例如群主、群管理）
    pub sender_is_admin: bool,
    pub message: Vec<MessageSegment>,
}

pub struct AutoRecallPlugin {
    config: RecallConfig,
    deps: AutoRecallPluginDependencies,
    scheduler: RecallScheduler,
    batch_recall: BatchRecallService,
}

impl AutoRecallPlugin {
    /// 创建插件，必须在 tokio 运行时内调用
    pub fn new(config: RecallConfig, deps: AutoRecallPluginDependencies) -> Self {
        let batch_recall = BatchRecallService::new(
            BatchRecallServiceDependencies {
                history: deps.history.clone(),
                deleter: deps.deleter.clone(),
            },
            HistoryFetchPolicy {
                factor: config.history_fetch_factor,
                cap: config.history_fetch_cap,
            },
        );
        info!(recall_time = config.recall_time, "自动撤回插件已加载");

        Self {
            config,
            deps,
            scheduler: RecallScheduler::new(),
            batch_recall,
        }
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &RecallScheduler {
        &self.scheduler
    }

    /// 判断该会话是否启用自动撤回
    pub fn should_recall(&self, target: &ChatTarget) -> bool {
        match target {
            ChatTarget::Private(_) => self.config.enable_private_recall,
            ChatTarget::Group(group_id) => {
                self.config.allows_group(group_id.0) && self.config.enable_group_recall
            }
        }
    }

    /// 拦截机器人即将发送的消息：取走消息自行发送，拿到消息 ID 后安排撤回
    ///
    /// 返回 [`InterceptOutcome::Skipped`] 时 `message` 保持不变。
    pub async fn intercept_outgoing(
        &self,
        target: ChatTarget,
        message: &mut Vec<MessageSegment>,
    ) -> InterceptOutcome {
        if !self.should_recall(&target) {
            return InterceptOutcome::Skipped;
        }
        if message.is_empty() {
            warn!(target = %target, "消息链为空，跳过处理");
            return InterceptOutcome::Skipped;
        }

        info!(target = %target, recall_time = self.config.recall_time, "拦截到机器人消息");
        let outgoing = std::mem::take(message);

        let message_id = match self.deps.sender.send_message(target, outgoing).await {
            Ok(message_id) => message_id,
            Err(err) => {
                error!(target = %target, error = %err, "发送消息失败");
                return InterceptOutcome::SendFailed;
            }
        };

        if !message_id.is_recallable() {
            error!(target = %target, "发送消息失败，无法获取消息ID");
            return InterceptOutcome::MissingMessageId;
        }

        info!(message_id = %message_id, "发送成功，获取到消息ID");
        self.scheduler.schedule(
            self.deps.deleter.clone(),
            message_id,
            self.config.recall_delay(),
        );
        InterceptOutcome::Scheduled { message_id }
    }

    /// 处理 `批量撤回 [@用户] 数量`，返回回复文本
    pub async fn batch_recall(&self, ctx: &CommandContext) -> String {
        if !(ctx.sender_is_admin || self.config.is_admin(ctx.sender_id.0)) {
            info!(sender_id = %ctx.sender_id, "非管理员尝试批量撤回");
            return "权限不足，仅管理员可以使用批量撤回。".to_string();
        }

        let Some(group_id) = ctx.target.group_id() else {
            return "当前仅支持群聊批量撤回。".to_string();
        };

        let command = match parse_batch_recall(&ctx.message) {
            Ok(command) => command,
            Err(err) => return err.to_string(),
        };

        let request = match BatchRecallRequest::new(
            group_id,
            command.target,
            command.count,
            self.config.batch_max_count,
        ) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "批量撤回参数无效");
                return "撤回数量必须为正整数。".to_string();
            }
        };

        match self.batch_recall.execute(&request).await {
            Ok(outcome) if outcome.is_empty() => match request.target_sender {
                Some(_) => "未找到可撤回的目标用户消息。".to_string(),
                None => "未找到可撤回的机器人消息。".to_string(),
            },
            Ok(outcome) => match request.target_sender {
                Some(_) => format!("已尝试撤回 {} 条该用户的最近消息。", outcome.succeeded),
                None => format!("已尝试撤回最近 {} 条群消息。", outcome.succeeded),
            },
            Err(ApplicationError::Gateway(_)) => "获取消息历史失败，无法执行批量撤回。".to_string(),
            Err(err) => {
                error!(error = %err, "批量撤回失败");
                "批量撤回失败。".to_string()
            }
        }
    }

    /// `test_recall` 的回复，这条回复本身会被自动撤回
    pub fn test_recall_reply(&self) -> String {
        format!("🧪 测试消息，{}秒后此消息将会撤回...", self.config.recall_time)
    }

    /// `recall_config` 的回复
    pub fn config_summary(&self) -> String {
        let mut summary = String::from("📋 当前撤回配置:\n");
        summary.push_str(&format!("撤回时间: {}秒\n", self.config.recall_time));
        summary.push_str(&format!("私聊启用: {}\n", self.config.enable_private_recall));
        summary.push_str(&format!("群聊启用: {}\n", self.config.enable_group_recall));
        if self.config.group_whitelist.is_empty() {
            summary.push_str("白名单群: 所有群聊\n");
        } else {
            summary.push_str(&format!("白名单群: {}个\n", self.config.group_whitelist.len()));
        }
        summary.push_str(&format!("批量撤回上限: {}条\n", self.config.batch_max_count));
        summary
    }

    /// 卸载插件：取消并等待所有撤回任务
    pub async fn terminate(&self) -> DrainReport {
        let report = self.scheduler.drain().await;
        info!(
            cancelled = report.cancelled,
            completed = report.completed,
            "自动撤回插件已卸载"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        DeleteOutcome, GatewayError, MockHistoryProvider, MockMessageDeleter, MockMessageSender,
    };
    use domain::{GroupId, HistoryEntry};
    use mockall::predicate::eq;

    struct Mocks {
        sender: MockMessageSender,
        deleter: MockMessageDeleter,
        history: MockHistoryProvider,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                sender: MockMessageSender::new(),
                deleter: MockMessageDeleter::new(),
                history: MockHistoryProvider::new(),
            }
        }

        fn into_plugin(self, config: RecallConfig) -> AutoRecallPlugin {
            AutoRecallPlugin::new(
                config,
                AutoRecallPluginDependencies {
                    sender: Arc::new(self.sender),
                    deleter: Arc::new(self.deleter),
                    history: Arc::new(self.history),
                },
            )
        }
    }

    fn admin_ctx(target: ChatTarget, text: &str) -> CommandContext {
        CommandContext {
            target,
            sender_id: UserId(1),
            sender_is_admin: true,
            message: vec![MessageSegment::text(text)],
        }
    }

    #[tokio::test]
    async fn eligibility_follows_config() {
        let mut config = RecallConfig::default();
        config.group_whitelist = vec!["100".into()];
        config.enable_private_recall = false;
        let plugin = Mocks::new().into_plugin(config);

        assert!(plugin.should_recall(&ChatTarget::Group(GroupId(100))));
        assert!(!plugin.should_recall(&ChatTarget::Group(GroupId(200))));
        assert!(!plugin.should_recall(&ChatTarget::Private(UserId(5))));
    }

    #[tokio::test]
    async fn disabled_group_recall_wins_over_whitelist() {
        let mut config = RecallConfig::default();
        config.group_whitelist = vec!["100".into()];
        config.enable_group_recall = false;
        let plugin = Mocks::new().into_plugin(config);

        assert!(!plugin.should_recall(&ChatTarget::Group(GroupId(100))));
    }

    #[tokio::test]
    async fn skipped_message_is_left_untouched() {
        let mut mocks = Mocks::new();
        mocks.sender.expect_send_message().never();
        let mut config = RecallConfig::default();
        config.enable_private_recall = false;
        let plugin = mocks.into_plugin(config);

        let mut message = vec![MessageSegment::text("hello")];
        let outcome = plugin
            .intercept_outgoing(ChatTarget::Private(UserId(5)), &mut message)
            .await;

        assert_eq!(outcome, InterceptOutcome::Skipped);
        assert!(outcome.needs_host_send());
        assert_eq!(message.len(), 1);
    }

    #[tokio::test]
    async fn empty_message_is_skipped() {
        let mut mocks = Mocks::new();
        mocks.sender.expect_send_message().never();
        let plugin = mocks.into_plugin(RecallConfig::default());

        let mut message = Vec::new();
        let outcome = plugin
            .intercept_outgoing(ChatTarget::Group(GroupId(1)), &mut message)
            .await;
        assert_eq!(outcome, InterceptOutcome::Skipped);
    }

    #[tokio::test]
    async fn resends_and_schedules_recall() {
        let mut mocks = Mocks::new();
        mocks
            .sender
            .expect_send_message()
            .withf(|target, message| {
                *target == ChatTarget::Group(GroupId(1)) && message[0].as_text() == Some("hello")
            })
            .times(1)
            .returning(|_, _| Ok(MessageId(77)));
        let plugin = mocks.into_plugin(RecallConfig::default());

        let mut message = vec![MessageSegment::text("hello")];
        let outcome = plugin
            .intercept_outgoing(ChatTarget::Group(GroupId(1)), &mut message)
            .await;

        assert_eq!(outcome, InterceptOutcome::Scheduled { message_id: MessageId(77) });
        assert!(message.is_empty());
        assert!(plugin.scheduler().is_pending(MessageId(77)));

        let report = plugin.terminate().await;
        assert_eq!(report.cancelled, 1);
        assert_eq!(plugin.scheduler().pending(), 0);
    }

    #[tokio::test]
    async fn send_failure_schedules_nothing() {
        let mut mocks = Mocks::new();
        mocks
            .sender
            .expect_send_message()
            .returning(|_, _| Err(GatewayError::Transport("timeout".into())));
        let plugin = mocks.into_plugin(RecallConfig::default());

        let mut message = vec![MessageSegment::text("hello")];
        let outcome = plugin
            .intercept_outgoing(ChatTarget::Private(UserId(2)), &mut message)
            .await;

        assert_eq!(outcome, InterceptOutcome::SendFailed);
        assert!(!outcome.needs_host_send());
        assert_eq!(plugin.scheduler().pending(), 0);
    }

    #[tokio::test]
    async fn zero_message_id_schedules_nothing() {
        let mut mocks = Mocks::new();
        mocks
            .sender
            .expect_send_message()
            .returning(|_, _| Ok(MessageId::NONE));
        let plugin = mocks.into_plugin(RecallConfig::default());

        let mut message = vec![MessageSegment::text("hello")];
        let outcome = plugin
            .intercept_outgoing(ChatTarget::Private(UserId(2)), &mut message)
            .await;

        assert_eq!(outcome, InterceptOutcome::MissingMessageId);
        assert_eq!(plugin.scheduler().pending(), 0);
    }

    #[tokio::test]
    async fn batch_recall_reports_success_count() {
        let mut mocks = Mocks::new();
        mocks
            .history
            .expect_group_history()
            .with(eq(GroupId(9)), eq(60))
            .returning(|_, _| {
                Ok(vec![
                    HistoryEntry::new(1, Some(UserId(100)), 10),
                    HistoryEntry::new(2, Some(UserId(200)), 20),
                ])
            });
        mocks
            .deleter
            .expect_delete_message()
            .returning(|_| Ok(DeleteOutcome::Deleted));
        let plugin = mocks.into_plugin(RecallConfig::default());

        let reply = plugin
            .batch_recall(&admin_ctx(ChatTarget::Group(GroupId(9)), "批量撤回 5"))
            .await;
        assert_eq!(reply, "已尝试撤回最近 2 条群消息。");
    }

    #[tokio::test]
    async fn batch_recall_with_target_reports_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .history
            .expect_group_history()
            .returning(|_, _| Ok(vec![HistoryEntry::new(1, Some(UserId(100)), 10)]));
        mocks.deleter.expect_delete_message().never();
        let plugin = mocks.into_plugin(RecallConfig::default());

        let mut ctx = admin_ctx(ChatTarget::Group(GroupId(9)), "批量撤回 ");
        ctx.message.push(MessageSegment::at(UserId(300)));
        ctx.message.push(MessageSegment::text(" 3"));

        assert_eq!(plugin.batch_recall(&ctx).await, "未找到可撤回的目标用户消息。");
    }

    #[tokio::test]
    async fn batch_recall_rejects_invalid_input_without_side_effects() {
        let mut mocks = Mocks::new();
        mocks.history.expect_group_history().never();
        mocks.deleter.expect_delete_message().never();
        let plugin = mocks.into_plugin(RecallConfig::default());
        let group = ChatTarget::Group(GroupId(9));

        assert_eq!(
            plugin.batch_recall(&admin_ctx(group, "批量撤回 0")).await,
            "撤回数量必须为正整数。"
        );
        assert_eq!(
            plugin.batch_recall(&admin_ctx(group, "批量撤回 -2")).await,
            "撤回数量必须为正整数。"
        );
        assert_eq!(
            plugin.batch_recall(&admin_ctx(group, "批量撤回")).await,
            "请在指令后填写需要撤回的数量，例如：批量撤回 5"
        );
        assert_eq!(
            plugin
                .batch_recall(&admin_ctx(ChatTarget::Private(UserId(1)), "批量撤回 3"))
                .await,
            "当前仅支持群聊批量撤回。"
        );

        let mut ctx = admin_ctx(group, "批量撤回 3");
        ctx.sender_is_admin = false;
        assert_eq!(plugin.batch_recall(&ctx).await, "权限不足，仅管理员可以使用批量撤回。");
    }

    #[tokio::test]
    async fn configured_admin_may_batch_recall() {
        let mut mocks = Mocks::new();
        mocks.history.expect_group_history().returning(|_, _| Ok(Vec::new()));
        let mut config = RecallConfig::default();
        config.admins = vec![1];
        let plugin = mocks.into_plugin(config);

        let mut ctx = admin_ctx(ChatTarget::Group(GroupId(9)), "批量撤回 3");
        ctx.sender_is_admin = false;
        assert_eq!(plugin.batch_recall(&ctx).await, "未找到可撤回的机器人消息。");
    }

    #[tokio::test]
    async fn history_failure_is_reported_to_user() {
        let mut mocks = Mocks::new();
        mocks
            .history
            .expect_group_history()
            .returning(|_, _| Err(GatewayError::Transport("down".into())));
        let plugin = mocks.into_plugin(RecallConfig::default());

        let reply = plugin
            .batch_recall(&admin_ctx(ChatTarget::Group(GroupId(9)), "批量撤回 3"))
            .await;
        assert_eq!(reply, "获取消息历史失败，无法执行批量撤回。");
    }

    #[tokio::test]
    async fn config_summary_lists_values() {
        let mut config = RecallConfig::default();
        config.recall_time = 15;
        config.group_whitelist = vec!["1".into(), "2".into()];
        let plugin = Mocks::new().into_plugin(config);

        let summary = plugin.config_summary();
        assert!(summary.contains("撤回时间: 15秒"));
        assert!(summary.contains("白名单群: 2个"));
        assert_eq!(plugin.test_recall_reply(), "🧪 测试消息，15秒后此消息将会撤回...");
    }
}
