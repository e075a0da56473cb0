use std::sync::Arc;

use domain::{select_for_recall, BatchRecallOutcome, BatchRecallRequest};
use tracing::{error, info, warn};

use crate::{
    error::ApplicationError,
    gateway::{DeleteOutcome, HistoryProvider, MessageDeleter},
};

/// 拉取历史时的放大策略：指定用户时需要多拉一些才能凑够数量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryFetchPolicy {
    pub factor: u32,
    pub cap: u32,
}

impl Default for HistoryFetchPolicy {
    fn default() -> Self {
        Self { factor: 3, cap: 100 }
    }
}

impl HistoryFetchPolicy {
    pub fn fetch_count(&self, max_count: u32) -> u32 {
        max_count.saturating_mul(self.factor).min(self.cap).max(1)
    }
}

pub struct BatchRecallServiceDependencies {
    pub history: Arc<dyn HistoryProvider>,
    pub deleter: Arc<dyn MessageDeleter>,
}

/// 批量撤回：拉取历史、选择目标、逐条撤回并统计成功数
pub struct BatchRecallService {
    deps: BatchRecallServiceDependencies,
    fetch_policy: HistoryFetchPolicy,
}

impl BatchRecallService {
    pub fn new(deps: BatchRecallServiceDependencies, fetch_policy: HistoryFetchPolicy) -> Self {
        Self { deps, fetch_policy }
    }

    /// 执行批量撤回
    ///
    /// 拉取历史失败时返回错误且不会发起任何撤回；单条撤回失败只记录日志，继续处理后续消息。
    pub async fn execute(
        &self,
        request: &BatchRecallRequest,
    ) -> Result<BatchRecallOutcome, ApplicationError> {
        let fetch_count = self.fetch_policy.fetch_count(request.max_count);
        let history = self
            .deps
            .history
            .group_history(request.group_id, fetch_count)
            .await
            .map_err(|err| {
                error!(group_id = %request.group_id, error = %err, "批量撤回获取消息历史失败");
                err
            })?;

        let selected = select_for_recall(
            &history,
            request.target_sender,
            request.effective_count(),
            request.max_count,
        );

        let mut outcome = BatchRecallOutcome::default();
        for entry in selected {
            if !entry.message_id.is_recallable() {
                continue;
            }
            outcome.attempted.push(entry.message_id);

            match self.deps.deleter.delete_message(entry.message_id).await {
                Ok(DeleteOutcome::Deleted) => outcome.succeeded += 1,
                Ok(DeleteOutcome::AlreadyRecalled) => {
                    info!(message_id = %entry.message_id, "消息已被撤回或超过可撤回时间");
                }
                Err(err) => {
                    warn!(message_id = %entry.message_id, error = %err, "批量撤回消息失败");
                }
            }
        }

        info!(
            group_id = %request.group_id,
            target = ?request.target_sender,
            fetched = history.len(),
            attempted = outcome.attempted.len(),
            succeeded = outcome.succeeded,
            "批量撤回完成"
        );
        Ok(outcome)
    }
}
