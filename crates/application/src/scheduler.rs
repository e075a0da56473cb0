//! 自动撤回调度器
//!
//! 每条成功发送的消息对应一个延时撤回任务。任务结束（无论成功、已撤回还是失败）
//! 都会通过完成通道通知调度器，由调度器自己的回收任务把它从注册表中移除。
//! 卸载时调用 [`RecallScheduler::drain`] 取消并等待所有未完成的任务。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use domain::MessageId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::gateway::{DeleteOutcome, MessageDeleter};

/// 调度器内部的任务编号
pub type TaskId = u64;

/// 单个撤回任务的终态（取消除外）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallTaskOutcome {
    Deleted,
    AlreadyRecalled,
    Failed,
}

/// `drain` 的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// 被取消的任务数
    pub cancelled: usize,
    /// 取消前已经跑完的任务数
    pub completed: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.cancelled + self.completed
    }
}

struct PendingRecall {
    message_id: MessageId,
    delay: Duration,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct RecallCompletion {
    task_id: TaskId,
    message_id: MessageId,
    outcome: RecallTaskOutcome,
}

type Registry = Arc<Mutex<HashMap<TaskId, PendingRecall>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<TaskId, PendingRecall>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 延时撤回任务的注册表与调度器
///
/// 必须在 tokio 运行时内创建。
pub struct RecallScheduler {
    registry: Registry,
    next_task_id: AtomicU64,
    completions: mpsc::UnboundedSender<RecallCompletion>,
    reaper: JoinHandle<()>,
}

impl RecallScheduler {
    pub fn new() -> Self {
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        let (completions, receiver) = mpsc::unbounded_channel();
        let reaper = tokio::spawn(reap_completed(registry.clone(), receiver));

        Self {
            registry,
            next_task_id: AtomicU64::new(1),
            completions,
            reaper,
        }
    }

    /// 安排在 `delay` 之后撤回 `message_id`
    ///
    /// `message_id` 为 0 时直接忽略并返回 `None`。任务在注册表加锁期间创建并登记，
    /// 因此不会出现任务先结束、后登记的情况。
    pub fn schedule(
        &self,
        deleter: Arc<dyn MessageDeleter>,
        message_id: MessageId,
        delay: Duration,
    ) -> Option<TaskId> {
        if !message_id.is_recallable() {
            warn!(message_id = %message_id, "消息 ID 无效，跳过自动撤回");
            return None;
        }

        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let completions = self.completions.clone();

        let mut registry = lock(&self.registry);
        let handle = tokio::spawn(async move {
            let outcome = recall_after(deleter.as_ref(), message_id, delay).await;
            // 接收端只会在调度器销毁后关闭，此时无需再登记
            let _ = completions.send(RecallCompletion {
                task_id,
                message_id,
                outcome,
            });
        });
        registry.insert(
            task_id,
            PendingRecall {
                message_id,
                delay,
                handle,
            },
        );
        drop(registry);

        info!(
            message_id = %message_id,
            task_id,
            delay_secs = delay.as_secs(),
            "已安排消息自动撤回"
        );
        Some(task_id)
    }

    /// 当前尚未结束的任务数
    pub fn pending(&self) -> usize {
        lock(&self.registry).len()
    }

    pub fn is_pending(&self, message_id: MessageId) -> bool {
        lock(&self.registry)
            .values()
            .any(|pending| pending.message_id == message_id)
    }

    /// 取消所有未完成的任务并等待它们结束
    ///
    /// 可以重复调用，注册表为空时立即返回。
    pub async fn drain(&self) -> DrainReport {
        let pending: Vec<PendingRecall> = lock(&self.registry)
            .drain()
            .map(|(_, pending)| pending)
            .collect();

        let mut report = DrainReport::default();
        if pending.is_empty() {
            return report;
        }

        for recall in &pending {
            debug!(
                message_id = %recall.message_id,
                delay_secs = recall.delay.as_secs(),
                "取消撤回任务"
            );
            recall.handle.abort();
        }

        let results =
            futures::future::join_all(pending.into_iter().map(|recall| recall.handle)).await;
        for result in results {
            match result {
                Ok(()) => report.completed += 1,
                Err(err) if err.is_cancelled() => report.cancelled += 1,
                Err(err) => {
                    error!(error = %err, "撤回任务异常退出");
                    report.completed += 1;
                }
            }
        }

        info!(
            cancelled = report.cancelled,
            completed = report.completed,
            "撤回任务已全部清理"
        );
        report
    }
}

impl Default for RecallScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecallScheduler {
    fn drop(&mut self) {
        for (_, recall) in lock(&self.registry).drain() {
            recall.handle.abort();
        }
        self.reaper.abort();
    }
}

/// 等待后执行一次撤回，所有错误都在这里消化
async fn recall_after(
    deleter: &dyn MessageDeleter,
    message_id: MessageId,
    delay: Duration,
) -> RecallTaskOutcome {
    tokio::time::sleep(delay).await;

    match deleter.delete_message(message_id).await {
        Ok(DeleteOutcome::Deleted) => {
            info!(message_id = %message_id, "已自动撤回消息");
            RecallTaskOutcome::Deleted
        }
        Ok(DeleteOutcome::AlreadyRecalled) => {
            info!(message_id = %message_id, "撤回消息可能已超时或被撤回");
            RecallTaskOutcome::AlreadyRecalled
        }
        Err(err) => {
            error!(message_id = %message_id, error = %err, "撤回消息失败");
            RecallTaskOutcome::Failed
        }
    }
}

/// 回收已结束的任务
async fn reap_completed(registry: Registry, mut receiver: mpsc::UnboundedReceiver<RecallCompletion>) {
    while let Some(completion) = receiver.recv().await {
        let removed = lock(&registry).remove(&completion.task_id).is_some();
        debug!(
            task_id = completion.task_id,
            message_id = %completion.message_id,
            outcome = ?completion.outcome,
            removed,
            "撤回任务结束"
        );
    }
}
