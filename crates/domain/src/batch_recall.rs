//! 批量撤回的请求、结果与选择规则
//!
//! 选择规则是纯函数：按可选发送者过滤，按时间倒序排列，截取请求数量。
//! 实际的撤回调用和成功计数由调用方负责。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::history::HistoryEntry;
use crate::value_objects::{GroupId, MessageId, UserId};

/// 一次批量撤回请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecallRequest {
    pub group_id: GroupId,
    pub target_sender: Option<UserId>,
    pub requested_count: u32,
    pub max_count: u32,
}

impl BatchRecallRequest {
    /// 创建请求。数量必须为正整数，超过上限时静默截断。
    pub fn new(
        group_id: GroupId,
        target_sender: Option<UserId>,
        requested_count: i64,
        max_count: u32,
    ) -> DomainResult<Self> {
        if requested_count <= 0 {
            return Err(DomainError::invalid_argument(
                "requested_count",
                "撤回数量必须为正整数",
            ));
        }
        if max_count == 0 {
            return Err(DomainError::invalid_argument(
                "max_count",
                "批量撤回上限必须大于 0",
            ));
        }

        let requested_count = u32::try_from(requested_count).unwrap_or(u32::MAX);
        Ok(Self {
            group_id,
            target_sender,
            requested_count: clamp_count(requested_count, max_count),
            max_count,
        })
    }

    /// 实际参与选择的数量，范围 `[1, max_count]`
    pub fn effective_count(&self) -> u32 {
        clamp_count(self.requested_count, self.max_count)
    }
}

/// 批量撤回结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecallOutcome {
    /// 按顺序尝试撤回的消息
    pub attempted: Vec<MessageId>,
    /// 成功撤回的条数，不超过 `attempted.len()`
    pub succeeded: usize,
}

impl BatchRecallOutcome {
    pub fn is_empty(&self) -> bool {
        self.attempted.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.attempted.len().saturating_sub(self.succeeded)
    }
}

fn clamp_count(requested: u32, max_count: u32) -> u32 {
    requested.clamp(1, max_count.max(1))
}

/// 从历史记录中选出需要撤回的消息
///
/// 1. 请求数量截断到 `[1, max_count]`
/// 2. 指定发送者时只保留该发送者的消息
/// 3. 按时间倒序排列，时间相同保持原始顺序
/// 4. 取前 N 条
pub fn select_for_recall(
    history: &[HistoryEntry],
    target_sender: Option<UserId>,
    requested_count: u32,
    max_count: u32,
) -> Vec<HistoryEntry> {
    let count = clamp_count(requested_count, max_count) as usize;

    let mut candidates: Vec<HistoryEntry> = history
        .iter()
        .filter(|entry| match target_sender {
            Some(sender) => entry.is_from(sender),
            None => true,
        })
        .cloned()
        .collect();

    // sort_by 是稳定排序
    candidates.sort_by(|a, b| b.time.cmp(&a.time));
    candidates.truncate(count);
    candidates
}
