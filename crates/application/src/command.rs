//! 文本指令解析
//!
//! 只负责从已经拆好的消息段里提取参数，不涉及任何协议调用。

use domain::{plain_text, MessageSegment, UserId};
use thiserror::Error;

pub const BATCH_RECALL_COMMAND: &str = "批量撤回";
pub const RECALL_CONFIG_COMMAND: &str = "recall_config";
pub const TEST_RECALL_COMMAND: &str = "test_recall";

/// 插件能识别的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    BatchRecall,
    RecallConfig,
    TestRecall,
}

/// 根据消息文本识别指令，允许可选的 `/` 前缀
pub fn recognize(segments: &[MessageSegment]) -> Option<CommandKind> {
    let text = plain_text(segments);
    let text = text.trim_start();
    let text = text.strip_prefix('/').unwrap_or(text);

    if text.starts_with(BATCH_RECALL_COMMAND) {
        Some(CommandKind::BatchRecall)
    } else if is_word(text, RECALL_CONFIG_COMMAND) {
        Some(CommandKind::RecallConfig)
    } else if is_word(text, TEST_RECALL_COMMAND) {
        Some(CommandKind::TestRecall)
    } else {
        None
    }
}

fn is_word(text: &str, word: &str) -> bool {
    match text.strip_prefix(word) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// 批量撤回指令的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecallCommand {
    /// 被 @ 的目标用户
    pub target: Option<UserId>,
    /// 指令末尾的数量，保证为正
    pub count: i64,
}

/// 指令参数错误，文本直接回复给用户
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("请在指令后填写需要撤回的数量，例如：批量撤回 5")]
    MissingCount,

    #[error("撤回数量必须为正整数。")]
    NonPositiveCount,
}

/// 解析 `批量撤回 [@用户] 数量`
///
/// 目标取第一个不是 `@全体成员` 的 at 段；数量取指令词之后最后一串数字。
pub fn parse_batch_recall(segments: &[MessageSegment]) -> Result<BatchRecallCommand, CommandError> {
    let target = segments
        .iter()
        .filter_map(MessageSegment::at_target)
        .find(|qq| qq != "all")
        .and_then(|qq| qq.parse::<UserId>().ok());

    let text = plain_text(segments);
    let text = text.trim();
    let tail = match text.split_once(BATCH_RECALL_COMMAND) {
        Some((_, tail)) => tail,
        None => text,
    };

    // 输入法常打出全角数字和符号
    let tail: String = tail.chars().map(normalize_digit).collect();

    let end = tail
        .rfind(|c: char| c.is_ascii_digit())
        .ok_or(CommandError::MissingCount)?
        + 1;
    let head = &tail[..end];
    let start = head.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if let Some(before_sign) = head[..start].strip_suffix('-') {
        // `3-5` 里的 `-` 是连字符，不是负号
        if before_sign.chars().next_back().is_none_or(char::is_whitespace) {
            return Err(CommandError::NonPositiveCount);
        }
    }

    // 只含数字的超长串只可能是溢出，按最大值处理，后续会被上限截断
    let count = head[start..].parse::<i64>().unwrap_or(i64::MAX);
    if count <= 0 {
        return Err(CommandError::NonPositiveCount);
    }

    Ok(BatchRecallCommand { target, count })
}

fn normalize_digit(c: char) -> char {
    match c {
        '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10).unwrap_or(c),
        '－' => '-',
        _ => c,
    }
}
