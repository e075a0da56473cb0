//! OneBot 消息段
//!
//! 消息由若干段组成，每段形如 `{"type": "text", "data": {"text": "..."}}`。
//! 插件只关心 `text` 与 `at` 两种段，其余类型原样透传。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value_objects::UserId;

/// 单个消息段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl MessageSegment {
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// 纯文本段
    pub fn text(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text".to_string(), Value::String(text.into()));
        Self::new("text", data)
    }

    /// @某人
    pub fn at(user_id: UserId) -> Self {
        let mut data = Map::new();
        data.insert("qq".to_string(), Value::String(user_id.to_string()));
        Self::new("at", data)
    }

    /// 返回文本段的内容
    pub fn as_text(&self) -> Option<&str> {
        if self.kind != "text" {
            return None;
        }
        self.data.get("text").and_then(Value::as_str)
    }

    /// 返回 `at` 段的目标，`qq` 可能是字符串或数字，也可能是 `all`
    pub fn at_target(&self) -> Option<String> {
        if self.kind != "at" {
            return None;
        }
        match self.data.get("qq")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 拼接消息中所有文本段
pub fn plain_text(segments: &[MessageSegment]) -> String {
    segments
        .iter()
        .filter_map(MessageSegment::as_text)
        .collect::<String>()
}
