//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数不合法
    #[error("参数不合法: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 标识解析失败
    #[error("无法解析{kind}: {raw}")]
    InvalidIdentifier { kind: &'static str, raw: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_identifier(kind: &'static str, raw: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            raw: raw.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
