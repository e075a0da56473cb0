//! 应用层错误定义

use domain::errors::DomainError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// 应用层错误类型
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 领域层错误
    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    /// 协议端调用错误
    #[error("协议端错误: {0}")]
    Gateway(#[from] GatewayError),
}

/// 应用层结果类型
pub type ApplicationResult<T> = Result<T, ApplicationError>;
