//! 应用层实现。
//!
//! 这里提供自动撤回调度、批量撤回以及宿主钩子，对协议端的访问
//! 全部通过 [`gateway`] 中的 trait 完成。

pub mod command;
pub mod error;
pub mod gateway;
pub mod plugin;
pub mod scheduler;
pub mod services;

pub use command::{parse_batch_recall, recognize, BatchRecallCommand, CommandError, CommandKind};
pub use error::{ApplicationError, ApplicationResult};
pub use gateway::{
    DeleteOutcome, GatewayError, HistoryProvider, MessageDeleter, MessageSender,
    RETCODE_ALREADY_RECALLED,
};
pub use plugin::{AutoRecallPlugin, AutoRecallPluginDependencies, CommandContext, InterceptOutcome};
pub use scheduler::{DrainReport, RecallScheduler, RecallTaskOutcome, TaskId};
pub use services::{BatchRecallService, BatchRecallServiceDependencies, HistoryFetchPolicy};
