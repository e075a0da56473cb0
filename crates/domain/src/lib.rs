//! 自动撤回插件核心领域模型
//!
//! 包含消息标识、会话目标、消息段、历史记录条目，以及批量撤回的选择规则。

pub mod batch_recall;
pub mod errors;
pub mod history;
pub mod message;
pub mod value_objects;

// 重新导出常用类型
pub use batch_recall::*;
pub use errors::*;
pub use history::*;
pub use message::*;
pub use value_objects::*;
