//! 基础设施层
//!
//! 提供 OneBot v11 HTTP API 客户端，实现应用层的协议端 trait。

pub mod onebot;

pub use onebot::OneBotHttpClient;
