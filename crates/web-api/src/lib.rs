//! Web API 层。
//!
//! 接收 OneBot 协议端上报的事件，把指令交给自动撤回插件处理；
//! 机器人的每条回复都先经过插件的拦截钩子。

mod error;
mod event;
mod routes;
mod state;

pub use error::ApiError;
pub use event::{EventMessage, EventSender, OneBotEvent};
pub use routes::router;
pub use state::{AppState, Delivery};
