//! 统一配置中心
//!
//! 提供插件的全局配置，包括：
//! - 自动撤回行为（撤回时间、私聊/群聊开关、群白名单、批量撤回上限）
//! - OneBot 协议端连接
//! - Webhook 服务监听地址
//!
//! 加载顺序：默认值 -> 可选配置文件（`AUTORECALL_CONFIG_FILE`）-> 环境变量（`AUTORECALL_*`）。

use std::time::Duration;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// 配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "AUTORECALL_CONFIG_FILE";
/// 环境变量前缀，嵌套字段以 `__` 分隔，例如 `AUTORECALL_RECALL__RECALL_TIME=30`
pub const ENV_PREFIX: &str = "AUTORECALL_";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub recall: RecallConfig,
    #[serde(default)]
    #[validate(nested)]
    pub onebot: OneBotConfig,
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
}

/// 撤回行为配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecallConfig {
    /// 自动撤回延迟（秒）
    pub recall_time: u64,
    /// 私聊是否启用自动撤回
    pub enable_private_recall: bool,
    /// 群聊是否启用自动撤回
    pub enable_group_recall: bool,
    /// 群白名单，为空表示所有群
    #[validate(custom(function = "validate_group_whitelist"))]
    pub group_whitelist: Vec<String>,
    /// 批量撤回单次上限
    #[validate(range(min = 1))]
    pub batch_max_count: u32,
    /// 拉取历史时相对上限的放大倍数
    #[validate(range(min = 1))]
    pub history_fetch_factor: u32,
    /// 拉取历史条数的硬上限
    #[validate(range(min = 1))]
    pub history_fetch_cap: u32,
    /// 允许执行批量撤回的管理员 QQ 号
    pub admins: Vec<i64>,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            recall_time: 10,
            enable_private_recall: true,
            enable_group_recall: true,
            group_whitelist: Vec::new(),
            batch_max_count: 20,
            history_fetch_factor: 3,
            history_fetch_cap: 100,
            admins: Vec::new(),
        }
    }
}

impl RecallConfig {
    pub fn recall_delay(&self) -> Duration {
        Duration::from_secs(self.recall_time)
    }

    /// 白名单为空时所有群都允许
    pub fn allows_group(&self, group_id: i64) -> bool {
        if self.group_whitelist.is_empty() {
            return true;
        }
        self.group_whitelist
            .iter()
            .any(|entry| entry.trim().parse::<i64>() == Ok(group_id))
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }
}

/// OneBot 协议端配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OneBotConfig {
    /// HTTP API 地址，例如 `http://127.0.0.1:5700`
    #[validate(url)]
    pub api_base_url: String,
    pub access_token: Option<String>,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5700".to_string(),
            access_token: None,
            timeout_seconds: 10,
        }
    }
}

impl OneBotConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Webhook 服务配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// 按默认值、配置文件、环境变量的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            figment = if path.ends_with(".yml") || path.ends_with(".yaml") {
                figment.merge(Yaml::file(path))
            } else if path.ends_with(".json") {
                figment.merge(Json::file(path))
            } else {
                figment.merge(Toml::file(path))
            };
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// 日志用的配置描述，隐藏访问令牌
    pub fn sanitize(&self) -> String {
        let mut sanitized = self.clone();
        if sanitized.onebot.access_token.is_some() {
            sanitized.onebot.access_token = Some("[REDACTED]".to_string());
        }
        format!("{:?}", sanitized)
    }
}

fn validate_group_whitelist(whitelist: &[String]) -> Result<(), ValidationError> {
    if whitelist
        .iter()
        .all(|entry| entry.trim().parse::<i64>().is_ok())
    {
        Ok(())
    } else {
        Err(ValidationError::new("group_whitelist_not_numeric"))
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("配置解析失败: {0}")]
    Extract(#[from] Box<figment::Error>),
    #[error("配置校验失败: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
