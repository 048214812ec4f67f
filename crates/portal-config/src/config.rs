use serde::{Deserialize, Serialize};

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 获取配置值的快捷方法
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["server", "url"] => Some(self.server.url.clone()),
            ["server", "api_path"] => Some(self.server.api_path.clone()),
            ["server", "connect_timeout_secs"] => {
                Some(self.server.connect_timeout_secs.to_string())
            }
            ["server", "request_timeout_secs"] => {
                Some(self.server.request_timeout_secs.to_string())
            }
            ["chat", "mobile_session_key"] => Some(self.chat.mobile_session_key.clone()),
            ["chat", "pc_session_key"] => Some(self.chat.pc_session_key.clone()),
            ["chat", "session_dir"] => self.chat.session_dir.clone(),
            ["chat", "quick_questions"] => Some(self.chat.quick_questions.join(" | ")),
            ["logging", "level"] => Some(self.logging.level.as_str().to_string()),
            ["logging", "file"] => self.logging.file.clone(),
            ["logging", "json"] => Some(self.logging.json.to_string()),
            _ => None,
        }
    }

    /// 设置配置值
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["server", "url"] => {
                self.server.url = value.trim_end_matches('/').to_string();
            }
            ["server", "api_path"] => {
                self.server.api_path = value.to_string();
            }
            ["server", "connect_timeout_secs"] => {
                self.server.connect_timeout_secs = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["server", "request_timeout_secs"] => {
                self.server.request_timeout_secs = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["chat", "mobile_session_key"] => {
                self.chat.mobile_session_key = value.to_string();
            }
            ["chat", "pc_session_key"] => {
                self.chat.pc_session_key = value.to_string();
            }
            ["chat", "session_dir"] => {
                self.chat.session_dir = Some(value.to_string());
            }
            ["chat", "quick_questions"] => {
                self.chat.quick_questions = value
                    .split('|')
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = Some(value.to_string());
            }
            ["logging", "json"] => {
                self.logging.json = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid boolean: {}", value))
                })?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

/// 后端服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// 服务根地址 (e.g., "http://127.0.0.1:8000")
    pub url: String,
    /// API 前缀，客服接口挂在 `{url}{api_path}/chat/...` 下
    pub api_path: String,
    pub connect_timeout_secs: u64,
    /// 非流式请求的超时时间；流式请求只受连接超时约束
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            api_path: "/api".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// 拼接后的 API 基础地址
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.api_path.trim_matches('/')
        )
    }
}

/// 智能客服配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// 移动端会话标识的存储键
    pub mobile_session_key: String,
    /// PC 端会话标识的存储键
    pub pc_session_key: String,
    /// 会话标识目录，每个存储键一个文件，缺省时使用 ~/.portal/sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_dir: Option<String>,
    /// 快捷问题
    #[serde(default)]
    pub quick_questions: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mobile_session_key: "chat_session_id".to_string(),
            pc_session_key: "pc_chat_session_id".to_string(),
            session_dir: None,
            quick_questions: vec![
                "物业费如何缴纳?".to_string(),
                "装修申请需要哪些材料?".to_string(),
                "公共收益如何查询?".to_string(),
                "小区停车有哪些规定?".to_string(),
            ],
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: Some("~/.portal/logs/portal.log".to_string()),
            json: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
