//! 日志配置
//!
//! 支持直接构造，或从 portal-config 的 `logging` 段转换。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 观测性配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 应用名称，用作日志文件前缀和 span 标签
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 设置应用名称
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// 设置日志级别
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// 设置是否使用 JSON 格式
    pub fn with_json_format(mut self, json: bool) -> Self {
        self.logging.json_format = json;
        self
    }

    /// 输出到文件而不是 stderr
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.logging.output = LogOutput::File(path.into());
        self
    }

    /// 添加模块特定的日志级别
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.logging.module_levels.insert(module.into(), level.into());
        self
    }
}

/// 日志输出目标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// 标准错误输出，保持 stdout 只承载对话内容
    #[default]
    Stderr,
    /// 写入文件（全屏界面使用）
    File(PathBuf),
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（trace, debug, info, warn, error）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否使用 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 输出目标
    #[serde(default)]
    pub output: LogOutput,

    /// 模块级别的日志配置
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// 是否包含目标（target）
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// 是否包含行号
    #[serde(default)]
    pub include_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            output: LogOutput::Stderr,
            module_levels: HashMap::new(),
            include_target: true,
            include_line_number: false,
        }
    }
}

#[cfg(feature = "portal-config")]
impl From<&portal_config::Config> for Config {
    fn from(config: &portal_config::Config) -> Self {
        let mut observability = Config::default()
            .with_log_level(config.logging.level.as_str())
            .with_json_format(config.logging.json);

        // 依赖库的噪声压低一级
        observability = observability
            .with_module_level("reqwest", "warn")
            .with_module_level("hyper", "warn");

        observability
    }
}

fn default_app_name() -> String {
    "portal".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
