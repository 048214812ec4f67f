pub mod config;
pub mod manager;

pub use config::{
    ChatConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, ServerConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 Portal 配置目录路径
pub fn portal_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".portal"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    portal_dir().map(|dir| dir.join("config.json"))
}

/// 获取默认会话标识存储目录
pub fn default_session_dir() -> Option<PathBuf> {
    portal_dir().map(|dir| dir.join("sessions"))
}

/// 获取默认日志文件路径
pub fn default_log_path() -> Option<PathBuf> {
    portal_dir().map(|dir| dir.join("logs").join("portal.log"))
}

/// 初始化 Portal 目录结构
pub async fn init_portal_dirs() -> ConfigResult<()> {
    if let Some(portal) = portal_dir() {
        tokio::fs::create_dir_all(&portal).await?;
        tokio::fs::create_dir_all(portal.join("logs")).await?;
    }
    Ok(())
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_dir() {
        let dir = portal_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().to_string_lossy().contains(".portal"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.portal/config.json");
        assert!(expanded.is_some());
        assert!(!expanded.unwrap().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_expand_tilde_keeps_plain_paths() {
        let expanded = expand_tilde("/tmp/portal.json").unwrap();
        assert_eq!(expanded, PathBuf::from("/tmp/portal.json"));
    }
}
