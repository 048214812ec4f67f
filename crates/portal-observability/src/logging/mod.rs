//! 结构化日志模块
//!
//! 提供基于 tracing 的结构化日志功能。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::{Config, LogOutput, LoggingConfig};
use crate::error::{ObservabilityError, Result};

type FilteredRegistry = Layered<EnvFilter, Registry>;

type BoxedFmtLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// 日志管理器
///
/// 持有文件写入线程的 guard，丢弃管理器会刷新并关闭文件输出。
#[derive(Debug)]
pub struct LogManager {
    /// 文件输出的后台写入 guard
    _guard: Option<WorkerGuard>,
}

impl LogManager {
    /// 创建并安装全局日志订阅者
    pub fn init(config: &Config) -> Result<Self> {
        let logging_config = config.logging.clone();

        let filter = build_filter(&logging_config)?;

        let (fmt_layer, guard) = match &logging_config.output {
            LogOutput::Stderr => (fmt_layer(&logging_config, std::io::stderr, true), None),
            LogOutput::File(path) => {
                let directory = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| std::path::PathBuf::from("."));
                let file_name = path
                    .file_name()
                    .ok_or_else(|| {
                        ObservabilityError::config(format!("Log path has no file name: {:?}", path))
                    })?
                    .to_owned();

                std::fs::create_dir_all(&directory)?;
                let appender = tracing_appender::rolling::never(directory, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (fmt_layer(&logging_config, writer, false), Some(guard))
            }
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ObservabilityError::logging(format!("Subscriber already set: {}", e)))?;

        tracing::info!(
            target: "portal_observability",
            app = %config.app_name,
            "Log manager initialized with level: {}",
            logging_config.level
        );

        Ok(Self { _guard: guard })
    }
}

/// 构建环境过滤器，`RUST_LOG` 优先于配置文件
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let base = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    let mut filter = EnvFilter::try_new(&base)
        .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

    for (module, level) in &config.module_levels {
        filter = filter.add_directive(
            format!("{}={}", module, level)
                .parse()
                .map_err(|e| ObservabilityError::logging(format!("Invalid directive: {}", e)))?,
        );
    }

    Ok(filter)
}

fn fmt_layer<W>(config: &LoggingConfig, writer: W, ansi: bool) -> BoxedFmtLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.include_target)
        .with_line_number(config.include_line_number)
        .with_ansi(ansi)
        .with_writer(writer);

    if config.json_format {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// 创建带有界面上下文的 span
pub fn create_surface_span(surface: &str) -> tracing::Span {
    tracing::info_span!("surface", surface = %surface)
}

/// 创建带有会话上下文的 span
pub fn create_session_span(session_id: Option<&str>) -> tracing::Span {
    match session_id {
        Some(id) => tracing::info_span!("session", session_id = %id),
        None => tracing::info_span!("session", session_id = tracing::field::Empty),
    }
}
