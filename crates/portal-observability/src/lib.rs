//! Portal Observability
//!
//! 为两个聊天界面提供统一的结构化日志。

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LogOutput, LoggingConfig};
pub use error::{ObservabilityError, Result};
pub use logging::{create_session_span, create_surface_span, LogManager};
