//! Clipdrop Core Library
//!
//! 局域网上传服务的核心实现：把文本或文件推送到本机，
//! 写入系统剪贴板并发送桌面通知，同时通过 WebSocket 推送上传进度。
//!
//! # 模块
//!
//! - **upload**: 分块落盘、SHA-256 校验、文本上传
//! - **registry**: 进度订阅者注册表与广播
//! - **transfer**: HTTP 路由、WebSocket 推送、JSON 协议
//! - **sinks**: 剪贴板与桌面通知
//! - **config**: 服务配置（TOML）
//!
//! # 使用示例
//!
//! ```ignore
//! use clipdrop_core::{ServerSettings, start_http_server};
//!
//! let settings = ServerSettings::load();
//! start_http_server(&settings, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! ```

pub mod config;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod registry;
pub mod sinks;
pub mod transfer;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use config::ServerSettings;
pub use error::{IngestError, SinkError, UploadError};
pub use logging::LogLevel;
pub use registry::{SubscriberId, SubscriberRegistry, Subscription};
pub use sinks::{ClipboardSink, NotificationSink, SystemClipboard};
pub use transfer::{AppState, ProgressEvent, router, serve, start_http_server};
pub use upload::{PipelineConfig, TextIngest, UploadPipeline};
