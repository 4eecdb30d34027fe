//! 传输模块
//!
//! 包含:
//! - 进度事件与响应体（JSON 协议）
//! - HTTP 服务器（上传路由、健康检查）
//! - WebSocket 进度推送

pub mod http_server;
pub mod protocol;
pub mod websocket_handler;

pub use http_server::{AppState, router, serve, start_http_server};
pub use protocol::{ErrorBody, FileUploadResponse, ProgressEvent, TextUploadResponse};
