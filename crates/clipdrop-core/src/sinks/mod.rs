//! 外部协作者：剪贴板与桌面通知
//!
//! 上传成功后调用。两者都返回 `Result`，由调用方决定记录还是传播。

pub mod clipboard;
pub mod notification;

pub use clipboard::{DisabledClipboard, SystemClipboard};
pub use notification::{DesktopNotifier, DisabledNotifier};

use crate::error::SinkError;
use async_trait::async_trait;

/// 剪贴板写入端
#[async_trait]
pub trait ClipboardSink: Send + Sync {
    async fn write(&self, text: &str) -> Result<(), SinkError>;
}

/// 通知发送端
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<(), SinkError>;
}
