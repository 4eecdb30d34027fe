//! 文本上传
//!
//! 无分块、无摘要：直接写剪贴板并发送通知。

use crate::error::IngestError;
use crate::sinks::{ClipboardSink, NotificationSink};
use log::{debug, info};
use std::sync::Arc;

/// 通知正文中展示的最大字符数
const PREVIEW_CHARS: usize = 80;

pub struct TextIngest {
    clipboard: Arc<dyn ClipboardSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl TextIngest {
    pub fn new(clipboard: Arc<dyn ClipboardSink>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            clipboard,
            notifier,
        }
    }

    /// 写入剪贴板；空文本直接拒绝，不产生任何副作用
    pub async fn ingest(&self, text: &str) -> Result<(), IngestError> {
        if text.is_empty() {
            return Err(IngestError::EmptyContent);
        }

        self.clipboard.write(text).await?;
        info!("Text uploaded ({} chars)", text.chars().count());

        let body = format!("Text saved: {}", preview(text));
        if let Err(e) = self.notifier.notify("Text Uploaded", &body).await {
            debug!("Notification failed: {}", e);
        }

        Ok(())
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
