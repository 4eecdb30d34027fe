//! 系统剪贴板
//!
//! `arboard` 的调用是同步的，放到阻塞线程池执行。
//! 剪贴板句柄在首次使用时创建并一直持有：X11 下句柄释放后内容会丢失。

use super::ClipboardSink;
use crate::error::SinkError;
use arboard::Clipboard;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct SystemClipboard {
    handle: Arc<Mutex<Option<Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取当前剪贴板文本
    pub async fn read_text(&self) -> Result<String, SinkError> {
        self.with_clipboard(|clipboard| clipboard.get_text()).await
    }

    async fn with_clipboard<T, F>(&self, op: F) -> Result<T, SinkError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Clipboard) -> Result<T, arboard::Error> + Send + 'static,
    {
        let handle = self.handle.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = handle
                .lock()
                .map_err(|_| SinkError::Clipboard("clipboard lock poisoned".to_string()))?;

            if guard.is_none() {
                *guard = Some(Clipboard::new().map_err(|e| SinkError::Clipboard(e.to_string()))?);
            }

            let result = match guard.as_mut() {
                Some(clipboard) => op(clipboard),
                None => return Err(SinkError::Clipboard("clipboard unavailable".to_string())),
            };

            result.map_err(|e| {
                // 句柄可能已失效（例如显示服务重启），下次重新创建
                *guard = None;
                SinkError::Clipboard(e.to_string())
            })
        })
        .await
        .map_err(|e| SinkError::Clipboard(e.to_string()))?
    }
}

#[async_trait]
impl ClipboardSink for SystemClipboard {
    async fn write(&self, text: &str) -> Result<(), SinkError> {
        let text = text.to_string();
        self.with_clipboard(move |clipboard| clipboard.set_text(text))
            .await
    }
}

/// 无头环境下使用：不写剪贴板，只记录日志
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClipboard;

#[async_trait]
impl ClipboardSink for DisabledClipboard {
    async fn write(&self, text: &str) -> Result<(), SinkError> {
        log::debug!("Clipboard disabled, skipping write of {} bytes", text.len());
        Ok(())
    }
}
