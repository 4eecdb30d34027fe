//! 单元测试用的记录型协作者

use crate::error::SinkError;
use crate::sinks::{ClipboardSink, NotificationSink};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl RecordingClipboard {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClipboardSink for RecordingClipboard {
    async fn write(&self, text: &str) -> Result<(), SinkError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SinkError::Clipboard("no display".to_string()));
        }
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), SinkError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
