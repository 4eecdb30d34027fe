//! 单次上传会话
//!
//! 只在处理一个请求期间存在，由该请求独占。

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 上传会话状态
#[derive(Debug)]
pub struct UploadSession {
    id: String,
    destination: PathBuf,
    expected_total: u64,
    bytes_written: u64,
    finished: bool,
}

impl UploadSession {
    pub fn new(destination: PathBuf, expected_total: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            destination,
            expected_total,
            bytes_written: 0,
            finished: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn expected_total(&self) -> u64 {
        self.expected_total
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// 记录一个已落盘的分块，返回最新进度百分比
    pub fn record_chunk(&mut self, len: usize) -> f64 {
        self.bytes_written += len as u64;
        self.percent()
    }

    /// 输入已读完：此后进度恒为 100
    pub fn finish(&mut self) -> f64 {
        self.finished = true;
        self.percent()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 当前进度百分比
    ///
    /// 声明大小来自客户端，不可信：结果钳制在 `[0, 100]`。
    /// 大小未知（0）时读完之前报告 0。
    pub fn percent(&self) -> f64 {
        if self.finished {
            return 100.0;
        }
        if self.expected_total == 0 {
            return 0.0;
        }
        (self.bytes_written as f64 / self.expected_total as f64 * 100.0).clamp(0.0, 100.0)
    }
}
