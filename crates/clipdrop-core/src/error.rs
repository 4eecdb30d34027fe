//! 错误类型
//!
//! 文件上传、文本上传与外部协作者（剪贴板 / 通知）各自的错误枚举。
//! HTTP 状态码映射见 `transfer::http_server`。

/// 文件上传错误
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// 缺少必填字段（字段名首字母大写，如 "File"、"Hash"）
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Invalid multipart request: {0}")]
    Multipart(String),

    #[error("Upload exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
}

/// 文本上传错误
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Content is required")]
    EmptyContent,

    #[error("Failed to update clipboard: {0}")]
    Clipboard(#[from] SinkError),
}

/// 剪贴板 / 通知协作者错误
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Notification error: {0}")]
    Notification(String),
}
