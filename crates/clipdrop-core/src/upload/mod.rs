//! 上传模块
//!
//! 包含:
//! - 文件上传流水线（分块写入、进度广播、摘要校验）
//! - 文本上传
//! - 文件名清理

pub mod pipeline;
pub mod sanitize;
pub mod session;
pub mod text;

pub use pipeline::{PipelineConfig, UploadPipeline};
pub use sanitize::sanitize_file_name;
pub use session::UploadSession;
pub use text::TextIngest;
