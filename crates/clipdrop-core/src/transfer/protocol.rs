//! 推送通道与 HTTP 响应的消息格式
//!
//! 进度事件以 JSON 文本帧推送：
//! - `{"status":"uploading","progress":42.0,"uploadId":"…"}`
//! - `{"status":"completed","path":"documents/a.txt","uploadId":"…"}`

use serde::{Deserialize, Serialize};

/// 上传进度事件
///
/// 构造后不可变，按值广播给每个订阅者。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    Uploading {
        #[serde(rename = "progress")]
        percent: f64,
        #[serde(rename = "uploadId")]
        upload_id: String,
    },
    Completed {
        path: String,
        #[serde(rename = "uploadId")]
        upload_id: String,
    },
}

impl ProgressEvent {
    pub fn uploading(upload_id: &str, percent: f64) -> Self {
        Self::Uploading {
            percent,
            upload_id: upload_id.to_string(),
        }
    }

    pub fn completed(upload_id: &str, path: impl Into<String>) -> Self {
        Self::Completed {
            path: path.into(),
            upload_id: upload_id.to_string(),
        }
    }

    /// 事件所属的上传会话
    pub fn upload_id(&self) -> &str {
        match self {
            Self::Uploading { upload_id, .. } | Self::Completed { upload_id, .. } => upload_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// 错误响应 `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// 文本上传成功响应
#[derive(Debug, Serialize, Deserialize)]
pub struct TextUploadResponse {
    pub status: String,
    pub content: String,
}

/// 文件上传成功响应
#[derive(Debug, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub status: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploading_wire_format() {
        let event = ProgressEvent::uploading("u1", 50.0);
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["status"], "uploading");
        assert_eq!(json["progress"], 50.0);
        assert_eq!(json["uploadId"], "u1");
        assert!(json.get("percent").is_none());
    }

    #[test]
    fn test_completed_wire_format() {
        let event = ProgressEvent::completed("u1", "documents/a.txt");
        let text = serde_json::to_string(&event).unwrap();
        let parsed: ProgressEvent = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed, event);
        assert!(parsed.is_terminal());
        assert_eq!(parsed.upload_id(), "u1");
        assert!(text.contains("\"status\":\"completed\""));
    }
}
