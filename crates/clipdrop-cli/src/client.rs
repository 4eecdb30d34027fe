//! HTTP / WebSocket Client - 与守护进程通信

use anyhow::{Context, Result, bail};
use clipdrop_core::hashing::digest_file;
use clipdrop_core::transfer::{ErrorBody, FileUploadResponse, ProgressEvent, TextUploadResponse};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub struct ClipdropClient {
    server: String,
    http: reqwest::Client,
}

impl ClipdropClient {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// 进度通道地址：http(s) 换成 ws(s)
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.server.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.server)
        };
        format!("{base}/ws")
    }

    pub async fn upload_text(&self, content: &str) -> Result<TextUploadResponse> {
        let response = self
            .http
            .post(format!("{}/upload/text", self.server))
            .form(&[("content", content)])
            .send()
            .await
            .with_context(|| format!("无法连接到 {}", self.server))?;

        parse_response(response).await
    }

    /// 本地计算 SHA-256 后以 multipart 上传
    pub async fn upload_file(&self, path: &Path) -> Result<FileUploadResponse> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("不是文件路径: {}", path.display()))?;

        let hash = digest_file(path)
            .await
            .with_context(|| format!("无法读取 {}", path.display()))?;
        let size = tokio::fs::metadata(path).await?.len();
        let file = File::open(path)
            .await
            .with_context(|| format!("无法读取 {}", path.display()))?;

        // 以流的方式发送，不把整个文件读进内存
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let form = Form::new()
            .text("hash", hash)
            .text("size", size.to_string())
            .part(
                "file",
                Part::stream_with_length(body, size).file_name(file_name),
            );

        let response = self
            .http
            .post(format!("{}/upload/file", self.server))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("无法连接到 {}", self.server))?;

        parse_response(response).await
    }

    /// 订阅进度并逐条回调，直到服务器关闭连接
    pub async fn watch<F>(&self, mut on_event: F) -> Result<()>
    where
        F: FnMut(&ProgressEvent),
    {
        let url = self.ws_url();
        let (ws_stream, _) = connect_async(&url)
            .await
            .with_context(|| format!("无法连接到 {url}"))?;
        let (_write, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => match serde_json::from_str::<ProgressEvent>(&text) {
                    Ok(event) => on_event(&event),
                    Err(e) => eprintln!("⚠️  无法解析事件: {e}: {text}"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => bail!("{} ({})", body.error, status),
        Err(_) => bail!("服务器返回 {}", status),
    }
}

/// 剪贴板内容的上传方式
#[derive(Debug, PartialEq, Eq)]
pub enum ClipboardPayload {
    File(PathBuf),
    Text(String),
}

/// 内容是可读文件的路径则按文件上传，否则按文本上传；空内容忽略
pub fn classify(content: &str) -> Option<ClipboardPayload> {
    if content.is_empty() {
        return None;
    }

    let candidate = Path::new(content.trim());
    if candidate.is_file() && std::fs::File::open(candidate).is_ok() {
        return Some(ClipboardPayload::File(candidate.to_path_buf()));
    }
    Some(ClipboardPayload::Text(content.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipdrop_core::sinks::{DisabledClipboard, DisabledNotifier};
    use clipdrop_core::{AppState, ServerSettings, serve};
    use std::sync::Arc;

    async fn start_server(upload_dir: &Path) -> String {
        let settings = ServerSettings {
            upload_dir: upload_dir.to_path_buf(),
            ..Default::default()
        };
        let state = AppState::with_sinks(
            &settings,
            Arc::new(DisabledClipboard),
            Arc::new(DisabledNotifier),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state, std::future::pending()));
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_upload_file_streams_contents() {
        let uploads = tempfile::tempdir().unwrap();
        let server = start_server(uploads.path()).await;

        let source = tempfile::tempdir().unwrap();
        let path = source.path().join("large.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| u8::try_from(i % 251).unwrap()).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let resp = ClipdropClient::new(&server).upload_file(&path).await.unwrap();

        let stored = uploads.path().join("large.bin");
        assert_eq!(resp.path, stored.display().to_string());
        assert_eq!(tokio::fs::read(&stored).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_upload_file_missing_path() {
        let client = ClipdropClient::new("http://127.0.0.1:9");
        let err = client
            .upload_file(Path::new("/nonexistent/clipdrop/file.bin"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("无法读取"));
    }

    #[test]
    fn test_ws_url() {
        assert_eq!(
            ClipdropClient::new("http://127.0.0.1:5000/").ws_url(),
            "ws://127.0.0.1:5000/ws"
        );
        assert_eq!(
            ClipdropClient::new("https://box.lan").ws_url(),
            "wss://box.lan/ws"
        );
        assert_eq!(
            ClipdropClient::new("10.0.0.2:5000").ws_url(),
            "ws://10.0.0.2:5000/ws"
        );
    }

    #[test]
    fn test_classify_readable_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        assert_eq!(
            classify(&format!("{path}\n")),
            Some(ClipboardPayload::File(file.path().to_path_buf()))
        );
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(classify(""), None);
        assert_eq!(
            classify("just some words"),
            Some(ClipboardPayload::Text("just some words".to_string()))
        );

        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap().to_string();
        assert_eq!(
            classify(&dir_path),
            Some(ClipboardPayload::Text(dir_path.clone()))
        );
    }
}
