//! 文件上传流水线
//!
//! 接收字节流 → 分块写入目标文件 → 向订阅者广播进度 → 校验摘要 → 完成或回滚。
//!
//! 流程拆成 [`UploadPipeline::receive`] 与 [`UploadPipeline::finalize`] 两步：
//! multipart 字段顺序不固定，摘要字段可能在文件内容之后才到达。

use crate::error::UploadError;
use crate::hashing;
use crate::registry::SubscriberRegistry;
use crate::sinks::{ClipboardSink, NotificationSink};
use crate::transfer::protocol::ProgressEvent;
use crate::upload::sanitize::sanitize_file_name;
use crate::upload::session::UploadSession;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{OpenOptions, create_dir_all};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// 流水线参数
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub upload_dir: PathBuf,
    pub chunk_size: usize,
    pub max_upload_size: u64,
}

/// 文件上传流水线
pub struct UploadPipeline {
    config: PipelineConfig,
    registry: SubscriberRegistry,
    clipboard: Arc<dyn ClipboardSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl UploadPipeline {
    pub fn new(
        config: PipelineConfig,
        registry: SubscriberRegistry,
        clipboard: Arc<dyn ClipboardSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            registry,
            clipboard,
            notifier,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    /// 完整上传：接收并校验
    pub async fn ingest<R>(
        &self,
        reader: R,
        file_name: &str,
        declared_size: u64,
        expected_digest: &str,
    ) -> Result<PathBuf, UploadError>
    where
        R: AsyncRead + Send,
    {
        let session = self.receive(reader, file_name, declared_size).await?;
        self.finalize(session, expected_digest).await
    }

    /// 接收字节流并写入目标文件
    ///
    /// 每个分块写入后广播一次 `Uploading` 事件。任何失败都会删除已写入的部分文件。
    pub async fn receive<R>(
        &self,
        reader: R,
        file_name: &str,
        declared_size: u64,
    ) -> Result<UploadSession, UploadError>
    where
        R: AsyncRead + Send,
    {
        let name = sanitize_file_name(file_name)?;
        create_dir_all(&self.config.upload_dir).await?;

        let destination = self.config.upload_dir.join(&name);
        let mut session = UploadSession::new(destination, declared_size);

        info!(
            "Receiving upload {}: {:?} (declared {} bytes)",
            session.id(),
            session.destination(),
            declared_size
        );

        match self.write_chunks(reader, &mut session).await {
            Ok(()) => {
                debug!(
                    "Upload {} received {} bytes",
                    session.id(),
                    session.bytes_written()
                );
                Ok(session)
            }
            Err(e) => {
                warn!("Upload {} aborted: {}", session.id(), e);
                remove_quietly(session.destination()).await;
                Err(e)
            }
        }
    }

    async fn write_chunks<R>(&self, reader: R, session: &mut UploadSession) -> Result<(), UploadError>
    where
        R: AsyncRead + Send,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(session.destination())
            .await?;

        tokio::pin!(reader);
        let mut buffer = vec![0u8; self.config.chunk_size.max(1)];

        // 满块的进度要等下一次读取才能确定是否为最后一块
        let mut pending: Option<f64> = None;

        loop {
            let filled = fill_chunk(&mut reader, &mut buffer).await?;
            if filled == 0 {
                break;
            }
            if let Some(percent) = pending.take() {
                self.broadcast_progress(session, percent).await;
            }

            if session.bytes_written() + filled as u64 > self.config.max_upload_size {
                return Err(UploadError::TooLarge {
                    limit: self.config.max_upload_size,
                });
            }

            file.write_all(&buffer[..filled]).await?;
            let percent = session.record_chunk(filled);

            if filled < buffer.len() {
                break;
            }
            pending = Some(percent);
        }

        file.flush().await?;

        // 最后一块总是报告 100，与声明大小是否准确无关
        if session.bytes_written() > 0 {
            let percent = session.finish();
            self.broadcast_progress(session, percent).await;
        }
        Ok(())
    }

    async fn broadcast_progress(&self, session: &UploadSession, percent: f64) {
        self.registry
            .broadcast(&ProgressEvent::uploading(session.id(), percent))
            .await;
    }

    /// 校验摘要；通过则广播完成事件并调用剪贴板与通知
    pub async fn finalize(
        &self,
        session: UploadSession,
        expected_digest: &str,
    ) -> Result<PathBuf, UploadError> {
        let destination = session.destination().to_path_buf();

        let actual = match hashing::digest_file(&destination).await {
            Ok(digest) => digest,
            Err(e) => {
                remove_quietly(&destination).await;
                return Err(e.into());
            }
        };

        if !hashing::digests_match(expected_digest, &actual) {
            warn!(
                "Upload {} failed integrity check: expected {}, got {}",
                session.id(),
                expected_digest.trim(),
                actual
            );
            remove_quietly(&destination).await;
            return Err(UploadError::IntegrityMismatch {
                expected: expected_digest.trim().to_string(),
                actual,
            });
        }

        let path = destination.display().to_string();
        self.registry
            .broadcast(&ProgressEvent::completed(session.id(), path.clone()))
            .await;

        if let Err(e) = self.clipboard.write(&path).await {
            warn!("Upload {} saved but clipboard update failed: {}", session.id(), e);
        }
        if let Err(e) = self.notifier.notify("File Uploaded", &path).await {
            debug!("Notification failed: {}", e);
        }

        info!(
            "Upload {} completed: {} ({} bytes)",
            session.id(),
            path,
            session.bytes_written()
        );
        Ok(destination)
    }

    /// 丢弃一个无法校验的会话（例如缺少摘要字段）
    pub async fn discard(&self, session: UploadSession) {
        debug!("Discarding upload {}", session.id());
        remove_quietly(session.destination()).await;
    }
}

/// 读满一个分块或直到输入结束，返回实际字节数
async fn fill_chunk<R>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove {:?}: {}", path, e);
    }
}
