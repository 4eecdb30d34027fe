//! HTTP 服务器
//!
//! # 路由
//!
//! - `POST /upload/text`: 表单字段 `content`，写入剪贴板
//! - `POST /upload/file`: multipart（`file`、`hash`，可选 `size`），分块落盘并校验
//! - `GET /ws`: 进度推送通道
//! - `GET /health`: 存活检查

use log::{debug, error, info};

use crate::config::ServerSettings;
use crate::error::{IngestError, UploadError};
use crate::registry::SubscriberRegistry;
use crate::sinks::{
    ClipboardSink, DesktopNotifier, DisabledClipboard, DisabledNotifier, NotificationSink,
    SystemClipboard,
};
use crate::transfer::protocol::{ErrorBody, FileUploadResponse, TextUploadResponse};
use crate::transfer::websocket_handler::ws_handler;
use crate::upload::{PipelineConfig, TextIngest, UploadPipeline, UploadSession};
use axum::{
    Form, Json, Router,
    async_trait,
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Request, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::io::StreamReader;
use tower_http::trace::TraceLayer;

/// multipart 包装开销的余量
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// `hash`、`size` 等小字段的字节上限
const MAX_SMALL_FIELD: usize = 128;

/// 服务器共享状态
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
    pub text: Arc<TextIngest>,
    pub registry: SubscriberRegistry,
    body_limit: usize,
}

impl AppState {
    /// 按配置选择系统剪贴板 / 桌面通知或其禁用版本
    pub fn from_settings(settings: &ServerSettings) -> Self {
        let clipboard: Arc<dyn ClipboardSink> = if settings.clipboard {
            Arc::new(SystemClipboard::new())
        } else {
            Arc::new(DisabledClipboard)
        };
        let notifier: Arc<dyn NotificationSink> = if settings.notifications {
            Arc::new(DesktopNotifier::default())
        } else {
            Arc::new(DisabledNotifier)
        };
        Self::with_sinks(settings, clipboard, notifier)
    }

    pub fn with_sinks(
        settings: &ServerSettings,
        clipboard: Arc<dyn ClipboardSink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let registry = SubscriberRegistry::new(settings.subscriber_queue);
        let pipeline = UploadPipeline::new(
            PipelineConfig {
                upload_dir: settings.upload_dir.clone(),
                chunk_size: settings.chunk_size,
                max_upload_size: settings.max_upload_size,
            },
            registry.clone(),
            clipboard.clone(),
            notifier.clone(),
        );

        Self {
            pipeline: Arc::new(pipeline),
            text: Arc::new(TextIngest::new(clipboard, notifier)),
            registry,
            body_limit: usize::try_from(settings.max_upload_size)
                .unwrap_or(usize::MAX)
                .saturating_add(MULTIPART_OVERHEAD),
        }
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        .route("/upload/text", post(upload_text))
        .route("/upload/file", post(upload_file))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 按配置绑定端口并运行，直到 `shutdown` 完成
pub async fn start_http_server<F>(settings: &ServerSettings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::from_settings(settings);
    let listener = TcpListener::bind(settings.bind_address()).await?;
    info!(
        "HTTP server listening on {}, saving uploads to {:?}",
        listener.local_addr()?,
        settings.upload_dir
    );
    serve(listener, state, shutdown).await
}

/// 在已绑定的监听器上运行
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct TextForm {
    #[serde(default)]
    pub content: Option<String>,
}

/// 文本上传的 `content` 字段，urlencoded 与 multipart 表单均可
///
/// 表单无法解析时按缺少内容处理。
pub struct TextContent(pub Option<String>);

#[async_trait]
impl<S> FromRequest<S> for TextContent
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

        if !is_multipart {
            let content = Form::<TextForm>::from_request(req, state)
                .await
                .ok()
                .and_then(|Form(form)| form.content);
            return Ok(Self(content));
        }

        let Ok(mut multipart) = Multipart::from_request(req, state).await else {
            return Ok(Self(None));
        };
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some("content") {
                return Ok(Self(field.text().await.ok()));
            }
        }
        Ok(Self(None))
    }
}

/// POST /upload/text
async fn upload_text(
    State(state): State<AppState>,
    TextContent(content): TextContent,
) -> Result<Json<TextUploadResponse>, IngestError> {
    let content = content.unwrap_or_default();

    state.text.ingest(&content).await?;

    Ok(Json(TextUploadResponse {
        status: "success".to_string(),
        content,
    }))
}

/// POST /upload/file
async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<FileUploadResponse>, UploadError> {
    let mut fields = UploadFields::default();
    let outcome = read_fields(&state, content_length(&headers), &mut multipart, &mut fields).await;

    let session = fields.session.take();
    if let Err(e) = outcome {
        if let Some(session) = session {
            state.pipeline.discard(session).await;
        }
        return Err(e);
    }

    let Some(session) = session else {
        return Err(UploadError::MissingField("File"));
    };

    let Some(hash) = fields.hash.filter(|h| !h.trim().is_empty()) else {
        state.pipeline.discard(session).await;
        return Err(UploadError::MissingField("Hash"));
    };

    let path = state.pipeline.finalize(session, &hash).await?;

    Ok(Json(FileUploadResponse {
        status: "success".to_string(),
        path: path.display().to_string(),
    }))
}

/// multipart 中已读取的字段
#[derive(Default)]
struct UploadFields {
    hash: Option<String>,
    declared_size: Option<u64>,
    session: Option<UploadSession>,
}

/// 逐个读取 multipart 字段；文件内容边读边写，不在内存中缓存
///
/// 进度分母依次取 `size` 字段、文件部分自身的 Content-Length、整个请求的
/// Content-Length；都没有时为 0（未知）。最后一块总是报告 100。
async fn read_fields(
    state: &AppState,
    request_length: Option<u64>,
    multipart: &mut Multipart,
    fields: &mut UploadFields,
) -> Result<(), UploadError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(ToOwned::to_owned);

        match name.as_deref() {
            Some("file") if fields.session.is_none() => {
                let file_name = field
                    .file_name()
                    .map(ToOwned::to_owned)
                    .ok_or(UploadError::MissingField("File"))?;
                let declared = fields
                    .declared_size
                    .or_else(|| content_length(field.headers()))
                    .or(request_length)
                    .unwrap_or(0);

                let reader = StreamReader::new(field.map_err(std::io::Error::other));
                let session = state.pipeline.receive(reader, &file_name, declared).await?;
                fields.session = Some(session);
            }
            Some("hash") => {
                fields.hash = Some(read_small_field(field).await?);
            }
            Some("size") => {
                let text = read_small_field(field).await?;
                fields.declared_size = text.trim().parse().ok();
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }
    Ok(())
}

fn multipart_error(e: MultipartError) -> UploadError {
    UploadError::Multipart(e.body_text())
}

/// 读取短文本字段，超过 `MAX_SMALL_FIELD` 即拒绝
async fn read_small_field(mut field: Field<'_>) -> Result<String, UploadError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > MAX_SMALL_FIELD {
            return Err(UploadError::Multipart(format!(
                "field {:?} exceeds {MAX_SMALL_FIELD} bytes",
                field.name().unwrap_or_default()
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(|e| UploadError::Multipart(e.to_string()))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    subscribers: usize,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        subscribers: state.registry.len().await,
    })
}

// ============================================================================
// Error Response
// ============================================================================

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            UploadError::MissingField(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            UploadError::InvalidFileName(_) => {
                (StatusCode::BAD_REQUEST, "Invalid file name".to_string())
            }
            UploadError::Multipart(detail) => {
                debug!("Rejected multipart body: {}", detail);
                (
                    StatusCode::BAD_REQUEST,
                    "Invalid multipart request".to_string(),
                )
            }
            UploadError::TooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "File too large".to_string())
            }
            UploadError::Io(e) => {
                error!("Upload IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save file".to_string(),
                )
            }
            UploadError::IntegrityMismatch { .. } => (
                StatusCode::BAD_REQUEST,
                "File integrity check failed".to_string(),
            ),
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            IngestError::EmptyContent => (StatusCode::BAD_REQUEST, "Content is required"),
            IngestError::Clipboard(e) => {
                error!("Text upload failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update clipboard",
                )
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}
