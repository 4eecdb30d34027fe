//! Clipdrop Daemon
//!
//! 后台守护进程，负责：
//! - 接收手机等设备推送的文本与文件
//! - 写入系统剪贴板、发送桌面通知
//! - 通过 WebSocket 推送上传进度

mod service;

use anyhow::Result;
use clap::Parser;
use clipdrop_core::{LogLevel, ServerSettings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clipdrop-daemon")]
#[command(about = "Receive clipboard text and files over the local network")]
#[command(version)]
struct Args {
    /// 配置文件路径（默认 ~/.config/clipdrop/settings.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 监听地址
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 上传文件保存目录
    #[arg(short = 'd', long)]
    upload_dir: Option<PathBuf>,

    /// 不写入系统剪贴板
    #[arg(long)]
    no_clipboard: bool,

    /// 不发送桌面通知
    #[arg(long)]
    no_notify: bool,

    /// 日志级别 (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

impl Args {
    /// 命令行参数覆盖配置文件
    fn into_settings(self) -> ServerSettings {
        let mut settings = match &self.config {
            Some(path) => ServerSettings::load_from(path),
            None => ServerSettings::load(),
        };

        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = self.upload_dir {
            settings.upload_dir = dir;
        }
        if self.no_clipboard {
            settings.clipboard = false;
        }
        if self.no_notify {
            settings.notifications = false;
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Args::parse().into_settings();

    // 桥接 log crate（clipdrop-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    // RUST_LOG 优先于配置中的日志级别
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.filter_directive())),
        )
        .try_init();

    tracing::info!("Clipdrop Daemon starting...");

    service::run_service(settings).await
}
