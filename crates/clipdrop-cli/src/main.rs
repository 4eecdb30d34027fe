//! Clipdrop CLI
//!
//! 命令行客户端，通过 HTTP / WebSocket 与守护进程通信

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::{ClipboardPayload, ClipdropClient, classify};
use clipdrop_core::{ProgressEvent, SystemClipboard};
use std::path::PathBuf;
use std::time::Duration;

/// 同步循环出错后的等待时间
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "clipdrop", version, about = "把剪贴板和文件推送到另一台机器")]
struct Cli {
    /// 守护进程地址
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 上传文本
    Text {
        /// 文本内容
        content: String,
    },
    /// 上传文件
    File {
        /// 要上传的文件路径
        path: PathBuf,
    },
    /// 查看上传进度
    Watch,
    /// 监听本机剪贴板并自动上传
    Sync {
        /// 轮询间隔 (毫秒)
        #[arg(short, long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ClipdropClient::new(&cli.server);

    match cli.command {
        Commands::Text { content } => {
            let resp = client.upload_text(&content).await?;
            println!("✅ 文本已发送: {}", resp.content);
        }
        Commands::File { path } => {
            println!("📤 上传文件: {}", path.display());
            let resp = client.upload_file(&path).await?;
            println!("✅ 已保存到: {}", resp.path);
        }
        Commands::Watch => {
            println!("👀 等待上传事件 ({})...", client.ws_url());
            client.watch(print_event).await?;
            println!("连接已关闭");
        }
        Commands::Sync { interval_ms } => {
            sync_clipboard(&client, Duration::from_millis(interval_ms)).await;
        }
    }

    Ok(())
}

fn print_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::Uploading { percent, .. } => println!("   进度: {percent:.2}%"),
        ProgressEvent::Completed { path, .. } => println!("✅ 上传完成: {path}"),
    }
}

/// 轮询剪贴板，内容变化时上传；失败只打印并延长等待
async fn sync_clipboard(client: &ClipdropClient, interval: Duration) {
    let clipboard = SystemClipboard::new();
    let mut last = String::new();

    println!("📋 同步剪贴板到 {} (Ctrl+C 退出)", client.ws_url());

    loop {
        let content = match clipboard.read_text().await {
            Ok(content) => content,
            Err(e) => {
                eprintln!("❌ 读取剪贴板失败: {e}");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };

        if content != last {
            last.clone_from(&content);

            let result = match classify(&content) {
                Some(ClipboardPayload::File(path)) => {
                    println!("📤 上传文件: {}", path.display());
                    client.upload_file(&path).await.map(|r| r.path)
                }
                Some(ClipboardPayload::Text(text)) => {
                    println!("📤 上传文本 ({} 字符)", text.chars().count());
                    client.upload_text(&text).await.map(|_| text)
                }
                None => Ok(String::new()),
            };

            if let Err(e) = result {
                eprintln!("❌ 上传失败: {e}");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        }

        tokio::time::sleep(interval).await;
    }
}
