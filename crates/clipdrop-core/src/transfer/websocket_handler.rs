//! 进度推送 WebSocket
//!
//! 每个连接注册为一个订阅者，注册表广播的事件以 JSON 文本帧转发。
//! 客户端发来的消息一律忽略，只用于感知断开。

use crate::registry::{SubscriberRegistry, Subscription};
use crate::transfer::http_server::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

/// 处理一个已升级的连接，直到任一方向结束
pub async fn handle_socket(socket: WebSocket, registry: SubscriberRegistry) {
    let (mut write, mut read) = socket.split();
    let Subscription { id, mut events } = registry.subscribe().await;
    info!("Progress subscriber {} connected", id);

    let mut forward = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode progress event: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(text)).await {
                debug!("Subscriber {} write failed: {}", id, e);
                break;
            }
        }
        if let Err(e) = write.close().await {
            debug!("Subscriber {} close failed: {}", id, e);
        }
    });

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Subscriber {} read error: {}", id, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = &mut forward => break,
        }
    }

    registry.remove(id).await;
    forward.abort();
    info!("Progress subscriber {} disconnected", id);
}
