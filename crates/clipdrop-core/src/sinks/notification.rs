//! 桌面通知
//!
//! 通过 D-Bus 调用 freedesktop 通知服务 (`org.freedesktop.Notifications`)。
//! 会话总线连接在首次发送时建立并复用。

use super::NotificationSink;
use crate::error::SinkError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use zbus::Connection;
use zbus::proxy;
use zbus::zvariant::Value;

/// 通知显示时长（毫秒）
const EXPIRE_TIMEOUT_MS: i32 = 5000;

/// freedesktop 通知服务代理
#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// 发送通知，返回通知 ID
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// 桌面通知发送端
pub struct DesktopNotifier {
    app_name: String,
    connection: OnceCell<Connection>,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("clipdrop")
    }
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> zbus::Result<&Connection> {
        self.connection.get_or_try_init(Connection::session).await
    }
}

#[async_trait]
impl NotificationSink for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), SinkError> {
        let to_err = |e: zbus::Error| SinkError::Notification(e.to_string());

        let connection = self.connection().await.map_err(to_err)?;
        let proxy = NotificationsProxy::new(connection).await.map_err(to_err)?;

        let id = proxy
            .notify(
                &self.app_name,
                0,
                "",
                title,
                body,
                &[],
                HashMap::new(),
                EXPIRE_TIMEOUT_MS,
            )
            .await
            .map_err(to_err)?;

        log::debug!("Notification {} sent: {}", id, title);
        Ok(())
    }
}

/// 不发送通知，只记录日志
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl NotificationSink for DisabledNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), SinkError> {
        log::debug!("Notifications disabled: {} - {}", title, body);
        Ok(())
    }
}
