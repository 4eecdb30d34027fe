//! 进度订阅者注册表
//!
//! 每个订阅者是一个有界队列的发送端，由 WebSocket 连接任务消费。
//! 增删与广播都在同一把锁内完成；广播使用非阻塞 `try_send`，
//! 队列已关闭或已满的订阅者会被就地移除，不影响其他订阅者。

use crate::transfer::protocol::ProgressEvent;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::TrySendError;

/// 订阅者标识
pub type SubscriberId = u64;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// 一次订阅：注册表分配的 ID 与事件接收端
pub struct Subscription {
    pub id: SubscriberId,
    pub events: mpsc::Receiver<ProgressEvent>,
}

/// 订阅者注册表（可廉价克隆，共享同一集合）
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    next_id: AtomicU64,
    queue_capacity: usize,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<ProgressEvent>>>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// 注册一个已有的发送端
    pub async fn add(&self, sender: mpsc::Sender<ProgressEvent>) -> SubscriberId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.inner.subscribers.lock().await;
        subscribers.insert(id, sender);
        debug!("Subscriber {} added ({} live)", id, subscribers.len());
        id
    }

    /// 创建队列并注册，返回接收端
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);
        let id = self.add(tx).await;
        Subscription { id, events: rx }
    }

    /// 移除订阅者（幂等），返回此次调用是否真的移除了
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.inner.subscribers.lock().await;
        let removed = subscribers.remove(&id).is_some();
        if removed {
            debug!("Subscriber {} removed ({} live)", id, subscribers.len());
        }
        removed
    }

    /// 向所有当前订阅者投递事件，返回成功投递的数量
    pub async fn broadcast(&self, event: &ProgressEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock().await;
        let mut delivered = 0;

        subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber {} is not keeping up, dropping it", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} disconnected, dropping it", id);
                false
            }
        });

        delivered
    }

    pub async fn len(&self) -> usize {
        self.inner.subscribers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(percent: f64) -> ProgressEvent {
        ProgressEvent::uploading("test", percent)
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let registry = SubscriberRegistry::default();
        assert_eq!(registry.broadcast(&progress(10.0)).await, 0);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let registry = SubscriberRegistry::default();
        let mut a = registry.subscribe().await;
        let mut b = registry.subscribe().await;
        assert_ne!(a.id, b.id);

        assert_eq!(registry.broadcast(&progress(25.0)).await, 2);
        assert_eq!(registry.broadcast(&progress(50.0)).await, 2);

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.events.recv().await, Some(progress(25.0)));
            assert_eq!(sub.events.recv().await, Some(progress(50.0)));
        }
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = SubscriberRegistry::default();
        let sub = registry.subscribe().await;

        assert!(registry.remove(sub.id).await);
        assert!(!registry.remove(sub.id).await);
        assert!(!registry.remove(9999).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_dropped() {
        let registry = SubscriberRegistry::default();
        let dead = registry.subscribe().await;
        let mut alive = registry.subscribe().await;
        drop(dead.events);

        assert_eq!(registry.broadcast(&progress(1.0)).await, 1);
        assert_eq!(registry.len().await, 1);
        assert_eq!(alive.events.recv().await, Some(progress(1.0)));
    }

    #[tokio::test]
    async fn test_full_subscriber_is_dropped() {
        let registry = SubscriberRegistry::new(1);
        let mut slow = registry.subscribe().await;
        let mut fast = registry.subscribe().await;

        assert_eq!(registry.broadcast(&progress(1.0)).await, 2);
        fast.events.recv().await.unwrap();

        // slow 的队列仍满，第二次广播将其移除
        assert_eq!(registry.broadcast(&progress(2.0)).await, 1);
        assert_eq!(registry.len().await, 1);

        assert_eq!(slow.events.recv().await, Some(progress(1.0)));
        assert_eq!(slow.events.recv().await, None);
        assert_eq!(fast.events.recv().await, Some(progress(2.0)));
    }

    #[tokio::test]
    async fn test_concurrent_add_and_broadcast() {
        let registry = SubscriberRegistry::default();
        let mut handles = Vec::new();

        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let sub = registry.subscribe().await;
                registry.broadcast(&progress(5.0)).await;
                sub
            }));
        }

        let mut subs = Vec::new();
        for handle in handles {
            subs.push(handle.await.unwrap());
        }

        assert_eq!(registry.len().await, 16);
        for sub in &mut subs {
            // 每个订阅者至少收到自己注册后发出的那次广播
            assert!(sub.events.try_recv().is_ok());
        }
    }
}
