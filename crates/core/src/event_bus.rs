use tokio::sync::broadcast;
use tracing::trace;

use crate::models::FleetEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// 车队事件总线
///
/// 基于 Tokio broadcast channel，对象服务在每次变更后发布事件，调度器等组件订阅。
/// 没有订阅者时发布的事件会被直接丢弃。
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FleetEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件，返回收到事件的订阅者数量
    pub fn publish(&self, event: FleetEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("事件总线没有订阅者，事件被丢弃");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
