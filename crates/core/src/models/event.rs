use serde::{Deserialize, Serialize};

use super::{TransportOrder, Vehicle};

/// 车队模型的对象变更事件
///
/// `previous` 为空表示对象新建，`current` 为空表示对象被删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FleetEvent {
    Vehicle {
        previous: Option<Box<Vehicle>>,
        current: Option<Box<Vehicle>>,
    },
    TransportOrder {
        previous: Option<Box<TransportOrder>>,
        current: Option<Box<TransportOrder>>,
    },
}

impl FleetEvent {
    pub fn vehicle_changed(previous: Option<Vehicle>, current: Option<Vehicle>) -> Self {
        Self::Vehicle {
            previous: previous.map(Box::new),
            current: current.map(Box::new),
        }
    }

    pub fn order_changed(
        previous: Option<TransportOrder>,
        current: Option<TransportOrder>,
    ) -> Self {
        Self::TransportOrder {
            previous: previous.map(Box::new),
            current: current.map(Box::new),
        }
    }

    /// 事件涉及对象的名称
    pub fn object_name(&self) -> &str {
        match self {
            Self::Vehicle { previous, current } => current
                .as_ref()
                .or(previous.as_ref())
                .map(|v| v.name.name())
                .unwrap_or_default(),
            Self::TransportOrder { previous, current } => current
                .as_ref()
                .or(previous.as_ref())
                .map(|o| o.name.name())
                .unwrap_or_default(),
        }
    }
}
