use thiserror::Error;

use crate::models::{OrderRef, SequenceRef, VehicleRef};

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("对象未找到: {kind} '{name}'")]
    ObjectUnknown { kind: &'static str, name: String },

    #[error("调度器未初始化")]
    NotInitialized,

    #[error("调度阶段 {phase} 执行失败: {message}")]
    PhaseFailed { phase: String, message: String },

    #[error("无效的状态: {0}")]
    IllegalState(String),

    #[error("车辆控制器错误: {0}")]
    VehicleController(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn vehicle_unknown(vehicle: &VehicleRef) -> Self {
        Self::ObjectUnknown {
            kind: "Vehicle",
            name: vehicle.to_string(),
        }
    }

    pub fn order_unknown(order: &OrderRef) -> Self {
        Self::ObjectUnknown {
            kind: "TransportOrder",
            name: order.to_string(),
        }
    }

    pub fn sequence_unknown(sequence: &SequenceRef) -> Self {
        Self::ObjectUnknown {
            kind: "OrderSequence",
            name: sequence.to_string(),
        }
    }

    /// 是否为引用失效类错误（调用方传入了未知对象）
    pub fn is_object_unknown(&self) -> bool {
        matches!(self, Self::ObjectUnknown { .. })
    }
}
