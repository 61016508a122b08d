use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{OrderRef, PointRef, SequenceRef, VehicleRef};

/// 车辆属性：指定的停车点（权威，不做放宽）
pub const PROPKEY_ASSIGNED_PARKING_POSITION: &str = "tcs:assignedParkingPosition";
/// 车辆属性：偏好的停车点
pub const PROPKEY_PREFERRED_PARKING_POSITION: &str = "tcs:preferredParkingPosition";
/// 车辆属性：指定的充电位置
pub const PROPKEY_ASSIGNED_RECHARGE_LOCATION: &str = "tcs:assignedRechargeLocation";
/// 车辆属性：偏好的充电位置
pub const PROPKEY_PREFERRED_RECHARGE_LOCATION: &str = "tcs:preferredRechargeLocation";

/// 车辆的订单处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcState {
    /// 未处理任何运输订单
    #[default]
    Idle,
    /// 正在执行运输订单的某个分段
    ProcessingOrder,
    /// 当前分段已完成，等待下一个分段
    AwaitingOrder,
}

/// 车辆的物理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleState {
    #[default]
    Unknown,
    Unavailable,
    Error,
    Idle,
    Executing,
    Charging,
}

/// 调度器对车辆的使用级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationLevel {
    ToBeIgnored,
    ToBeNoticed,
    ToBeRespected,
    #[default]
    ToBeUtilized,
}

/// 车辆快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: VehicleRef,
    pub proc_state: ProcState,
    pub state: VehicleState,
    pub integration_level: IntegrationLevel,
    /// 电量百分比（0-100）
    pub energy_level: u8,
    pub energy_level_critical: u8,
    pub energy_level_good: u8,
    pub current_position: Option<PointRef>,
    pub transport_order: Option<OrderRef>,
    pub order_sequence: Option<SequenceRef>,
    pub recharge_operation: String,
    pub properties: BTreeMap<String, String>,
}

impl Vehicle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: VehicleRef::new(name),
            proc_state: ProcState::Idle,
            state: VehicleState::Unknown,
            integration_level: IntegrationLevel::ToBeUtilized,
            energy_level: 100,
            energy_level_critical: 30,
            energy_level_good: 90,
            current_position: None,
            transport_order: None,
            order_sequence: None,
            recharge_operation: "CHARGE".to_string(),
            properties: BTreeMap::new(),
        }
    }

    pub fn has_proc_state(&self, proc_state: ProcState) -> bool {
        self.proc_state == proc_state
    }

    pub fn has_state(&self, state: VehicleState) -> bool {
        self.state == state
    }

    pub fn is_to_be_utilized(&self) -> bool {
        self.integration_level == IntegrationLevel::ToBeUtilized
    }

    /// 电量是否处于临界值（含）以下
    pub fn is_energy_level_critical(&self) -> bool {
        self.energy_level <= self.energy_level_critical
    }

    pub fn is_energy_level_good(&self) -> bool {
        self.energy_level >= self.energy_level_good
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
