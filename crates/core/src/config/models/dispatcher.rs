use serde::{Deserialize, Serialize};

/// 重新规划路线的触发条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RerouteTrigger {
    /// 不自动重新规划
    None,
    /// 场地拓扑变化时重新规划
    #[default]
    TopologyChange,
}

/// 运输订单排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPriority {
    /// 创建时间早者优先
    ByAge,
    /// 截止时间早者优先，无截止时间者靠后
    ByDeadline,
    ByName,
}

/// 车辆排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehiclePriority {
    /// 电量高者优先
    ByEnergyLevel,
    ByName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub idle_vehicle_redispatching_interval_ms: u64,
    pub reroute_trigger: RerouteTrigger,
    pub order_priorities: Vec<OrderPriority>,
    pub vehicle_priorities: Vec<VehiclePriority>,
    pub reserve_orders_for_busy_vehicles: bool,
    pub dismiss_unroutable_transport_orders: bool,
    pub park_idle_vehicles: bool,
    pub recharge_idle_vehicles: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_vehicle_redispatching_interval_ms: 10_000,
            reroute_trigger: RerouteTrigger::TopologyChange,
            order_priorities: vec![OrderPriority::ByAge],
            vehicle_priorities: vec![VehiclePriority::ByEnergyLevel, VehiclePriority::ByName],
            reserve_orders_for_busy_vehicles: true,
            dismiss_unroutable_transport_orders: true,
            park_idle_vehicles: true,
            recharge_idle_vehicles: true,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.idle_vehicle_redispatching_interval_ms == 0 {
            return Err(anyhow::anyhow!("空闲车辆重新调度间隔必须大于0"));
        }

        if self.order_priorities.is_empty() {
            return Err(anyhow::anyhow!("运输订单排序键不能为空"));
        }

        if has_duplicates(&self.order_priorities) {
            return Err(anyhow::anyhow!(
                "运输订单排序键存在重复: {:?}",
                self.order_priorities
            ));
        }

        if has_duplicates(&self.vehicle_priorities) {
            return Err(anyhow::anyhow!(
                "车辆排序键存在重复: {:?}",
                self.vehicle_priorities
            ));
        }

        Ok(())
    }
}

fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[..i].contains(item))
}
