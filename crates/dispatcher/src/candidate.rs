use fleet_core::models::{DriveOrder, TransportOrder, Vehicle};

/// 分配候选：车辆、运输订单以及路由服务为该组合计算出的行驶订单
///
/// 仅在一次调度周期内存在，从不持久化。
#[derive(Debug, Clone)]
pub struct AssignmentCandidate {
    pub vehicle: Vehicle,
    pub transport_order: TransportOrder,
    pub drive_orders: Vec<DriveOrder>,
}

impl AssignmentCandidate {
    pub fn new(vehicle: Vehicle, transport_order: TransportOrder, drive_orders: Vec<DriveOrder>) -> Self {
        Self {
            vehicle,
            transport_order,
            drive_orders,
        }
    }

    /// 全部分段的路线代价之和
    pub fn completely_routed_costs(&self) -> u64 {
        self.drive_orders
            .iter()
            .filter_map(|drive_order| drive_order.route.as_ref())
            .map(|route| route.costs)
            .sum()
    }

    /// 到达第一个目的地的代价
    pub fn initial_routing_costs(&self) -> u64 {
        self.drive_orders
            .first()
            .and_then(|drive_order| drive_order.route.as_ref())
            .map(|route| route.costs)
            .unwrap_or_default()
    }
}
