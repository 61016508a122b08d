use tracing::{debug, info, warn};

use fleet_core::{
    models::{DriveOrderState, OrderState, ProcState, Vehicle},
    DispatchResult,
};

use crate::services::DispatchServices;

/// 重新规划正在执行订单的车辆的剩余分段
pub struct RerouteUtil {
    services: DispatchServices,
}

impl RerouteUtil {
    pub fn new(services: DispatchServices) -> Self {
        Self { services }
    }

    /// 返回成功重新规划的车辆数
    pub fn reroute_all(&self) -> DispatchResult<usize> {
        let mut rerouted = 0;

        for vehicle in self.services.vehicles.fetch_vehicles() {
            if vehicle.has_proc_state(ProcState::Idle) || vehicle.transport_order.is_none() {
                continue;
            }
            if self.reroute(&vehicle)? {
                rerouted += 1;
            }
        }

        info!("拓扑变化后重新规划了 {} 辆车的路线", rerouted);
        Ok(rerouted)
    }

    /// 从当前分段的终点开始，为尚未开始的分段重新规划路线
    ///
    /// 找不到新路线时保留原路线。
    pub fn reroute(&self, vehicle: &Vehicle) -> DispatchResult<bool> {
        let Some(order) = vehicle
            .transport_order
            .as_ref()
            .and_then(|order| self.services.orders.fetch_transport_order(order))
        else {
            return Ok(false);
        };

        if !order.has_state(OrderState::BeingProcessed) {
            return Ok(false);
        }

        let Some(first_pending) = order.next_drive_order_index() else {
            debug!("订单 {} 没有待执行的分段", order.name);
            return Ok(false);
        };

        let origin = order
            .current_drive_order()
            .and_then(|drive_order| drive_order.route.as_ref())
            .and_then(|route| route.final_destination_point())
            .or(vehicle.current_position.as_ref())
            .and_then(|point| self.services.plant.fetch_point(point));
        let Some(origin) = origin else {
            warn!("无法确定车辆 {} 的重新规划起点", vehicle.name);
            return Ok(false);
        };

        let mut pending = order.clone();
        pending.drive_orders = order.drive_orders[first_pending..].to_vec();

        let Some(new_legs) = self.services.router.get_route(vehicle, &origin, &pending) else {
            warn!(
                "车辆 {} 的订单 {} 找不到新路线，保留原路线",
                vehicle.name, order.name
            );
            return Ok(false);
        };

        if new_legs.len() != pending.drive_orders.len() {
            warn!(
                "路由返回的分段数 {} 与待执行分段数 {} 不一致，保留原路线",
                new_legs.len(),
                pending.drive_orders.len()
            );
            return Ok(false);
        }

        let mut drive_orders = order.drive_orders[..first_pending].to_vec();
        drive_orders.extend(new_legs.into_iter().map(|mut leg| {
            leg.state = DriveOrderState::Pristine;
            leg
        }));

        self.services
            .orders
            .update_transport_order_drive_orders(&order.name, drive_orders)?;

        metrics::counter!("fleet_dispatch_reroutes_total").increment(1);
        debug!("车辆 {} 的订单 {} 已重新规划", vehicle.name, order.name);

        Ok(true)
    }
}
