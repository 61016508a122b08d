use std::sync::Arc;

use fleet_core::{
    models::{OrderState, ProcState},
    DispatchResult,
};
use tracing::{debug, error};

use super::{Lifecycle, Phase};
use crate::{
    reservation_pool::OrderReservationPool, services::DispatchServices,
    transport_order_util::TransportOrderUtil,
};

/// 撤回收尾：已撤回订单的车辆结束当前分段后，完成中止并释放车辆
pub struct FinishWithdrawalsPhase {
    lifecycle: Lifecycle,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
}

impl FinishWithdrawalsPhase {
    pub fn new(services: DispatchServices, util: Arc<TransportOrderUtil>) -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            services,
            util,
        }
    }
}

impl Phase for FinishWithdrawalsPhase {
    fn name(&self) -> &'static str {
        "FinishWithdrawals"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn run(&mut self, _reservations: &mut OrderReservationPool) -> DispatchResult<()> {
        for vehicle in self.services.vehicles.fetch_vehicles() {
            if !vehicle.has_proc_state(ProcState::AwaitingOrder) {
                continue;
            }
            let Some(order) = vehicle
                .transport_order
                .as_ref()
                .and_then(|order| self.services.orders.fetch_transport_order(order))
            else {
                continue;
            };

            if order.has_state(OrderState::Withdrawn) {
                debug!("车辆 {} 已停下，完成订单 {} 的撤回", vehicle.name, order.name);
                if let Err(e) = self.util.finish_abortion(&order, &vehicle.name) {
                    error!("完成车辆 {} 的订单 {} 撤回失败: {}", vehicle.name, order.name, e);
                }
            }
        }

        Ok(())
    }
}
