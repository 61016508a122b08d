use std::sync::Arc;

use fleet_core::{
    models::{OrderState, ProcState},
    DispatchResult,
};
use tracing::{error, warn};

use super::{Lifecycle, Phase};
use crate::{
    reservation_pool::OrderReservationPool, services::DispatchServices,
    transport_order_util::TransportOrderUtil,
};

/// 为等待下一分段的车辆下发后续分段，没有剩余分段时结束订单
pub struct AssignNextDriveOrdersPhase {
    lifecycle: Lifecycle,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
}

impl AssignNextDriveOrdersPhase {
    pub fn new(services: DispatchServices, util: Arc<TransportOrderUtil>) -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            services,
            util,
        }
    }
}

impl Phase for AssignNextDriveOrdersPhase {
    fn name(&self) -> &'static str {
        "AssignNextDriveOrders"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn run(&mut self, _reservations: &mut OrderReservationPool) -> DispatchResult<()> {
        for vehicle in self.services.vehicles.fetch_vehicles() {
            if !vehicle.has_proc_state(ProcState::AwaitingOrder)
                || self.util.has_failed_controller(&vehicle.name)
            {
                continue;
            }
            let Some(order_ref) = &vehicle.transport_order else {
                warn!("车辆 {} 等待下一分段但没有订单", vehicle.name);
                continue;
            };
            let Some(order) = self.services.orders.fetch_transport_order(order_ref) else {
                warn!("车辆 {} 引用的订单 {} 不存在", vehicle.name, order_ref);
                continue;
            };

            if order.has_state(OrderState::BeingProcessed) {
                if let Err(e) = self.util.assign_next_drive_order(&vehicle, &order) {
                    error!("为车辆 {} 下发订单 {} 的后续分段失败: {}", vehicle.name, order.name, e);
                }
            }
        }

        Ok(())
    }
}
