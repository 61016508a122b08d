use std::sync::Arc;

use fleet_core::{
    models::{OrderState, ProcState, Vehicle, VehicleState},
    DispatchResult,
};
use tracing::{debug, error};

use super::{compute_candidate, Lifecycle, Phase};
use crate::{
    reservation_pool::OrderReservationPool,
    selection::{
        CandidateSelectionFilter, HasCompleteRoute, IsProcessableByVehicle, SelectionContext,
        SelectionFilter,
    },
    services::DispatchServices,
    transport_order_util::TransportOrderUtil,
};

/// 预留订单分配：车辆空闲后优先执行此前为其预留的订单
///
/// 找到一个可调度的预留订单后，车辆的全部预留都被清除，即使该订单最终无法分配。
/// 预留订单都已不可调度时同样清除，车辆交给后续阶段处理。
pub struct AssignReservedOrdersPhase {
    lifecycle: Lifecycle,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
    candidate_filter: CandidateSelectionFilter,
}

impl AssignReservedOrdersPhase {
    pub fn new(services: DispatchServices, util: Arc<TransportOrderUtil>) -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            services,
            util,
            candidate_filter: CandidateSelectionFilter::empty()
                .with(IsProcessableByVehicle)
                .with(HasCompleteRoute),
        }
    }

    fn available(vehicle: &Vehicle) -> bool {
        vehicle.has_proc_state(ProcState::Idle)
            && (vehicle.has_state(VehicleState::Idle) || vehicle.has_state(VehicleState::Charging))
    }

    fn check_for_reserved_order(
        &self,
        vehicle: &Vehicle,
        reservations: &mut OrderReservationPool,
    ) -> DispatchResult<()> {
        let reserved = reservations.find_reservations(&vehicle.name);
        if reserved.is_empty() {
            return Ok(());
        }

        let Some(order) = reserved
            .iter()
            .filter_map(|order| self.services.orders.fetch_transport_order(order))
            .find(|order| order.has_state(OrderState::Dispatchable))
        else {
            debug!("车辆 {} 的预留订单均已不可调度: {:?}", vehicle.name, reserved);
            reservations.remove_reservations(&vehicle.name);
            return Ok(());
        };

        reservations.remove_reservations(&vehicle.name);

        let Some(candidate) = compute_candidate(&self.services, vehicle, &order) else {
            debug!("车辆 {} 无法执行预留订单 {}", vehicle.name, order.name);
            return Ok(());
        };

        let reasons = self
            .candidate_filter
            .apply(&candidate, &SelectionContext::new(reservations));
        if !reasons.is_empty() {
            debug!("预留候选 {} -> {} 被拒绝: {:?}", order.name, vehicle.name, reasons);
            return Ok(());
        }

        self.util
            .assign_transport_order(vehicle, &order, candidate.drive_orders)
    }
}

impl Phase for AssignReservedOrdersPhase {
    fn name(&self) -> &'static str {
        "AssignReservedOrders"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn run(&mut self, reservations: &mut OrderReservationPool) -> DispatchResult<()> {
        for vehicle in self
            .services
            .vehicles
            .fetch_vehicles()
            .into_iter()
            .filter(Self::available)
            .filter(|vehicle| !self.util.has_failed_controller(&vehicle.name))
        {
            if let Err(e) = self.check_for_reserved_order(&vehicle, reservations) {
                error!("为车辆 {} 分配预留订单失败: {}", vehicle.name, e);
            }
        }

        Ok(())
    }
}
