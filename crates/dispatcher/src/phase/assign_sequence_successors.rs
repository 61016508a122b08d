use std::sync::Arc;

use fleet_core::{
    models::{OrderState, ProcState, Vehicle},
    DispatchResult,
};
use tracing::{debug, error, warn};

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

/// 订单序列后继分配：绑定在序列上的空闲车辆继续执行序列的下一个订单
pub struct AssignSequenceSuccessorsPhase {
    lifecycle: Lifecycle,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
    candidate_filter: CandidateSelectionFilter,
}

impl AssignSequenceSuccessorsPhase {
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

    fn try_assign_successor(
        &self,
        vehicle: &Vehicle,
        reservations: &OrderReservationPool,
    ) -> DispatchResult<()> {
        let Some(sequence_ref) = &vehicle.order_sequence else {
            return Ok(());
        };

        let Some(sequence) = self.services.orders.fetch_order_sequence(sequence_ref) else {
            warn!("车辆 {} 绑定的序列 {} 不存在，解除绑定", vehicle.name, sequence_ref);
            return self
                .services
                .vehicles
                .update_vehicle_order_sequence(&vehicle.name, None);
        };

        if sequence.finished {
            return self
                .services
                .vehicles
                .update_vehicle_order_sequence(&vehicle.name, None);
        }

        let Some(order) = sequence
            .next_unfinished_order()
            .and_then(|order| self.services.orders.fetch_transport_order(order))
        else {
            debug!("序列 {} 暂无后续订单", sequence_ref);
            return Ok(());
        };

        if !order.has_state(OrderState::Dispatchable) {
            return Ok(());
        }

        let Some(candidate) = compute_candidate(&self.services, vehicle, &order) else {
            debug!("车辆 {} 无法到达序列订单 {}", vehicle.name, order.name);
            return Ok(());
        };

        let reasons = self
            .candidate_filter
            .apply(&candidate, &SelectionContext::new(reservations));
        if !reasons.is_empty() {
            debug!("序列候选 {} -> {} 被拒绝: {:?}", order.name, vehicle.name, reasons);
            return Ok(());
        }

        self.util
            .assign_transport_order(vehicle, &order, candidate.drive_orders)
    }
}

impl Phase for AssignSequenceSuccessorsPhase {
    fn name(&self) -> &'static str {
        "AssignSequenceSuccessors"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn run(&mut self, reservations: &mut OrderReservationPool) -> DispatchResult<()> {
        for vehicle in self.services.vehicles.fetch_vehicles() {
            if vehicle.has_proc_state(ProcState::Idle)
                && vehicle.is_to_be_utilized()
                && vehicle.current_position.is_some()
                && !self.util.has_failed_controller(&vehicle.name)
            {
                if let Err(e) = self.try_assign_successor(&vehicle, reservations) {
                    error!("为车辆 {} 分配序列后继订单失败: {}", vehicle.name, e);
                }
            }
        }

        Ok(())
    }
}
