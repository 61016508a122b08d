use std::sync::Arc;

use fleet_core::{
    models::{OrderState, TransportOrder, Vehicle},
    DispatchResult, DispatcherConfig,
};
use tracing::{debug, error, info, warn};

use super::{compute_candidate, Lifecycle, Phase};
use crate::{
    candidate::AssignmentCandidate,
    priorization::{CandidateComparator, OrderComparator, VehicleComparator},
    reservation_pool::OrderReservationPool,
    selection::{
        CandidateSelectionFilter, HasCompleteRoute, IsAvailableForAnyOrder,
        IsFreelyDispatchableToAnyVehicle, IsNextInSequence, IsNotBoundToSequence,
        IsNotProcessingOrder, IsProcessableByVehicle, IsReservableForFutureOrder,
        OrderSelectionFilter, SelectionContext, SelectionFilter, VehicleSelectionFilter,
    },
    services::DispatchServices,
    transport_order_util::TransportOrderUtil,
};

/// 自由订单分配
///
/// 按优先级遍历可自由分配的订单，为每个订单在剩余车辆中选出代价最低的候选。
/// 空闲车辆直接分配；正在执行最后一个分段的车辆只做预留，待其空闲后由预留阶段分配。
pub struct AssignFreeOrdersPhase {
    lifecycle: Lifecycle,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
    reserve_orders_for_busy_vehicles: bool,
    dismiss_unroutable_orders: bool,
    order_filter: OrderSelectionFilter,
    idle_vehicle_filter: VehicleSelectionFilter,
    busy_vehicle_filter: VehicleSelectionFilter,
    candidate_filter: CandidateSelectionFilter,
    order_comparator: OrderComparator,
    vehicle_comparator: VehicleComparator,
    candidate_comparator: CandidateComparator,
}

impl AssignFreeOrdersPhase {
    pub fn new(
        config: &DispatcherConfig,
        services: DispatchServices,
        util: Arc<TransportOrderUtil>,
    ) -> Self {
        let order_comparator = OrderComparator::new(config.order_priorities.clone());
        let vehicle_comparator = VehicleComparator::new(config.vehicle_priorities.clone());

        Self {
            lifecycle: Lifecycle::default(),
            order_filter: OrderSelectionFilter::empty()
                .with(IsFreelyDispatchableToAnyVehicle::new(services.orders.clone()))
                .with(IsNextInSequence::new(services.orders.clone())),
            idle_vehicle_filter: VehicleSelectionFilter::empty()
                .with(IsAvailableForAnyOrder)
                .with(IsNotProcessingOrder)
                .with(IsNotBoundToSequence::new(services.orders.clone())),
            busy_vehicle_filter: VehicleSelectionFilter::empty()
                .with(IsReservableForFutureOrder::new(services.orders.clone())),
            candidate_filter: CandidateSelectionFilter::empty()
                .with(IsProcessableByVehicle)
                .with(HasCompleteRoute),
            candidate_comparator: CandidateComparator::new(
                vehicle_comparator.clone(),
                order_comparator.clone(),
            ),
            order_comparator,
            vehicle_comparator,
            reserve_orders_for_busy_vehicles: config.reserve_orders_for_busy_vehicles,
            dismiss_unroutable_orders: config.dismiss_unroutable_transport_orders,
            services,
            util,
        }
    }

    /// 没有任何车辆能规划路线的订单置为 `UNROUTABLE`
    fn dismiss_unroutable(&self, reservations: &mut OrderReservationPool) {
        for order in self.services.orders.fetch_transport_orders() {
            if order.has_state(OrderState::Dispatchable)
                && !self.services.router.check_routability(&order)
            {
                warn!("订单 {} 不可路由，标记为 UNROUTABLE", order.name);
                reservations.remove_reservation(&order.name);
                if let Err(e) = self
                    .services
                    .orders
                    .update_transport_order_state(&order.name, OrderState::Unroutable)
                {
                    error!("标记订单 {} 为 UNROUTABLE 失败: {}", order.name, e);
                }
            }
        }
    }

    fn assignable_orders(&self, reservations: &OrderReservationPool) -> Vec<TransportOrder> {
        let ctx = SelectionContext::new(reservations);
        let mut orders: Vec<TransportOrder> = self
            .services
            .orders
            .fetch_transport_orders()
            .into_iter()
            .filter(|order| {
                let reasons = self.order_filter.apply(order, &ctx);
                if !reasons.is_empty() && order.has_state(OrderState::Dispatchable) {
                    debug!("订单 {} 暂不可分配: {:?}", order.name, reasons);
                }
                reasons.is_empty()
            })
            .collect();

        self.order_comparator.sort(&mut orders);
        orders
    }

    fn vehicle_pool(&self, reservations: &OrderReservationPool) -> Vec<Vehicle> {
        let ctx = SelectionContext::new(reservations);
        let mut vehicles: Vec<Vehicle> = self
            .services
            .vehicles
            .fetch_vehicles()
            .into_iter()
            .filter(|vehicle| !self.util.has_failed_controller(&vehicle.name))
            .filter(|vehicle| {
                self.idle_vehicle_filter.accepts(vehicle, &ctx)
                    || (self.reserve_orders_for_busy_vehicles
                        && self.busy_vehicle_filter.accepts(vehicle, &ctx))
            })
            .collect();

        self.vehicle_comparator.sort(&mut vehicles);
        vehicles
    }

    fn best_candidate(
        &self,
        order: &TransportOrder,
        vehicles: &[Vehicle],
        reservations: &OrderReservationPool,
    ) -> Option<AssignmentCandidate> {
        let ctx = SelectionContext::new(reservations);
        let candidates: Vec<AssignmentCandidate> = vehicles
            .iter()
            .filter_map(|vehicle| compute_candidate(&self.services, vehicle, order))
            .filter(|candidate| {
                let reasons = self.candidate_filter.apply(candidate, &ctx);
                if !reasons.is_empty() {
                    debug!(
                        "候选 {} -> {} 被拒绝: {:?}",
                        order.name, candidate.vehicle.name, reasons
                    );
                }
                reasons.is_empty()
            })
            .collect();

        self.candidate_comparator.best(candidates)
    }
}

impl Phase for AssignFreeOrdersPhase {
    fn name(&self) -> &'static str {
        "AssignFreeOrders"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn run(&mut self, reservations: &mut OrderReservationPool) -> DispatchResult<()> {
        if self.dismiss_unroutable_orders {
            self.dismiss_unroutable(reservations);
        }

        let orders = self.assignable_orders(reservations);
        if orders.is_empty() {
            return Ok(());
        }

        let mut vehicles = self.vehicle_pool(reservations);

        for order in orders {
            if vehicles.is_empty() {
                break;
            }

            let Some(candidate) = self.best_candidate(&order, &vehicles, reservations) else {
                debug!("订单 {} 本周期没有可用的候选", order.name);
                continue;
            };

            vehicles.retain(|vehicle| vehicle.name != candidate.vehicle.name);

            if candidate.vehicle.transport_order.is_none() {
                if let Err(e) = self.util.assign_transport_order(
                    &candidate.vehicle,
                    &candidate.transport_order,
                    candidate.drive_orders,
                ) {
                    error!(
                        "分配订单 {} 给车辆 {} 失败: {}",
                        candidate.transport_order.name, candidate.vehicle.name, e
                    );
                }
            } else {
                reservations.reserve(&candidate.vehicle.name, &candidate.transport_order.name);
                metrics::counter!("fleet_dispatch_reservations_total").increment(1);
                info!(
                    "订单 {} 已为车辆 {} 预留",
                    candidate.transport_order.name, candidate.vehicle.name
                );
            }
        }

        Ok(())
    }
}
