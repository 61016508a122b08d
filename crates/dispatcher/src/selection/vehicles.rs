use std::sync::Arc;

use fleet_core::{
    models::{OrderState, ProcState, Vehicle, VehicleState},
    PlantModelService, TransportOrderService,
};

use super::{SelectionContext, SelectionFilter};

/// 车辆是否可以接收任意订单
///
/// 位置已知、允许调度、不是"充电中且电量临界"，并且处于空闲或等待下一分段状态。
#[derive(Debug, Default)]
pub struct IsAvailableForAnyOrder;

impl SelectionFilter<Vehicle> for IsAvailableForAnyOrder {
    fn name(&self) -> &'static str {
        "IsAvailableForAnyOrder"
    }

    fn apply(&self, vehicle: &Vehicle, _ctx: &SelectionContext<'_>) -> Vec<String> {
        let mut reasons = Vec::new();

        if vehicle.current_position.is_none() {
            reasons.push("车辆位置未知".to_string());
        }
        if !vehicle.is_to_be_utilized() {
            reasons.push(format!("车辆集成级别为 {:?}", vehicle.integration_level));
        }
        if vehicle.has_state(VehicleState::Charging) && vehicle.is_energy_level_critical() {
            reasons.push(format!(
                "车辆正在充电，电量 {}<={}",
                vehicle.energy_level, vehicle.energy_level_critical
            ));
        }
        if !vehicle.has_proc_state(ProcState::Idle)
            && !vehicle.has_proc_state(ProcState::AwaitingOrder)
        {
            reasons.push(format!("车辆处理状态为 {:?}", vehicle.proc_state));
        }

        reasons
    }
}

/// 车辆没有正在处理的运输订单
#[derive(Debug, Default)]
pub struct IsNotProcessingOrder;

impl SelectionFilter<Vehicle> for IsNotProcessingOrder {
    fn name(&self) -> &'static str {
        "IsNotProcessingOrder"
    }

    fn apply(&self, vehicle: &Vehicle, _ctx: &SelectionContext<'_>) -> Vec<String> {
        match &vehicle.transport_order {
            Some(order) => vec![format!("车辆正在处理订单 {order}")],
            None => vec![],
        }
    }
}

/// 车辆没有绑定到未结束的订单序列
pub struct IsNotBoundToSequence {
    orders: Arc<dyn TransportOrderService>,
}

impl IsNotBoundToSequence {
    pub fn new(orders: Arc<dyn TransportOrderService>) -> Self {
        Self { orders }
    }
}

impl SelectionFilter<Vehicle> for IsNotBoundToSequence {
    fn name(&self) -> &'static str {
        "IsNotBoundToSequence"
    }

    fn apply(&self, vehicle: &Vehicle, _ctx: &SelectionContext<'_>) -> Vec<String> {
        let Some(sequence_ref) = &vehicle.order_sequence else {
            return vec![];
        };

        match self.orders.fetch_order_sequence(sequence_ref) {
            Some(sequence) if sequence.finished => vec![],
            _ => vec![format!("车辆绑定在订单序列 {sequence_ref}")],
        }
    }
}

/// 车辆正在执行订单的最后一个分段，可以为其预留后续订单
pub struct IsReservableForFutureOrder {
    orders: Arc<dyn TransportOrderService>,
}

impl IsReservableForFutureOrder {
    pub fn new(orders: Arc<dyn TransportOrderService>) -> Self {
        Self { orders }
    }
}

impl SelectionFilter<Vehicle> for IsReservableForFutureOrder {
    fn name(&self) -> &'static str {
        "IsReservableForFutureOrder"
    }

    fn apply(&self, vehicle: &Vehicle, ctx: &SelectionContext<'_>) -> Vec<String> {
        let mut reasons = Vec::new();

        if !vehicle.is_to_be_utilized() {
            reasons.push(format!("车辆集成级别为 {:?}", vehicle.integration_level));
        }
        if vehicle.current_position.is_none() {
            reasons.push("车辆位置未知".to_string());
        }
        if !vehicle.has_proc_state(ProcState::ProcessingOrder) {
            reasons.push(format!("车辆处理状态为 {:?}", vehicle.proc_state));
        }
        if vehicle.order_sequence.is_some() {
            reasons.push("车辆绑定在订单序列".to_string());
        }
        if ctx.reservations.has_reservations(&vehicle.name) {
            reasons.push("车辆已有预留订单".to_string());
        }

        let on_final_leg = vehicle
            .transport_order
            .as_ref()
            .and_then(|order| self.orders.fetch_transport_order(order))
            .is_some_and(|order| {
                order.has_state(OrderState::BeingProcessed) && order.is_on_final_drive_order()
            });
        if !on_final_leg {
            reasons.push("车辆不在执行订单的最后一个分段".to_string());
        }

        reasons
    }
}

/// 车辆可以被派往停车点
pub struct IsParkable {
    plant: Arc<dyn PlantModelService>,
}

impl IsParkable {
    pub fn new(plant: Arc<dyn PlantModelService>) -> Self {
        Self { plant }
    }
}

impl SelectionFilter<Vehicle> for IsParkable {
    fn name(&self) -> &'static str {
        "IsParkable"
    }

    fn apply(&self, vehicle: &Vehicle, ctx: &SelectionContext<'_>) -> Vec<String> {
        let mut reasons = idle_vehicle_reasons(vehicle, ctx);

        if vehicle.is_energy_level_critical() {
            reasons.push("车辆电量临界，应先充电".to_string());
        }

        let on_parking_position = vehicle
            .current_position
            .as_ref()
            .and_then(|point| self.plant.fetch_point(point))
            .is_some_and(|point| point.is_parking_position());
        if on_parking_position {
            reasons.push("车辆已在停车点".to_string());
        }

        reasons
    }
}

/// 车辆电量临界且空闲，可以被派去充电
#[derive(Debug, Default)]
pub struct IsRechargeable;

impl SelectionFilter<Vehicle> for IsRechargeable {
    fn name(&self) -> &'static str {
        "IsRechargeable"
    }

    fn apply(&self, vehicle: &Vehicle, ctx: &SelectionContext<'_>) -> Vec<String> {
        let mut reasons = idle_vehicle_reasons(vehicle, ctx);

        if !vehicle.is_energy_level_critical() {
            reasons.push(format!(
                "车辆电量 {} 高于临界值 {}",
                vehicle.energy_level, vehicle.energy_level_critical
            ));
        }

        reasons
    }
}

fn idle_vehicle_reasons(vehicle: &Vehicle, ctx: &SelectionContext<'_>) -> Vec<String> {
    let mut reasons = Vec::new();

    if !vehicle.is_to_be_utilized() {
        reasons.push(format!("车辆集成级别为 {:?}", vehicle.integration_level));
    }
    if vehicle.current_position.is_none() {
        reasons.push("车辆位置未知".to_string());
    }
    if !vehicle.has_proc_state(ProcState::Idle) {
        reasons.push(format!("车辆处理状态为 {:?}", vehicle.proc_state));
    }
    if !vehicle.has_state(VehicleState::Idle) {
        reasons.push(format!("车辆状态为 {:?}", vehicle.state));
    }
    if vehicle.order_sequence.is_some() {
        reasons.push("车辆绑定在订单序列".to_string());
    }
    if ctx.reservations.has_reservations(&vehicle.name) {
        reasons.push("车辆已有预留订单".to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation_pool::OrderReservationPool;
    use fleet_core::models::{IntegrationLevel, OrderRef, Point, PointType};
    use fleet_infrastructure::InMemoryObjectPool;
    use fleet_testing_utils::builders::VehicleBuilder;

    #[test]
    fn test_available_vehicle() {
        let reservations = OrderReservationPool::new();
        let ctx = SelectionContext::new(&reservations);
        let filter = IsAvailableForAnyOrder;

        let vehicle = VehicleBuilder::new("Vehicle-01").at("A").build();
        assert!(filter.apply(&vehicle, &ctx).is_empty());

        let awaiting = VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_proc_state(ProcState::AwaitingOrder)
            .build();
        assert!(filter.apply(&awaiting, &ctx).is_empty());
    }

    #[test]
    fn test_unavailable_vehicle_reports_all_reasons() {
        let reservations = OrderReservationPool::new();
        let ctx = SelectionContext::new(&reservations);

        let vehicle = VehicleBuilder::new("Vehicle-01")
            .with_integration_level(IntegrationLevel::ToBeRespected)
            .with_state(VehicleState::Charging)
            .with_energy_level(10)
            .with_proc_state(ProcState::ProcessingOrder)
            .build();

        assert_eq!(IsAvailableForAnyOrder.apply(&vehicle, &ctx).len(), 4);
    }

    #[test]
    fn test_charging_vehicle_above_critical_level_is_available() {
        let reservations = OrderReservationPool::new();
        let ctx = SelectionContext::new(&reservations);
        let vehicle = VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_state(VehicleState::Charging)
            .with_energy_level(50)
            .build();

        assert!(IsAvailableForAnyOrder.apply(&vehicle, &ctx).is_empty());
    }

    #[test]
    fn test_parkable_excludes_vehicles_on_parking_positions_and_low_energy() {
        let plant = Arc::new(InMemoryObjectPool::default());
        plant.add_point(Point::new("A", PointType::Halt));
        plant.add_point(Point::new("P1", PointType::Park));
        let filter = IsParkable::new(plant.clone());
        let mut reservations = OrderReservationPool::new();

        let vehicle = VehicleBuilder::new("Vehicle-01").at("A").build();
        assert!(filter
            .apply(&vehicle, &SelectionContext::new(&reservations))
            .is_empty());

        let parked = VehicleBuilder::new("Vehicle-01").at("P1").build();
        assert_eq!(
            filter
                .apply(&parked, &SelectionContext::new(&reservations))
                .len(),
            1
        );

        let low = VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_energy_level(5)
            .build();
        assert_eq!(
            filter.apply(&low, &SelectionContext::new(&reservations)).len(),
            1
        );

        reservations.reserve(&vehicle.name, &OrderRef::new("TOrder-1"));
        assert_eq!(
            filter
                .apply(&vehicle, &SelectionContext::new(&reservations))
                .len(),
            1
        );
    }

    #[test]
    fn test_rechargeable_requires_critical_energy() {
        let reservations = OrderReservationPool::new();
        let ctx = SelectionContext::new(&reservations);

        let low = VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_energy_level(20)
            .build();
        assert!(IsRechargeable.apply(&low, &ctx).is_empty());

        let full = VehicleBuilder::new("Vehicle-01").at("A").build();
        assert_eq!(IsRechargeable.apply(&full, &ctx).len(), 1);
    }
}
