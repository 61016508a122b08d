mod common;

use common::{assignment_only_config, Harness};
use fleet_core::{
    models::{
        DestinationTarget, LocationRef, OrderState, Point, PointRef, PointType,
        PROPKEY_ASSIGNED_PARKING_POSITION, PROPKEY_PREFERRED_PARKING_POSITION,
    },
    DispatcherConfig,
};
use fleet_testing_utils::builders::VehicleBuilder;

fn parking_config() -> DispatcherConfig {
    DispatcherConfig {
        park_idle_vehicles: true,
        ..assignment_only_config()
    }
}

fn recharge_config() -> DispatcherConfig {
    DispatcherConfig {
        recharge_idle_vehicles: true,
        ..assignment_only_config()
    }
}

/// 停车点 P（代价 1000）与 P2（代价 100），车辆位于 B
fn parking_harness(vehicle: VehicleBuilder) -> Harness {
    let harness = Harness::new(parking_config());
    harness.pool.add_point(Point::new("P2", PointType::Park));
    harness.router.set_costs("B", "P2", 100);
    harness.pool.add_vehicle(vehicle.at("B").build());
    harness.dispatcher.initialize().unwrap();
    harness
}

fn park_target(harness: &Harness) -> Option<DestinationTarget> {
    let orders = harness.orders_with_prefix("Park-");
    assert!(orders.len() <= 1, "expected at most one parking order");
    orders
        .first()
        .map(|order| order.drive_orders[0].destination.target.clone())
}

#[tokio::test]
async fn test_idle_vehicle_parks_at_nearest_position() {
    let harness = parking_harness(VehicleBuilder::new("Vehicle-01"));

    harness.dispatch().await;

    assert_eq!(
        park_target(&harness),
        Some(DestinationTarget::Point(PointRef::new("P2")))
    );
    let order = &harness.orders_with_prefix("Park-")[0];
    assert_eq!(order.state, OrderState::BeingProcessed);
    assert_eq!(order.drive_orders[0].destination.operation, "PARK");
}

#[tokio::test]
async fn test_assigned_parking_position_takes_precedence() {
    let harness = parking_harness(
        VehicleBuilder::new("Vehicle-01").with_property(PROPKEY_ASSIGNED_PARKING_POSITION, "P"),
    );

    harness.dispatch().await;

    assert_eq!(
        park_target(&harness),
        Some(DestinationTarget::Point(PointRef::new("P")))
    );
}

#[tokio::test]
async fn test_unavailable_assigned_position_parks_nowhere() {
    let harness = parking_harness(
        VehicleBuilder::new("Vehicle-01").with_property(PROPKEY_ASSIGNED_PARKING_POSITION, "A"),
    );

    harness.dispatch().await;

    assert_eq!(park_target(&harness), None);
    assert!(harness.controller.calls().is_empty());
}

#[tokio::test]
async fn test_preferred_parking_position_used_when_available() {
    let harness = parking_harness(
        VehicleBuilder::new("Vehicle-01").with_property(PROPKEY_PREFERRED_PARKING_POSITION, "P"),
    );

    harness.dispatch().await;

    assert_eq!(
        park_target(&harness),
        Some(DestinationTarget::Point(PointRef::new("P")))
    );
}

#[tokio::test]
async fn test_unavailable_preferred_position_falls_back_to_nearest() {
    let harness = parking_harness(
        VehicleBuilder::new("Vehicle-01").with_property(PROPKEY_PREFERRED_PARKING_POSITION, "C"),
    );

    harness.dispatch().await;

    assert_eq!(
        park_target(&harness),
        Some(DestinationTarget::Point(PointRef::new("P2")))
    );
}

#[tokio::test]
async fn test_parking_position_occupied_by_other_vehicle_is_skipped() {
    let harness = Harness::new(parking_config());
    harness.pool.add_point(Point::new("P2", PointType::Park));
    harness.router.set_costs("B", "P2", 100);
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("B").build());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-02").at("P2").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert_eq!(
        park_target(&harness),
        Some(DestinationTarget::Point(PointRef::new("P")))
    );
    assert!(harness.vehicle("Vehicle-02").transport_order.is_none());
}

#[tokio::test]
async fn test_vehicle_on_parking_position_stays() {
    let harness = Harness::new(parking_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("P").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert!(harness.orders_with_prefix("Park-").is_empty());
}

#[tokio::test]
async fn test_critical_vehicle_is_sent_to_recharge() {
    let harness = Harness::new(recharge_config());
    harness.pool.add_vehicle(
        VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_energy_level(10)
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    let orders = harness.orders_with_prefix("Recharge-");
    assert_eq!(orders.len(), 1);
    let destination = &orders[0].drive_orders[0].destination;
    assert_eq!(
        destination.target,
        DestinationTarget::Location(LocationRef::new("Charger-01"))
    );
    assert_eq!(destination.operation, "CHARGE");
    assert_eq!(orders[0].state, OrderState::BeingProcessed);
}

#[tokio::test]
async fn test_vehicle_with_enough_energy_is_not_recharged() {
    let harness = Harness::new(recharge_config());
    harness.pool.add_vehicle(
        VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_energy_level(80)
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert!(harness.orders_with_prefix("Recharge-").is_empty());
}

#[tokio::test]
async fn test_unroutable_recharge_location_creates_no_order() {
    let harness = Harness::new(recharge_config());
    harness.router.mark_vehicle_unroutable("Vehicle-01");
    harness.pool.add_vehicle(
        VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_energy_level(10)
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert!(harness.orders_with_prefix("Recharge-").is_empty());
    assert!(!harness.router.route_requests().is_empty());
    assert!(harness.vehicle("Vehicle-01").transport_order.is_none());
}
