mod common;

use chrono::{Duration, Utc};
use common::{assignment_only_config, Harness};
use fleet_core::{
    models::{DriveOrderState, OrderRef, OrderState, ProcState, VehicleRef},
    Dispatcher, DispatcherConfig,
};
use fleet_testing_utils::builders::{TransportOrderBuilder, VehicleBuilder};

#[tokio::test]
async fn test_free_order_assigned_to_idle_vehicle() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness
        .pool
        .add_transport_order(TransportOrderBuilder::new("TOrder-1").to_point("C").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    let order = harness.order("TOrder-1");
    assert_eq!(order.state, OrderState::BeingProcessed);
    assert_eq!(order.processing_vehicle, Some(VehicleRef::new("Vehicle-01")));
    assert_eq!(order.drive_orders[0].state, DriveOrderState::Travelling);
    assert!(order.drive_orders[0].route.is_some());

    let vehicle = harness.vehicle("Vehicle-01");
    assert_eq!(vehicle.transport_order, Some(OrderRef::new("TOrder-1")));
    assert_eq!(vehicle.proc_state, ProcState::ProcessingOrder);

    let sent = harness.controller.drive_orders_for("Vehicle-01");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination.to_string(), "C:NOP");
}

#[tokio::test]
async fn test_older_order_is_assigned_first() {
    let harness = Harness::new(assignment_only_config());
    let now = Utc::now();
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-Young")
            .to_point("B")
            .created_at(now)
            .build(),
    );
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-Old")
            .to_point("C")
            .created_at(now - Duration::minutes(10))
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-Old"), OrderState::BeingProcessed);
    assert_ne!(harness.order_state("TOrder-Young"), OrderState::BeingProcessed);
    assert_eq!(
        harness.vehicle("Vehicle-01").transport_order,
        Some(OrderRef::new("TOrder-Old"))
    );
}

#[tokio::test]
async fn test_cheapest_candidate_wins() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-02").at("C").build());
    harness.router.set_costs("A", "D", 3000);
    harness.router.set_costs("C", "D", 500);
    harness
        .pool
        .add_transport_order(TransportOrderBuilder::new("TOrder-1").to_point("D").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    let order = harness.order("TOrder-1");
    assert_eq!(order.processing_vehicle, Some(VehicleRef::new("Vehicle-02")));
    assert!(harness.vehicle("Vehicle-01").transport_order.is_none());
}

#[tokio::test]
async fn test_intended_vehicle_is_respected() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("C").build());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-02").at("A").build());
    harness.router.set_costs("A", "D", 3000);
    harness.router.set_costs("C", "D", 500);
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-1")
            .to_point("D")
            .intended_for("Vehicle-02")
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert_eq!(
        harness.order("TOrder-1").processing_vehicle,
        Some(VehicleRef::new("Vehicle-02"))
    );
}

#[tokio::test]
async fn test_unroutable_order_is_dismissed() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.router.mark_unroutable("D");
    harness
        .pool
        .add_transport_order(TransportOrderBuilder::new("TOrder-1").to_point("D").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Unroutable);
    assert!(harness.controller.calls().is_empty());
}

#[tokio::test]
async fn test_unroutable_order_kept_when_dismissal_disabled() {
    let config = DispatcherConfig {
        dismiss_unroutable_transport_orders: false,
        ..assignment_only_config()
    };
    let harness = Harness::new(config);
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.router.mark_unroutable("D");
    harness
        .pool
        .add_transport_order(TransportOrderBuilder::new("TOrder-1").to_point("D").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Dispatchable);
    assert!(harness.vehicle("Vehicle-01").transport_order.is_none());
}

#[tokio::test]
async fn test_order_reserved_for_busy_vehicle_is_assigned_after_it_finishes() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.add_order_in_progress("TOrder-1", "Vehicle-01", "A", "B");
    harness
        .pool
        .add_transport_order(TransportOrderBuilder::new("TOrder-2").to_point("C").build());
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    let snapshot = harness.dispatcher.reservations_snapshot().await.unwrap();
    assert_eq!(
        snapshot.get(&VehicleRef::new("Vehicle-01")),
        Some(&vec![OrderRef::new("TOrder-2")])
    );
    assert_eq!(harness.order_state("TOrder-2"), OrderState::Dispatchable);

    harness.report_leg_finished("Vehicle-01", "B");
    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Finished);
    assert_eq!(harness.order_state("TOrder-2"), OrderState::BeingProcessed);
    assert_eq!(
        harness.vehicle("Vehicle-01").transport_order,
        Some(OrderRef::new("TOrder-2"))
    );
    assert!(harness
        .dispatcher
        .reservations_snapshot()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_multi_leg_order_progresses_leg_by_leg() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-1")
            .to_point("B")
            .to_point("D")
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;
    assert_eq!(harness.controller.drive_orders_for("Vehicle-01").len(), 1);

    harness.report_leg_finished("Vehicle-01", "B");
    harness.dispatch().await;

    let order = harness.order("TOrder-1");
    assert_eq!(order.drive_orders[0].state, DriveOrderState::Finished);
    assert_eq!(order.drive_orders[1].state, DriveOrderState::Travelling);
    assert_eq!(harness.controller.drive_orders_for("Vehicle-01").len(), 2);

    harness.report_leg_finished("Vehicle-01", "D");
    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Finished);
    let vehicle = harness.vehicle("Vehicle-01");
    assert_eq!(vehicle.proc_state, ProcState::Idle);
    assert!(vehicle.transport_order.is_none());
}

#[tokio::test]
async fn test_rejected_drive_order_reverts_assignment() {
    let harness = Harness::new(assignment_only_config());
    let now = Utc::now();
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-02").at("D").build());
    harness.router.set_costs("A", "B", 500);
    harness.router.set_costs("D", "B", 3000);
    harness.router.set_costs("A", "C", 3000);
    harness.router.set_costs("D", "C", 500);
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-1")
            .to_point("B")
            .created_at(now - Duration::minutes(1))
            .build(),
    );
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-2")
            .to_point("C")
            .created_at(now)
            .build(),
    );
    harness.controller.fail_for("Vehicle-01");
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;
    harness.dispatch().await;

    let order = harness.order("TOrder-1");
    assert_eq!(order.state, OrderState::Dispatchable);
    assert!(order.processing_vehicle.is_none());
    assert!(order.drive_orders.iter().all(|d| d.route.is_none()));

    let vehicle = harness.vehicle("Vehicle-01");
    assert_eq!(vehicle.proc_state, ProcState::Idle);
    assert!(vehicle.transport_order.is_none());
    assert!(harness.controller.drive_orders_for("Vehicle-01").is_empty());

    // 一辆车下发失败不影响同一周期内其他车辆的分配
    assert_eq!(harness.order_state("TOrder-2"), OrderState::BeingProcessed);
    assert_eq!(
        harness.order("TOrder-2").processing_vehicle,
        Some(VehicleRef::new("Vehicle-02"))
    );
}

#[tokio::test]
async fn test_rejected_vehicle_is_retried_after_periodic_dispatch() {
    let config = DispatcherConfig {
        idle_vehicle_redispatching_interval_ms: 50,
        ..assignment_only_config()
    };
    let harness = Harness::new(config);
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness
        .pool
        .add_transport_order(TransportOrderBuilder::new("TOrder-1").to_point("C").build());
    harness.controller.fail_for("Vehicle-01");
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;
    assert_eq!(harness.order_state("TOrder-1"), OrderState::Dispatchable);

    harness.controller.recover("Vehicle-01");
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    harness.dispatcher.flush().await.unwrap();

    assert_eq!(harness.order_state("TOrder-1"), OrderState::BeingProcessed);
    assert_eq!(harness.controller.drive_orders_for("Vehicle-01").len(), 1);
}

#[tokio::test]
async fn test_rejected_follow_up_leg_keeps_vehicle_awaiting() {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-1")
            .to_point("B")
            .to_point("D")
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;
    harness.controller.fail_for("Vehicle-01");
    harness.report_leg_finished("Vehicle-01", "B");
    harness.dispatch().await;

    let order = harness.order("TOrder-1");
    assert_eq!(order.state, OrderState::BeingProcessed);
    assert_eq!(order.drive_orders[0].state, DriveOrderState::Travelling);
    assert_eq!(order.drive_orders[1].state, DriveOrderState::Pristine);
    assert_eq!(
        harness.vehicle("Vehicle-01").proc_state,
        ProcState::AwaitingOrder
    );
}

#[tokio::test]
async fn test_orders_created_at_same_time_assigned_in_insertion_order() {
    let harness = Harness::new(assignment_only_config());
    let now = Utc::now();
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-B")
            .to_point("C")
            .created_at(now)
            .build(),
    );
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-A")
            .to_point("B")
            .created_at(now)
            .build(),
    );
    harness.dispatcher.initialize().unwrap();

    harness.dispatch().await;

    assert_eq!(
        harness.vehicle("Vehicle-01").transport_order,
        Some(OrderRef::new("TOrder-B"))
    );
    assert_eq!(harness.order_state("TOrder-A"), OrderState::Dispatchable);
}
