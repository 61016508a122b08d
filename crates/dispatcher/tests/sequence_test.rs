mod common;

use common::{assignment_only_config, Harness};
use fleet_core::{
    models::{OrderRef, OrderState, SequenceRef, VehicleRef},
    Dispatcher,
};
use fleet_testing_utils::builders::{OrderSequenceBuilder, TransportOrderBuilder, VehicleBuilder};

fn sequence_harness(failure_fatal: bool) -> Harness {
    let harness = Harness::new(assignment_only_config());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-01").at("A").build());
    harness
        .pool
        .add_vehicle(VehicleBuilder::new("Vehicle-02").at("A").build());

    let mut sequence = OrderSequenceBuilder::new("Sequence-1")
        .with_orders(["TOrder-1", "TOrder-2"])
        .complete();
    if failure_fatal {
        sequence = sequence.failure_fatal();
    }
    harness.pool.add_order_sequence(sequence.build());
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-1")
            .to_point("B")
            .in_sequence("Sequence-1")
            .build(),
    );
    harness.pool.add_transport_order(
        TransportOrderBuilder::new("TOrder-2")
            .to_point("C")
            .in_sequence("Sequence-1")
            .build(),
    );
    harness.dispatcher.initialize().unwrap();
    harness
}

#[tokio::test]
async fn test_sequence_is_processed_by_one_vehicle_in_order() {
    let harness = sequence_harness(false);

    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::BeingProcessed);
    assert_eq!(harness.order_state("TOrder-2"), OrderState::Dispatchable);
    let vehicle = harness.order("TOrder-1").processing_vehicle.unwrap();
    let other = if vehicle.name() == "Vehicle-01" {
        "Vehicle-02"
    } else {
        "Vehicle-01"
    };
    assert!(harness.vehicle(other).transport_order.is_none());
    assert_eq!(
        harness.vehicle(vehicle.name()).order_sequence,
        Some(SequenceRef::new("Sequence-1"))
    );

    harness.report_leg_finished(vehicle.name(), "B");
    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Finished);
    assert_eq!(
        harness.order("TOrder-2").processing_vehicle,
        Some(vehicle.clone())
    );
    assert!(harness.vehicle(other).transport_order.is_none());
    assert!(!harness.sequence_finished("Sequence-1"));

    harness.report_leg_finished(vehicle.name(), "C");
    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-2"), OrderState::Finished);
    assert!(harness.sequence_finished("Sequence-1"));
    assert!(harness.vehicle(vehicle.name()).order_sequence.is_none());
}

#[tokio::test]
async fn test_fatal_failure_fails_remaining_sequence_orders() {
    let harness = sequence_harness(true);
    harness.dispatch().await;
    let vehicle: VehicleRef = harness.order("TOrder-1").processing_vehicle.unwrap();

    harness
        .dispatcher
        .withdraw_order(&OrderRef::new("TOrder-1"), true)
        .unwrap();
    harness.dispatcher.flush().await.unwrap();

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Failed);
    assert_eq!(harness.order_state("TOrder-2"), OrderState::Failed);
    assert!(harness.sequence_finished("Sequence-1"));
    assert!(harness.vehicle(vehicle.name()).order_sequence.is_none());
}

#[tokio::test]
async fn test_non_fatal_failure_continues_with_successor() {
    let harness = sequence_harness(false);
    harness.dispatch().await;
    let vehicle: VehicleRef = harness.order("TOrder-1").processing_vehicle.unwrap();

    harness
        .dispatcher
        .withdraw_order(&OrderRef::new("TOrder-1"), true)
        .unwrap();
    harness.dispatcher.flush().await.unwrap();
    harness.dispatch().await;

    assert_eq!(harness.order_state("TOrder-1"), OrderState::Failed);
    assert_eq!(harness.order_state("TOrder-2"), OrderState::BeingProcessed);
    assert_eq!(harness.order("TOrder-2").processing_vehicle, Some(vehicle));
}
