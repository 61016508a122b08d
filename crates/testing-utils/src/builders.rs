//! Test data builders for creating fleet model objects
//!
//! Every builder starts from a state the dispatcher can work with right away:
//! vehicles are idle and utilized, transport orders are dispatchable.

use chrono::{DateTime, Utc};
use fleet_core::models::{
    Destination, DriveOrder, IntegrationLevel, LocationRef, OrderRef, OrderSequence, OrderState,
    PointRef, ProcState, SequenceRef, TransportOrder, Vehicle, VehicleRef, VehicleState,
};
use std::collections::BTreeMap;

/// Builder for creating test Vehicle snapshots
pub struct VehicleBuilder {
    vehicle: Vehicle,
}

impl VehicleBuilder {
    pub fn new(name: &str) -> Self {
        let mut vehicle = Vehicle::new(name);
        vehicle.state = VehicleState::Idle;
        vehicle.proc_state = ProcState::Idle;
        Self { vehicle }
    }

    pub fn at(mut self, point: &str) -> Self {
        self.vehicle.current_position = Some(PointRef::new(point));
        self
    }

    pub fn with_proc_state(mut self, proc_state: ProcState) -> Self {
        self.vehicle.proc_state = proc_state;
        self
    }

    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.vehicle.state = state;
        self
    }

    pub fn with_energy_level(mut self, energy_level: u8) -> Self {
        self.vehicle.energy_level = energy_level;
        self
    }

    pub fn with_energy_thresholds(mut self, critical: u8, good: u8) -> Self {
        self.vehicle.energy_level_critical = critical;
        self.vehicle.energy_level_good = good;
        self
    }

    pub fn with_integration_level(mut self, level: IntegrationLevel) -> Self {
        self.vehicle.integration_level = level;
        self
    }

    pub fn with_recharge_operation(mut self, operation: &str) -> Self {
        self.vehicle.recharge_operation = operation.to_string();
        self
    }

    pub fn processing(mut self, order: &str) -> Self {
        self.vehicle.transport_order = Some(OrderRef::new(order));
        self.vehicle.proc_state = ProcState::ProcessingOrder;
        self.vehicle.state = VehicleState::Executing;
        self
    }

    pub fn bound_to_sequence(mut self, sequence: &str) -> Self {
        self.vehicle.order_sequence = Some(SequenceRef::new(sequence));
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.vehicle
            .properties
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}

/// Builder for creating test TransportOrder entities
pub struct TransportOrderBuilder {
    order: TransportOrder,
}

impl TransportOrderBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            order: TransportOrder {
                name: OrderRef::new(name),
                state: OrderState::Dispatchable,
                drive_orders: vec![],
                wrapping_sequence: None,
                intended_vehicle: None,
                processing_vehicle: None,
                creation_time: Utc::now(),
                creation_sequence: 0,
                deadline: None,
                properties: BTreeMap::new(),
            },
        }
    }

    /// Appends a drive order to a point, operation `NOP`
    pub fn to_point(self, point: &str) -> Self {
        self.to_destination(Destination::point(PointRef::new(point), Destination::OP_NOP))
    }

    /// Appends a drive order to a location with the given operation
    pub fn to_location(self, location: &str, operation: &str) -> Self {
        self.to_destination(Destination::location(LocationRef::new(location), operation))
    }

    pub fn to_destination(mut self, destination: Destination) -> Self {
        self.order.drive_orders.push(DriveOrder::new(destination));
        self
    }

    pub fn with_drive_orders(mut self, drive_orders: Vec<DriveOrder>) -> Self {
        self.order.drive_orders = drive_orders;
        self
    }

    pub fn in_sequence(mut self, sequence: &str) -> Self {
        self.order.wrapping_sequence = Some(SequenceRef::new(sequence));
        self
    }

    pub fn with_state(mut self, state: OrderState) -> Self {
        self.order.state = state;
        self
    }

    pub fn created_at(mut self, creation_time: DateTime<Utc>) -> Self {
        self.order.creation_time = creation_time;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.order.deadline = Some(deadline);
        self
    }

    pub fn intended_for(mut self, vehicle: &str) -> Self {
        self.order.intended_vehicle = Some(VehicleRef::new(vehicle));
        self
    }

    pub fn processed_by(mut self, vehicle: &str) -> Self {
        self.order.processing_vehicle = Some(VehicleRef::new(vehicle));
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.order
            .properties
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TransportOrder {
        self.order
    }
}

/// Builder for creating test OrderSequence entities
pub struct OrderSequenceBuilder {
    sequence: OrderSequence,
}

impl OrderSequenceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            sequence: OrderSequence::new(name),
        }
    }

    pub fn with_orders<'a>(mut self, orders: impl IntoIterator<Item = &'a str>) -> Self {
        self.sequence
            .orders
            .extend(orders.into_iter().map(OrderRef::new));
        self
    }

    pub fn with_finished_count(mut self, finished_count: usize) -> Self {
        self.sequence.finished_count = finished_count;
        self
    }

    pub fn complete(mut self) -> Self {
        self.sequence.complete = true;
        self
    }

    pub fn failure_fatal(mut self) -> Self {
        self.sequence.failure_fatal = true;
        self
    }

    pub fn intended_for(mut self, vehicle: &str) -> Self {
        self.sequence.intended_vehicle = Some(VehicleRef::new(vehicle));
        self
    }

    pub fn processed_by(mut self, vehicle: &str) -> Self {
        self.sequence.processing_vehicle = Some(VehicleRef::new(vehicle));
        self
    }

    pub fn build(self) -> OrderSequence {
        self.sequence
    }
}
