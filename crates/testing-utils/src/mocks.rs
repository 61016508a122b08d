//! Mock implementations of the dispatcher's outward-facing services
//!
//! The object services are covered by the real in-memory pool, so only the
//! router and the vehicle controller need test doubles.

use fleet_core::models::{
    DestinationTarget, DriveOrder, LocationRef, OrderRef, PathRef, Point, PointRef, Route, Step,
    TransportOrder, Vehicle, VehicleRef,
};
use fleet_core::{DispatchError, DispatchResult, Router, VehicleController};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct RouterState {
    costs: HashMap<(PointRef, PointRef), u64>,
    unroutable_points: HashSet<PointRef>,
    unroutable_vehicles: HashSet<VehicleRef>,
    location_links: HashMap<LocationRef, PointRef>,
    requests: Vec<(VehicleRef, OrderRef)>,
}

/// Scriptable router for testing
///
/// Every leg is routed as a single step from the previous point to the leg's
/// destination point. Costs come from [`MockRouter::set_costs`] or fall back
/// to the default cost; staying on the same point costs nothing.
#[derive(Debug, Clone)]
pub struct MockRouter {
    default_cost: u64,
    state: Arc<Mutex<RouterState>>,
}

impl MockRouter {
    pub fn new() -> Self {
        Self::with_default_cost(1000)
    }

    pub fn with_default_cost(default_cost: u64) -> Self {
        Self {
            default_cost,
            state: Arc::new(Mutex::new(RouterState::default())),
        }
    }

    /// Sets the cost between two points (one direction only)
    pub fn set_costs(&self, source: &str, destination: &str, costs: u64) {
        self.state
            .lock()
            .unwrap()
            .costs
            .insert((PointRef::new(source), PointRef::new(destination)), costs);
    }

    /// Makes a point unreachable for every vehicle
    pub fn mark_unroutable(&self, point: &str) {
        self.state
            .lock()
            .unwrap()
            .unroutable_points
            .insert(PointRef::new(point));
    }

    pub fn mark_routable(&self, point: &str) {
        self.state
            .lock()
            .unwrap()
            .unroutable_points
            .remove(&PointRef::new(point));
    }

    /// Makes every `get_route` request for the vehicle fail; costs stay available
    pub fn mark_vehicle_unroutable(&self, vehicle: &str) {
        self.state
            .lock()
            .unwrap()
            .unroutable_vehicles
            .insert(VehicleRef::new(vehicle));
    }

    /// Declares the point a location is reached through
    pub fn link_location(&self, location: &str, point: &str) {
        self.state
            .lock()
            .unwrap()
            .location_links
            .insert(LocationRef::new(location), PointRef::new(point));
    }

    /// All `get_route` requests seen so far, in order
    pub fn route_requests(&self) -> Vec<(VehicleRef, OrderRef)> {
        self.state.lock().unwrap().requests.clone()
    }

    fn resolve(&self, state: &RouterState, target: &DestinationTarget) -> Option<PointRef> {
        let point = match target {
            DestinationTarget::Point(point) => point.clone(),
            DestinationTarget::Location(location) => state.location_links.get(location)?.clone(),
        };
        if state.unroutable_points.contains(&point) {
            return None;
        }
        Some(point)
    }

    fn costs_between(&self, state: &RouterState, source: &PointRef, destination: &PointRef) -> u64 {
        if source == destination {
            return 0;
        }
        state
            .costs
            .get(&(source.clone(), destination.clone()))
            .copied()
            .unwrap_or(self.default_cost)
    }
}

impl Default for MockRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for MockRouter {
    fn get_route(
        &self,
        vehicle: &Vehicle,
        source: &Point,
        order: &TransportOrder,
    ) -> Option<Vec<DriveOrder>> {
        let mut state = self.state.lock().unwrap();
        state
            .requests
            .push((vehicle.name.clone(), order.name.clone()));

        if state.unroutable_vehicles.contains(&vehicle.name) {
            return None;
        }

        let mut current = source.name.clone();
        let mut routed = Vec::with_capacity(order.drive_orders.len());
        for drive_order in &order.drive_orders {
            let destination = self.resolve(&state, &drive_order.destination.target)?;
            let costs = self.costs_between(&state, &current, &destination);
            let step = Step {
                path: (current != destination)
                    .then(|| PathRef::new(format!("{current}--{destination}"))),
                source_point: Some(current.clone()),
                destination_point: destination.clone(),
            };
            routed.push(drive_order.clone().with_route(Route::new(vec![step], costs)));
            current = destination;
        }

        Some(routed)
    }

    fn get_costs(&self, _vehicle: &Vehicle, source: &PointRef, destination: &PointRef) -> Option<u64> {
        let state = self.state.lock().unwrap();
        if state.unroutable_points.contains(destination) {
            return None;
        }
        Some(self.costs_between(&state, source, destination))
    }

    fn check_routability(&self, order: &TransportOrder) -> bool {
        let state = self.state.lock().unwrap();
        order
            .drive_orders
            .iter()
            .all(|d| self.resolve(&state, &d.destination.target).is_some())
    }
}

/// A call received by [`RecordingVehicleController`]
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCall {
    SetDriveOrder {
        vehicle: VehicleRef,
        drive_order: DriveOrder,
    },
    AbortDriveOrder {
        vehicle: VehicleRef,
        immediate: bool,
    },
}

/// Vehicle controller that records every command it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingVehicleController {
    calls: Arc<Mutex<Vec<ControllerCall>>>,
    failing_vehicles: Arc<Mutex<HashSet<VehicleRef>>>,
}

impl RecordingVehicleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every command for the vehicle fail with a controller error
    pub fn fail_for(&self, vehicle: &str) {
        self.failing_vehicles
            .lock()
            .unwrap()
            .insert(VehicleRef::new(vehicle));
    }

    /// Lets commands for the vehicle succeed again
    pub fn recover(&self, vehicle: &str) {
        self.failing_vehicles
            .lock()
            .unwrap()
            .remove(&VehicleRef::new(vehicle));
    }

    pub fn calls(&self) -> Vec<ControllerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn drive_orders_for(&self, vehicle: &str) -> Vec<DriveOrder> {
        let vehicle = VehicleRef::new(vehicle);
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ControllerCall::SetDriveOrder {
                    vehicle: v,
                    drive_order,
                } if v == vehicle => Some(drive_order),
                _ => None,
            })
            .collect()
    }

    pub fn aborts_for(&self, vehicle: &str) -> Vec<bool> {
        let vehicle = VehicleRef::new(vehicle);
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ControllerCall::AbortDriveOrder {
                    vehicle: v,
                    immediate,
                } if v == vehicle => Some(immediate),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check(&self, vehicle: &VehicleRef) -> DispatchResult<()> {
        if self.failing_vehicles.lock().unwrap().contains(vehicle) {
            return Err(DispatchError::VehicleController(format!(
                "vehicle {vehicle} rejected the command"
            )));
        }
        Ok(())
    }
}

impl VehicleController for RecordingVehicleController {
    fn set_drive_order(
        &self,
        vehicle: &VehicleRef,
        drive_order: &DriveOrder,
        _order_properties: &BTreeMap<String, String>,
    ) -> DispatchResult<()> {
        self.check(vehicle)?;
        self.calls.lock().unwrap().push(ControllerCall::SetDriveOrder {
            vehicle: vehicle.clone(),
            drive_order: drive_order.clone(),
        });
        Ok(())
    }

    fn abort_drive_order(&self, vehicle: &VehicleRef, immediate: bool) -> DispatchResult<()> {
        self.check(vehicle)?;
        self.calls.lock().unwrap().push(ControllerCall::AbortDriveOrder {
            vehicle: vehicle.clone(),
            immediate,
        });
        Ok(())
    }
}
