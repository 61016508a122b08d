use std::collections::HashSet;

use fleet_core::models::{
    DriveOrderState, PointRef, Vehicle, PROPKEY_ASSIGNED_PARKING_POSITION, PROPKEY_PREFERRED_PARKING_POSITION,
};
use tracing::debug;

use super::select_by_precedence;
use crate::services::DispatchServices;

pub trait ParkingPositionSupplier: Send + Sync {
    /// 为车辆寻找停车点，找不到时返回 `None`
    fn find_parking_position(&self, vehicle: &Vehicle) -> Option<PointRef>;
}

/// 默认停车点策略
///
/// 候选为未被其他车辆占用、也不在其他车辆规划路线上的停车点。
pub struct DefaultParkingPositionSupplier {
    services: DispatchServices,
}

impl DefaultParkingPositionSupplier {
    pub fn new(services: DispatchServices) -> Self {
        Self { services }
    }

    fn candidate_points(&self, vehicle: &Vehicle) -> Vec<PointRef> {
        let blocked = self.points_claimed_by_others(vehicle);

        self.services
            .plant
            .fetch_points()
            .into_iter()
            .filter(|point| point.is_parking_position())
            .map(|point| point.name)
            .filter(|point| !blocked.contains(point))
            .collect()
    }

    fn points_claimed_by_others(&self, vehicle: &Vehicle) -> HashSet<PointRef> {
        let mut claimed = HashSet::new();

        for other in self.services.vehicles.fetch_vehicles() {
            if other.name == vehicle.name {
                continue;
            }
            if let Some(position) = &other.current_position {
                claimed.insert(position.clone());
            }
            let Some(order) = other
                .transport_order
                .as_ref()
                .and_then(|order| self.services.orders.fetch_transport_order(order))
            else {
                continue;
            };
            for route in order
                .drive_orders
                .iter()
                .filter(|drive_order| drive_order.state != DriveOrderState::Finished)
                .filter_map(|drive_order| drive_order.route.as_ref())
            {
                claimed.extend(route.points().cloned());
            }
        }

        claimed
    }

    fn nearest(&self, vehicle: &Vehicle, candidates: &[PointRef]) -> Option<PointRef> {
        let position = vehicle.current_position.as_ref()?;

        candidates
            .iter()
            .filter_map(|point| {
                self.services
                    .router
                    .get_costs(vehicle, position, point)
                    .map(|costs| (point, costs))
            })
            .min_by_key(|(_, costs)| *costs)
            .map(|(point, _)| point.clone())
    }
}

impl ParkingPositionSupplier for DefaultParkingPositionSupplier {
    fn find_parking_position(&self, vehicle: &Vehicle) -> Option<PointRef> {
        if vehicle.current_position.is_none() {
            debug!("车辆 {} 位置未知，不选择停车点", vehicle.name);
            return None;
        }

        let candidates = self.candidate_points(vehicle);
        debug!("车辆 {} 的停车点候选: {:?}", vehicle.name, candidates);

        let assigned = vehicle
            .property(PROPKEY_ASSIGNED_PARKING_POSITION)
            .map(PointRef::new);
        let preferred = vehicle
            .property(PROPKEY_PREFERRED_PARKING_POSITION)
            .map(PointRef::new);

        select_by_precedence(&candidates, assigned.as_ref(), preferred.as_ref(), |candidates| {
            self.nearest(vehicle, candidates)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fleet_infrastructure::InMemoryObjectPool;
    use fleet_testing_utils::{
        builders::VehicleBuilder,
        helpers::PlantFixture,
        mocks::{MockRouter, RecordingVehicleController},
    };

    fn supplier() -> DefaultParkingPositionSupplier {
        let pool = Arc::new(InMemoryObjectPool::default());
        let plant = PlantFixture::line();
        plant.points.into_iter().for_each(|p| pool.add_point(p));
        plant.paths.into_iter().for_each(|p| pool.add_path(p));

        DefaultParkingPositionSupplier::new(DispatchServices::new(
            pool.clone(),
            pool.clone(),
            pool,
            Arc::new(MockRouter::new()),
            Arc::new(RecordingVehicleController::new()),
        ))
    }

    #[test]
    fn test_assigned_parking_position_is_used() {
        let vehicle = VehicleBuilder::new("Vehicle-01")
            .at("A")
            .with_property(PROPKEY_ASSIGNED_PARKING_POSITION, "P")
            .build();

        assert_eq!(
            supplier().find_parking_position(&vehicle),
            Some(PointRef::new("P"))
        );
    }

    #[test]
    fn test_vehicle_without_position_gets_no_parking_position() {
        let vehicle = VehicleBuilder::new("Vehicle-01")
            .with_property(PROPKEY_ASSIGNED_PARKING_POSITION, "P")
            .build();

        assert_eq!(supplier().find_parking_position(&vehicle), None);
    }
}
