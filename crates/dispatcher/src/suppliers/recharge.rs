use fleet_core::models::{
    Destination, Location, LocationRef, Vehicle, PROPKEY_ASSIGNED_RECHARGE_LOCATION,
    PROPKEY_PREFERRED_RECHARGE_LOCATION,
};
use tracing::debug;

use super::select_by_precedence;
use crate::services::DispatchServices;

pub trait RechargePositionSupplier: Send + Sync {
    /// 为车辆生成充电所需的目的地序列，找不到合适位置时返回空序列
    fn find_recharge_sequence(&self, vehicle: &Vehicle) -> Vec<Destination>;
}

/// 默认充电位置策略
///
/// 候选为未锁定、且位置类型允许车辆充电操作的位置，结果是单站序列。
pub struct DefaultRechargePositionSupplier {
    services: DispatchServices,
}

impl DefaultRechargePositionSupplier {
    pub fn new(services: DispatchServices) -> Self {
        Self { services }
    }

    fn candidate_locations(&self, vehicle: &Vehicle) -> Vec<Location> {
        self.services
            .plant
            .fetch_locations()
            .into_iter()
            .filter(|location| !location.locked && !location.links.is_empty())
            .filter(|location| {
                self.services
                    .plant
                    .fetch_location_type(&location.location_type)
                    .is_some_and(|location_type| {
                        location_type.allows_operation(&vehicle.recharge_operation)
                    })
            })
            .collect()
    }

    fn nearest(&self, vehicle: &Vehicle, candidates: &[Location]) -> Option<LocationRef> {
        let position = vehicle.current_position.as_ref()?;

        candidates
            .iter()
            .filter_map(|location| {
                location
                    .links
                    .iter()
                    .filter_map(|point| self.services.router.get_costs(vehicle, position, point))
                    .min()
                    .map(|costs| (location, costs))
            })
            .min_by_key(|(_, costs)| *costs)
            .map(|(location, _)| location.name.clone())
    }
}

impl RechargePositionSupplier for DefaultRechargePositionSupplier {
    fn find_recharge_sequence(&self, vehicle: &Vehicle) -> Vec<Destination> {
        let candidates = self.candidate_locations(vehicle);
        let names: Vec<LocationRef> = candidates.iter().map(|l| l.name.clone()).collect();
        debug!("车辆 {} 的充电位置候选: {:?}", vehicle.name, names);

        let assigned = vehicle
            .property(PROPKEY_ASSIGNED_RECHARGE_LOCATION)
            .map(LocationRef::new);
        let preferred = vehicle
            .property(PROPKEY_PREFERRED_RECHARGE_LOCATION)
            .map(LocationRef::new);

        select_by_precedence(&names, assigned.as_ref(), preferred.as_ref(), |_| {
            self.nearest(vehicle, &candidates)
        })
        .map(|location| {
            vec![Destination::location(
                location,
                vehicle.recharge_operation.clone(),
            )]
        })
        .unwrap_or_default()
    }
}
