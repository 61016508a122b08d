use std::sync::Arc;

use fleet_core::{models::Vehicle, DispatchResult, DispatcherConfig};
use tracing::{debug, error, info};

use super::{create_and_assign_order, Lifecycle, Phase};
use crate::{
    reservation_pool::OrderReservationPool,
    selection::{IsRechargeable, SelectionContext, VehicleSelectionFilter},
    services::DispatchServices,
    suppliers::RechargePositionSupplier,
    transport_order_util::TransportOrderUtil,
};

/// 把电量临界的空闲车辆派去充电
pub struct RechargeIdleVehiclesPhase {
    lifecycle: Lifecycle,
    enabled: bool,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
    supplier: Arc<dyn RechargePositionSupplier>,
    vehicle_filter: VehicleSelectionFilter,
}

impl RechargeIdleVehiclesPhase {
    pub fn new(
        config: &DispatcherConfig,
        services: DispatchServices,
        util: Arc<TransportOrderUtil>,
        supplier: Arc<dyn RechargePositionSupplier>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            enabled: config.recharge_idle_vehicles,
            services,
            util,
            supplier,
            vehicle_filter: VehicleSelectionFilter::empty().with(IsRechargeable),
        }
    }

    fn recharge(&self, vehicle: &Vehicle) -> DispatchResult<()> {
        let destinations = self.supplier.find_recharge_sequence(vehicle);
        if destinations.is_empty() {
            debug!("没有为车辆 {} 找到充电位置", vehicle.name);
            return Ok(());
        }

        info!(
            "派车辆 {} 去充电 (电量 {}%)，目的地: {}",
            vehicle.name,
            vehicle.energy_level,
            destinations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        create_and_assign_order(&self.services, &self.util, vehicle, "Recharge", destinations)?;

        Ok(())
    }
}

impl Phase for RechargeIdleVehiclesPhase {
    fn name(&self) -> &'static str {
        "RechargeIdleVehicles"
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn run(&mut self, reservations: &mut OrderReservationPool) -> DispatchResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let ctx = SelectionContext::new(reservations);
        for vehicle in self.services.vehicles.fetch_vehicles() {
            if self.util.has_failed_controller(&vehicle.name)
                || !self.vehicle_filter.accepts(&vehicle, &ctx)
            {
                continue;
            }
            if let Err(e) = self.recharge(&vehicle) {
                error!("派车辆 {} 去充电失败: {}", vehicle.name, e);
            }
        }

        Ok(())
    }
}
