use std::sync::Arc;

use fleet_core::{
    models::{Destination, Vehicle},
    DispatchResult, DispatcherConfig,
};
use tracing::{debug, error, info};

use super::{create_and_assign_order, Lifecycle, Phase};
use crate::{
    reservation_pool::OrderReservationPool,
    selection::{IsParkable, SelectionContext, VehicleSelectionFilter},
    services::DispatchServices,
    suppliers::ParkingPositionSupplier,
    transport_order_util::TransportOrderUtil,
};

/// 把空闲车辆派往停车点
pub struct ParkIdleVehiclesPhase {
    lifecycle: Lifecycle,
    enabled: bool,
    services: DispatchServices,
    util: Arc<TransportOrderUtil>,
    supplier: Arc<dyn ParkingPositionSupplier>,
    vehicle_filter: VehicleSelectionFilter,
}

impl ParkIdleVehiclesPhase {
    pub fn new(
        config: &DispatcherConfig,
        services: DispatchServices,
        util: Arc<TransportOrderUtil>,
        supplier: Arc<dyn ParkingPositionSupplier>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            enabled: config.park_idle_vehicles,
            vehicle_filter: VehicleSelectionFilter::empty()
                .with(IsParkable::new(services.plant.clone())),
            services,
            util,
            supplier,
        }
    }

    fn park(&self, vehicle: &Vehicle) -> DispatchResult<()> {
        let Some(point) = self.supplier.find_parking_position(vehicle) else {
            debug!("没有为车辆 {} 找到停车点", vehicle.name);
            return Ok(());
        };

        info!("派车辆 {} 前往停车点 {}", vehicle.name, point);
        create_and_assign_order(
            &self.services,
            &self.util,
            vehicle,
            "Park",
            vec![Destination::point(point, Destination::OP_PARK)],
        )?;

        Ok(())
    }
}

impl Phase for ParkIdleVehiclesPhase {
    fn name(&self) -> &'static str {
        "ParkIdleVehicles"
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
            if let Err(e) = self.park(&vehicle) {
                error!("派车辆 {} 前往停车点失败: {}", vehicle.name, e);
            }
        }

        Ok(())
    }
}
