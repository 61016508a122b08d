use std::sync::Arc;

use fleet_core::{
    models::{Point, Vehicle},
    PlantModelService, Router, TransportOrderService, VehicleController, VehicleService,
};

/// 调度器依赖的外部协作者集合
#[derive(Clone)]
pub struct DispatchServices {
    pub orders: Arc<dyn TransportOrderService>,
    pub vehicles: Arc<dyn VehicleService>,
    pub plant: Arc<dyn PlantModelService>,
    pub router: Arc<dyn Router>,
    pub controller: Arc<dyn VehicleController>,
}

impl DispatchServices {
    pub fn new(
        orders: Arc<dyn TransportOrderService>,
        vehicles: Arc<dyn VehicleService>,
        plant: Arc<dyn PlantModelService>,
        router: Arc<dyn Router>,
        controller: Arc<dyn VehicleController>,
    ) -> Self {
        Self {
            orders,
            vehicles,
            plant,
            router,
            controller,
        }
    }

    /// 车辆当前位置对应的点
    pub fn vehicle_position(&self, vehicle: &Vehicle) -> Option<Point> {
        vehicle
            .current_position
            .as_ref()
            .and_then(|point| self.plant.fetch_point(point))
    }

    /// 车辆执行完当前订单后所处的点；没有订单时即当前位置
    pub fn route_origin(&self, vehicle: &Vehicle) -> Option<Point> {
        let Some(order_ref) = &vehicle.transport_order else {
            return self.vehicle_position(vehicle);
        };

        self.orders
            .fetch_transport_order(order_ref)
            .and_then(|order| order.final_destination_point().cloned())
            .and_then(|point| self.plant.fetch_point(&point))
    }
}
