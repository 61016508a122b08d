use crate::{
    models::{
        DriveOrder, Location, LocationRef, LocationType, OrderRef, OrderSequence, OrderState,
        Path, Point, PointRef, ProcState, SequenceRef, TransportOrder, TransportOrderCreation,
        Vehicle, VehicleRef,
    },
    DispatchResult,
};

/// 场地模型服务（只读）
pub trait PlantModelService: Send + Sync {
    fn fetch_point(&self, point: &PointRef) -> Option<Point>;

    fn fetch_points(&self) -> Vec<Point>;

    fn fetch_paths(&self) -> Vec<Path>;

    fn fetch_location(&self, location: &LocationRef) -> Option<Location>;

    fn fetch_locations(&self) -> Vec<Location>;

    fn fetch_location_type(&self, name: &str) -> Option<LocationType>;
}

/// 运输订单服务
///
/// 更新接口在对象不存在时返回 [`crate::DispatchError::ObjectUnknown`]。
pub trait TransportOrderService: Send + Sync {
    fn fetch_transport_order(&self, order: &OrderRef) -> Option<TransportOrder>;

    fn fetch_transport_orders(&self) -> Vec<TransportOrder>;

    fn fetch_order_sequence(&self, sequence: &SequenceRef) -> Option<OrderSequence>;

    /// 创建运输订单，新订单处于 `Dispatchable` 状态
    fn create_transport_order(
        &self,
        creation: TransportOrderCreation,
    ) -> DispatchResult<TransportOrder>;

    fn update_transport_order_state(&self, order: &OrderRef, state: OrderState)
        -> DispatchResult<()>;

    fn update_transport_order_drive_orders(
        &self,
        order: &OrderRef,
        drive_orders: Vec<DriveOrder>,
    ) -> DispatchResult<()>;

    fn update_transport_order_processing_vehicle(
        &self,
        order: &OrderRef,
        vehicle: Option<VehicleRef>,
    ) -> DispatchResult<()>;

    fn update_order_sequence_processing_vehicle(
        &self,
        sequence: &SequenceRef,
        vehicle: Option<VehicleRef>,
    ) -> DispatchResult<()>;

    fn update_order_sequence_finished_count(
        &self,
        sequence: &SequenceRef,
        finished_count: usize,
    ) -> DispatchResult<()>;

    fn mark_order_sequence_finished(&self, sequence: &SequenceRef) -> DispatchResult<()>;
}

/// 车辆服务
pub trait VehicleService: Send + Sync {
    fn fetch_vehicle(&self, vehicle: &VehicleRef) -> Option<Vehicle>;

    fn fetch_vehicles(&self) -> Vec<Vehicle>;

    fn update_vehicle_proc_state(
        &self,
        vehicle: &VehicleRef,
        proc_state: ProcState,
    ) -> DispatchResult<()>;

    fn update_vehicle_transport_order(
        &self,
        vehicle: &VehicleRef,
        order: Option<OrderRef>,
    ) -> DispatchResult<()>;

    fn update_vehicle_order_sequence(
        &self,
        vehicle: &VehicleRef,
        sequence: Option<SequenceRef>,
    ) -> DispatchResult<()>;
}
