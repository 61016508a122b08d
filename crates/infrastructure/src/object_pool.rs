use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use fleet_core::{
    models::{
        DriveOrder, FleetEvent, IntegrationLevel, Location, LocationRef, LocationType, OrderRef,
        OrderSequence, OrderState, Path, PathRef, Point, PointRef, ProcState, SequenceRef,
        TransportOrder, TransportOrderCreation, Vehicle, VehicleRef, VehicleState,
    },
    DispatchError, DispatchResult, EventBus, PlantModelService, TransportOrderService,
    VehicleService,
};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct PoolState {
    points: BTreeMap<PointRef, Point>,
    paths: BTreeMap<PathRef, Path>,
    location_types: BTreeMap<String, LocationType>,
    locations: BTreeMap<LocationRef, Location>,
    vehicles: BTreeMap<VehicleRef, Vehicle>,
    orders: BTreeMap<OrderRef, TransportOrder>,
    sequences: BTreeMap<SequenceRef, OrderSequence>,
    next_order_sequence: u64,
}

impl PoolState {
    /// 新订单取下一个序号；替换已有订单时沿用原序号
    fn assign_creation_sequence(&mut self, order: &mut TransportOrder) {
        if let Some(existing) = self.orders.get(&order.name) {
            order.creation_sequence = existing.creation_sequence;
            return;
        }
        order.creation_sequence = self.next_order_sequence;
        self.next_order_sequence += 1;
    }
}

/// 内存对象池
///
/// 保存场地模型、车辆、运输订单和订单序列，实现调度器依赖的三个对象服务。
/// 车辆和运输订单的每次变更都会在释放锁之后通过 [`EventBus`] 发布。
#[derive(Debug)]
pub struct InMemoryObjectPool {
    state: RwLock<PoolState>,
    event_bus: EventBus,
}

impl Default for InMemoryObjectPool {
    fn default() -> Self {
        Self::new(EventBus::new())
    }
}

impl InMemoryObjectPool {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn read(&self) -> RwLockReadGuard<'_, PoolState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PoolState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_point(&self, point: Point) {
        self.write().points.insert(point.name.clone(), point);
    }

    pub fn add_path(&self, path: Path) {
        self.write().paths.insert(path.name.clone(), path);
    }

    pub fn add_location_type(&self, location_type: LocationType) {
        self.write()
            .location_types
            .insert(location_type.name.clone(), location_type);
    }

    pub fn add_location(&self, location: Location) {
        self.write()
            .locations
            .insert(location.name.clone(), location);
    }

    pub fn add_order_sequence(&self, sequence: OrderSequence) {
        self.write()
            .sequences
            .insert(sequence.name.clone(), sequence);
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        let previous = self
            .write()
            .vehicles
            .insert(vehicle.name.clone(), vehicle.clone());
        self.event_bus
            .publish(FleetEvent::vehicle_changed(previous, Some(vehicle)));
    }

    /// 按原样加入运输订单（保留其创建时间和状态），并按加入顺序编号
    pub fn add_transport_order(&self, mut order: TransportOrder) {
        let previous = {
            let mut state = self.write();
            state.assign_creation_sequence(&mut order);
            state.orders.insert(order.name.clone(), order.clone())
        };
        self.event_bus
            .publish(FleetEvent::order_changed(previous, Some(order)));
    }

    pub fn fetch_path(&self, path: &PathRef) -> Option<Path> {
        self.read().paths.get(path).cloned()
    }

    /// 锁定或解锁路径，返回状态是否发生变化
    pub fn set_path_locked(&self, path: &PathRef, locked: bool) -> DispatchResult<bool> {
        let mut state = self.write();
        let path = state.paths.get_mut(path).ok_or_else(|| DispatchError::ObjectUnknown {
            kind: "Path",
            name: path.to_string(),
        })?;

        let changed = path.locked != locked;
        path.locked = locked;
        if changed {
            info!("路径 {} 已{}", path.name, if locked { "锁定" } else { "解锁" });
        }
        Ok(changed)
    }

    pub fn set_vehicle_position(
        &self,
        vehicle: &VehicleRef,
        position: Option<PointRef>,
    ) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.current_position = position)
    }

    pub fn set_vehicle_state(&self, vehicle: &VehicleRef, state: VehicleState) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.state = state)
    }

    pub fn set_vehicle_energy_level(&self, vehicle: &VehicleRef, energy_level: u8) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.energy_level = energy_level.min(100))
    }

    pub fn set_vehicle_integration_level(
        &self,
        vehicle: &VehicleRef,
        level: IntegrationLevel,
    ) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.integration_level = level)
    }

    pub fn set_vehicle_property(
        &self,
        vehicle: &VehicleRef,
        key: &str,
        value: Option<String>,
    ) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| match value {
            Some(value) => {
                v.properties.insert(key.to_string(), value);
            }
            None => {
                v.properties.remove(key);
            }
        })
    }

    /// 将订单序列标记为不再追加订单
    pub fn complete_order_sequence(&self, sequence: &SequenceRef) -> DispatchResult<()> {
        self.update_sequence(sequence, |s| s.complete = true)
    }

    /// 修改车辆并发布变更事件
    pub fn update_vehicle<F>(&self, vehicle: &VehicleRef, f: F) -> DispatchResult<()>
    where
        F: FnOnce(&mut Vehicle),
    {
        let (previous, current) = {
            let mut state = self.write();
            let entry = state
                .vehicles
                .get_mut(vehicle)
                .ok_or_else(|| DispatchError::vehicle_unknown(vehicle))?;
            let previous = entry.clone();
            f(entry);
            (previous, entry.clone())
        };

        if previous != current {
            self.event_bus
                .publish(FleetEvent::vehicle_changed(Some(previous), Some(current)));
        }
        Ok(())
    }

    fn update_order<F>(&self, order: &OrderRef, f: F) -> DispatchResult<()>
    where
        F: FnOnce(&mut TransportOrder),
    {
        let (previous, current) = {
            let mut state = self.write();
            let entry = state
                .orders
                .get_mut(order)
                .ok_or_else(|| DispatchError::order_unknown(order))?;
            let previous = entry.clone();
            f(entry);
            (previous, entry.clone())
        };

        if previous != current {
            self.event_bus
                .publish(FleetEvent::order_changed(Some(previous), Some(current)));
        }
        Ok(())
    }

    fn update_sequence<F>(&self, sequence: &SequenceRef, f: F) -> DispatchResult<()>
    where
        F: FnOnce(&mut OrderSequence),
    {
        let mut state = self.write();
        let entry = state
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| DispatchError::sequence_unknown(sequence))?;
        f(entry);
        Ok(())
    }
}

impl PlantModelService for InMemoryObjectPool {
    fn fetch_point(&self, point: &PointRef) -> Option<Point> {
        self.read().points.get(point).cloned()
    }

    fn fetch_points(&self) -> Vec<Point> {
        self.read().points.values().cloned().collect()
    }

    fn fetch_paths(&self) -> Vec<Path> {
        self.read().paths.values().cloned().collect()
    }

    fn fetch_location(&self, location: &LocationRef) -> Option<Location> {
        self.read().locations.get(location).cloned()
    }

    fn fetch_locations(&self) -> Vec<Location> {
        self.read().locations.values().cloned().collect()
    }

    fn fetch_location_type(&self, name: &str) -> Option<LocationType> {
        self.read().location_types.get(name).cloned()
    }
}

impl TransportOrderService for InMemoryObjectPool {
    fn fetch_transport_order(&self, order: &OrderRef) -> Option<TransportOrder> {
        self.read().orders.get(order).cloned()
    }

    fn fetch_transport_orders(&self) -> Vec<TransportOrder> {
        self.read().orders.values().cloned().collect()
    }

    fn fetch_order_sequence(&self, sequence: &SequenceRef) -> Option<OrderSequence> {
        self.read().sequences.get(sequence).cloned()
    }

    fn create_transport_order(
        &self,
        creation: TransportOrderCreation,
    ) -> DispatchResult<TransportOrder> {
        let mut order = creation.into_order(Utc::now());

        {
            let mut state = self.write();
            if state.orders.contains_key(&order.name) {
                return Err(DispatchError::IllegalState(format!(
                    "运输订单 {} 已存在",
                    order.name
                )));
            }
            if let Some(sequence_ref) = &order.wrapping_sequence {
                let sequence = state
                    .sequences
                    .get_mut(sequence_ref)
                    .ok_or_else(|| DispatchError::sequence_unknown(sequence_ref))?;
                if sequence.complete {
                    return Err(DispatchError::IllegalState(format!(
                        "订单序列 {sequence_ref} 已完整，不能追加订单"
                    )));
                }
                sequence.orders.push(order.name.clone());
            }
            state.assign_creation_sequence(&mut order);
            state.orders.insert(order.name.clone(), order.clone());
        }

        debug!("创建运输订单 {}", order.name);
        self.event_bus
            .publish(FleetEvent::order_changed(None, Some(order.clone())));
        Ok(order)
    }

    fn update_transport_order_state(
        &self,
        order: &OrderRef,
        state: OrderState,
    ) -> DispatchResult<()> {
        self.update_order(order, |o| o.state = state)
    }

    fn update_transport_order_drive_orders(
        &self,
        order: &OrderRef,
        drive_orders: Vec<DriveOrder>,
    ) -> DispatchResult<()> {
        self.update_order(order, |o| o.drive_orders = drive_orders)
    }

    fn update_transport_order_processing_vehicle(
        &self,
        order: &OrderRef,
        vehicle: Option<VehicleRef>,
    ) -> DispatchResult<()> {
        self.update_order(order, |o| o.processing_vehicle = vehicle)
    }

    fn update_order_sequence_processing_vehicle(
        &self,
        sequence: &SequenceRef,
        vehicle: Option<VehicleRef>,
    ) -> DispatchResult<()> {
        self.update_sequence(sequence, |s| s.processing_vehicle = vehicle)
    }

    fn update_order_sequence_finished_count(
        &self,
        sequence: &SequenceRef,
        finished_count: usize,
    ) -> DispatchResult<()> {
        self.update_sequence(sequence, |s| s.finished_count = finished_count)
    }

    fn mark_order_sequence_finished(&self, sequence: &SequenceRef) -> DispatchResult<()> {
        self.update_sequence(sequence, |s| s.finished = true)
    }
}

impl VehicleService for InMemoryObjectPool {
    fn fetch_vehicle(&self, vehicle: &VehicleRef) -> Option<Vehicle> {
        self.read().vehicles.get(vehicle).cloned()
    }

    fn fetch_vehicles(&self) -> Vec<Vehicle> {
        self.read().vehicles.values().cloned().collect()
    }

    fn update_vehicle_proc_state(
        &self,
        vehicle: &VehicleRef,
        proc_state: ProcState,
    ) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.proc_state = proc_state)
    }

    fn update_vehicle_transport_order(
        &self,
        vehicle: &VehicleRef,
        order: Option<OrderRef>,
    ) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.transport_order = order)
    }

    fn update_vehicle_order_sequence(
        &self,
        vehicle: &VehicleRef,
        sequence: Option<SequenceRef>,
    ) -> DispatchResult<()> {
        self.update_vehicle(vehicle, |v| v.order_sequence = sequence)
    }
}
