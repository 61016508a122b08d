use std::collections::{BTreeMap, HashMap};

use fleet_core::models::{OrderRef, VehicleRef};
use tracing::debug;

/// 订单预留池
///
/// 记录"订单 X 已为车辆 Y 预留"的事实。一个订单任一时刻最多只属于一辆车，
/// 车辆的预留总是整体清除。池本身不加锁，只能在调度器的串行执行上下文中修改。
#[derive(Debug, Default)]
pub struct OrderReservationPool {
    by_vehicle: HashMap<VehicleRef, Vec<OrderRef>>,
    by_order: HashMap<OrderRef, VehicleRef>,
}

impl OrderReservationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为车辆预留订单；订单若已为其他车辆预留则转移过来
    pub fn reserve(&mut self, vehicle: &VehicleRef, order: &OrderRef) {
        if let Some(previous) = self.by_order.insert(order.clone(), vehicle.clone()) {
            if previous == *vehicle {
                return;
            }
            debug!("订单 {} 的预留从车辆 {} 转移到 {}", order, previous, vehicle);
            self.detach(&previous, order);
        }

        self.by_vehicle
            .entry(vehicle.clone())
            .or_default()
            .push(order.clone());
    }

    /// 车辆的全部预留，按预留先后排列
    pub fn find_reservations(&self, vehicle: &VehicleRef) -> Vec<OrderRef> {
        self.by_vehicle.get(vehicle).cloned().unwrap_or_default()
    }

    pub fn has_reservations(&self, vehicle: &VehicleRef) -> bool {
        self.by_vehicle.contains_key(vehicle)
    }

    pub fn is_reserved(&self, order: &OrderRef) -> bool {
        self.by_order.contains_key(order)
    }

    pub fn reserved_vehicle(&self, order: &OrderRef) -> Option<&VehicleRef> {
        self.by_order.get(order)
    }

    /// 清除车辆的全部预留，返回被清除的订单
    pub fn remove_reservations(&mut self, vehicle: &VehicleRef) -> Vec<OrderRef> {
        let removed = self.by_vehicle.remove(vehicle).unwrap_or_default();
        for order in &removed {
            self.by_order.remove(order);
        }
        removed
    }

    /// 清除单个订单的预留
    pub fn remove_reservation(&mut self, order: &OrderRef) -> Option<VehicleRef> {
        let vehicle = self.by_order.remove(order)?;
        self.detach(&vehicle, order);
        Some(vehicle)
    }

    pub fn clear(&mut self) {
        self.by_vehicle.clear();
        self.by_order.clear();
    }

    pub fn len(&self) -> usize {
        self.by_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_order.is_empty()
    }

    /// 不可变快照，供串行上下文之外的状态查询使用
    pub fn snapshot(&self) -> BTreeMap<VehicleRef, Vec<OrderRef>> {
        self.by_vehicle
            .iter()
            .map(|(vehicle, orders)| (vehicle.clone(), orders.clone()))
            .collect()
    }

    fn detach(&mut self, vehicle: &VehicleRef, order: &OrderRef) {
        if let Some(orders) = self.by_vehicle.get_mut(vehicle) {
            orders.retain(|o| o != order);
            if orders.is_empty() {
                self.by_vehicle.remove(vehicle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> VehicleRef {
        VehicleRef::new(name)
    }

    fn o(name: &str) -> OrderRef {
        OrderRef::new(name)
    }

    #[test]
    fn test_order_is_reserved_for_one_vehicle_only() {
        let mut pool = OrderReservationPool::new();
        pool.reserve(&v("Vehicle-01"), &o("TOrder-1"));
        pool.reserve(&v("Vehicle-02"), &o("TOrder-1"));

        assert!(pool.find_reservations(&v("Vehicle-01")).is_empty());
        assert_eq!(pool.find_reservations(&v("Vehicle-02")), vec![o("TOrder-1")]);
        assert_eq!(pool.reserved_vehicle(&o("TOrder-1")), Some(&v("Vehicle-02")));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_reserving_twice_keeps_single_entry() {
        let mut pool = OrderReservationPool::new();
        pool.reserve(&v("Vehicle-01"), &o("TOrder-1"));
        pool.reserve(&v("Vehicle-01"), &o("TOrder-1"));

        assert_eq!(pool.find_reservations(&v("Vehicle-01")), vec![o("TOrder-1")]);
    }

    #[test]
    fn test_remove_reservations_clears_vehicle_as_a_whole() {
        let mut pool = OrderReservationPool::new();
        pool.reserve(&v("Vehicle-01"), &o("TOrder-1"));
        pool.reserve(&v("Vehicle-01"), &o("TOrder-2"));
        pool.reserve(&v("Vehicle-02"), &o("TOrder-3"));

        let removed = pool.remove_reservations(&v("Vehicle-01"));

        assert_eq!(removed, vec![o("TOrder-1"), o("TOrder-2")]);
        assert!(!pool.is_reserved(&o("TOrder-1")));
        assert!(!pool.is_reserved(&o("TOrder-2")));
        assert!(pool.is_reserved(&o("TOrder-3")));
        assert!(!pool.has_reservations(&v("Vehicle-01")));
    }

    #[test]
    fn test_remove_single_reservation() {
        let mut pool = OrderReservationPool::new();
        pool.reserve(&v("Vehicle-01"), &o("TOrder-1"));

        assert_eq!(pool.remove_reservation(&o("TOrder-1")), Some(v("Vehicle-01")));
        assert_eq!(pool.remove_reservation(&o("TOrder-1")), None);
        assert!(pool.is_empty());
        assert!(pool.snapshot().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut pool = OrderReservationPool::new();
        pool.reserve(&v("Vehicle-01"), &o("TOrder-1"));
        pool.reserve(&v("Vehicle-02"), &o("TOrder-2"));
        pool.clear();

        assert!(pool.is_empty());
        assert!(!pool.is_reserved(&o("TOrder-2")));
    }
}
