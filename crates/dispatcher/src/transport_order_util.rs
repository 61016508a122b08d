use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use fleet_core::{
    models::{DriveOrder, DriveOrderState, OrderState, ProcState, TransportOrder, Vehicle, VehicleRef},
    DispatchError, DispatchResult,
};

use crate::services::DispatchServices;

/// 运输订单分配与中止
///
/// 唯一允许把订单置为 `BEING_PROCESSED` 或中止订单的代码路径，由各调度阶段调用。
///
/// 车辆控制器拒绝下发分段时，已写入对象池的分配会被撤销，车辆记入下发失败集合。
/// 集合中的车辆在下一次定时调度清空集合之前不参与任何分配。
pub struct TransportOrderUtil {
    services: DispatchServices,
    failed_vehicles: Mutex<HashSet<VehicleRef>>,
}

impl TransportOrderUtil {
    pub fn new(services: DispatchServices) -> Self {
        Self {
            services,
            failed_vehicles: Mutex::new(HashSet::new()),
        }
    }

    /// 车辆最近一次下发分段是否失败
    pub fn has_failed_controller(&self, vehicle: &VehicleRef) -> bool {
        self.failed_vehicles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(vehicle)
    }

    /// 清空下发失败集合，返回被清除的车辆数
    pub fn clear_controller_failures(&self) -> usize {
        let mut failed = self
            .failed_vehicles
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = failed.len();
        failed.clear();
        count
    }

    fn record_controller_failure(&self, vehicle: &VehicleRef) {
        metrics::counter!("fleet_dispatch_controller_failures_total").increment(1);
        self.failed_vehicles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(vehicle.clone());
    }

    /// 把订单分配给车辆，并向车辆下发第一个分段
    pub fn assign_transport_order(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        mut drive_orders: Vec<DriveOrder>,
    ) -> DispatchResult<()> {
        let first = drive_orders.first_mut().ok_or_else(|| {
            DispatchError::IllegalState(format!("订单 {} 没有任何分段", order.name))
        })?;
        first.state = DriveOrderState::Travelling;
        let first = first.clone();

        let orders = &self.services.orders;
        let vehicles = &self.services.vehicles;

        let sequence_vehicle = order
            .wrapping_sequence
            .as_ref()
            .and_then(|sequence| orders.fetch_order_sequence(sequence))
            .and_then(|sequence| sequence.processing_vehicle);

        orders.update_transport_order_drive_orders(&order.name, drive_orders)?;
        orders.update_transport_order_processing_vehicle(&order.name, Some(vehicle.name.clone()))?;
        orders.update_transport_order_state(&order.name, OrderState::BeingProcessed)?;

        if let Some(sequence) = &order.wrapping_sequence {
            orders.update_order_sequence_processing_vehicle(sequence, Some(vehicle.name.clone()))?;
            vehicles.update_vehicle_order_sequence(&vehicle.name, Some(sequence.clone()))?;
        }

        vehicles.update_vehicle_transport_order(&vehicle.name, Some(order.name.clone()))?;
        vehicles.update_vehicle_proc_state(&vehicle.name, ProcState::ProcessingOrder)?;

        if let Err(e) = self
            .services
            .controller
            .set_drive_order(&vehicle.name, &first, &order.properties)
        {
            warn!(
                "向车辆 {} 下发订单 {} 失败，撤销分配: {}",
                vehicle.name, order.name, e
            );
            self.record_controller_failure(&vehicle.name);
            self.revert_assignment(vehicle, order, sequence_vehicle)?;
            return Err(e);
        }

        metrics::counter!("fleet_dispatch_assignments_total").increment(1);
        info!(
            "订单 {} 已分配给车辆 {}，首个分段: {}",
            order.name, vehicle.name, first
        );

        Ok(())
    }

    /// 车辆完成当前分段后，下发下一个分段；没有剩余分段时结束订单
    pub fn assign_next_drive_order(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
    ) -> DispatchResult<()> {
        let mut drive_orders = order.drive_orders.clone();

        if let Some(index) = order.current_drive_order_index() {
            drive_orders[index].state = DriveOrderState::Finished;
        }

        match order.next_drive_order_index() {
            Some(next) => {
                drive_orders[next].state = DriveOrderState::Travelling;
                let next_drive_order = drive_orders[next].clone();

                self.services
                    .orders
                    .update_transport_order_drive_orders(&order.name, drive_orders)?;
                self.services
                    .vehicles
                    .update_vehicle_proc_state(&vehicle.name, ProcState::ProcessingOrder)?;
                if let Err(e) = self.services.controller.set_drive_order(
                    &vehicle.name,
                    &next_drive_order,
                    &order.properties,
                ) {
                    warn!(
                        "向车辆 {} 下发订单 {} 的第 {} 个分段失败: {}",
                        vehicle.name,
                        order.name,
                        next + 1,
                        e
                    );
                    self.record_controller_failure(&vehicle.name);
                    self.services
                        .orders
                        .update_transport_order_drive_orders(&order.name, order.drive_orders.clone())?;
                    self.services
                        .vehicles
                        .update_vehicle_proc_state(&vehicle.name, vehicle.proc_state)?;
                    return Err(e);
                }

                debug!(
                    "车辆 {} 开始订单 {} 的第 {} 个分段: {}",
                    vehicle.name,
                    order.name,
                    next + 1,
                    next_drive_order
                );
            }
            None => {
                self.services
                    .orders
                    .update_transport_order_drive_orders(&order.name, drive_orders)?;
                self.finish_order(order, Some(&vehicle.name), OrderState::Finished)?;

                metrics::counter!("fleet_dispatch_orders_finished_total").increment(1);
                info!("车辆 {} 完成订单 {}", vehicle.name, order.name);
            }
        }

        Ok(())
    }

    /// 把对象池恢复到分配之前的状态
    fn revert_assignment(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        sequence_vehicle: Option<VehicleRef>,
    ) -> DispatchResult<()> {
        let orders = &self.services.orders;
        let vehicles = &self.services.vehicles;

        vehicles.update_vehicle_proc_state(&vehicle.name, vehicle.proc_state)?;
        vehicles.update_vehicle_transport_order(&vehicle.name, vehicle.transport_order.clone())?;

        if let Some(sequence) = &order.wrapping_sequence {
            vehicles.update_vehicle_order_sequence(&vehicle.name, vehicle.order_sequence.clone())?;
            orders.update_order_sequence_processing_vehicle(sequence, sequence_vehicle)?;
        }

        orders.update_transport_order_state(&order.name, order.state)?;
        orders.update_transport_order_processing_vehicle(&order.name, order.processing_vehicle.clone())?;
        orders.update_transport_order_drive_orders(&order.name, order.drive_orders.clone())?;

        Ok(())
    }

    /// 中止车辆当前处理的订单
    ///
    /// `immediate` 为 false 时订单先置为 `WITHDRAWN`，等车辆结束当前分段后由
    /// 撤回收尾阶段完成中止。
    pub fn abort_order_by_vehicle(&self, vehicle: &Vehicle, immediate: bool) -> DispatchResult<()> {
        let Some(order_ref) = &vehicle.transport_order else {
            debug!("车辆 {} 没有正在处理的订单，无需撤回", vehicle.name);
            return Ok(());
        };

        let order = self
            .services
            .orders
            .fetch_transport_order(order_ref)
            .ok_or_else(|| DispatchError::order_unknown(order_ref))?;

        if order.state.is_final() {
            warn!(
                "车辆 {} 引用的订单 {} 已结束 ({:?})",
                vehicle.name, order.name, order.state
            );
            return Ok(());
        }

        self.services
            .orders
            .update_transport_order_state(&order.name, OrderState::Withdrawn)?;
        self.services
            .controller
            .abort_drive_order(&vehicle.name, immediate)?;

        metrics::counter!("fleet_dispatch_withdrawals_total").increment(1);
        info!(
            "撤回车辆 {} 的订单 {} (立即中止: {})",
            vehicle.name, order.name, immediate
        );

        if immediate {
            self.finish_abortion(&order, &vehicle.name)?;
        }

        Ok(())
    }

    /// 中止运输订单；订单正被车辆处理时经由车辆中止
    pub fn abort_order(&self, order: &TransportOrder, immediate: bool) -> DispatchResult<()> {
        if order.state.is_final() {
            debug!("订单 {} 已结束 ({:?})，忽略撤回", order.name, order.state);
            return Ok(());
        }

        if let Some(vehicle_ref) = &order.processing_vehicle {
            let vehicle = self
                .services
                .vehicles
                .fetch_vehicle(vehicle_ref)
                .ok_or_else(|| DispatchError::vehicle_unknown(vehicle_ref))?;

            if vehicle.transport_order.as_ref() == Some(&order.name) {
                return self.abort_order_by_vehicle(&vehicle, immediate);
            }
        }

        metrics::counter!("fleet_dispatch_withdrawals_total").increment(1);
        info!("撤回未执行的订单 {}", order.name);

        self.finish_order(order, None, OrderState::Failed)
    }

    /// 完成撤回：订单置为 `FAILED` 并释放车辆
    pub fn finish_abortion(&self, order: &TransportOrder, vehicle: &VehicleRef) -> DispatchResult<()> {
        let mut drive_orders = order.drive_orders.clone();
        for drive_order in drive_orders.iter_mut().filter(|d| d.state.is_active()) {
            drive_order.state = DriveOrderState::Failed;
        }
        self.services
            .orders
            .update_transport_order_drive_orders(&order.name, drive_orders)?;

        self.finish_order(order, Some(vehicle), OrderState::Failed)?;
        info!("车辆 {} 的订单 {} 已中止", vehicle, order.name);

        Ok(())
    }

    fn finish_order(
        &self,
        order: &TransportOrder,
        vehicle: Option<&VehicleRef>,
        final_state: OrderState,
    ) -> DispatchResult<()> {
        let orders = &self.services.orders;
        let vehicles = &self.services.vehicles;

        orders.update_transport_order_state(&order.name, final_state)?;

        if let Some(vehicle) = vehicle {
            vehicles.update_vehicle_transport_order(vehicle, None)?;
            vehicles.update_vehicle_proc_state(vehicle, ProcState::Idle)?;
        }

        let Some(sequence_ref) = &order.wrapping_sequence else {
            return Ok(());
        };
        let sequence = orders
            .fetch_order_sequence(sequence_ref)
            .ok_or_else(|| DispatchError::sequence_unknown(sequence_ref))?;

        let mut finished_count = sequence.finished_count + 1;
        let fatal_failure = final_state == OrderState::Failed && sequence.failure_fatal;
        if fatal_failure {
            for remaining in sequence
                .unfinished_orders()
                .iter()
                .filter(|remaining| **remaining != order.name)
            {
                warn!("序列 {} 中的订单 {} 随之失败", sequence_ref, remaining);
                orders.update_transport_order_state(remaining, OrderState::Failed)?;
            }
            finished_count = sequence.orders.len();
        }
        orders.update_order_sequence_finished_count(sequence_ref, finished_count)?;

        if (sequence.complete || fatal_failure) && finished_count >= sequence.orders.len() {
            orders.mark_order_sequence_finished(sequence_ref)?;
            orders.update_order_sequence_processing_vehicle(sequence_ref, None)?;

            let bound_vehicle = vehicle.or(sequence.processing_vehicle.as_ref());
            if let Some(bound_vehicle) = bound_vehicle {
                vehicles.update_vehicle_order_sequence(bound_vehicle, None)?;
            }
            info!("订单序列 {} 已结束", sequence_ref);
        }

        Ok(())
    }
}
