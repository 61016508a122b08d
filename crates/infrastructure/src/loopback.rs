use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fleet_core::{
    config::LoopbackConfig,
    models::{DriveOrder, ProcState, VehicleRef, VehicleState},
    DispatchError, DispatchResult, VehicleController, VehicleService,
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::object_pool::InMemoryObjectPool;

/// 模拟车辆控制器
///
/// 不连接真实车辆：收到行驶订单后按路线代价等待一段时间，然后把车辆移动到分段终点，
/// 并将处理状态置为 `AWAITING_ORDER`，由此触发调度器下发下一个分段。
pub struct LoopbackVehicleController {
    pool: Arc<InMemoryObjectPool>,
    config: LoopbackConfig,
    running: Mutex<HashMap<VehicleRef, JoinHandle<()>>>,
}

impl LoopbackVehicleController {
    pub fn new(pool: Arc<InMemoryObjectPool>, config: LoopbackConfig) -> Self {
        Self {
            pool,
            config,
            running: Mutex::new(HashMap::new()),
        }
    }

    fn travel_time(&self, drive_order: &DriveOrder) -> Duration {
        let costs = drive_order.route.as_ref().map_or(0, |r| r.costs);
        Duration::from_secs_f64(costs as f64 * self.config.millis_per_cost_unit / 1000.0)
    }

    /// 模拟车辆是否正在执行分段
    pub fn is_moving(&self, vehicle: &VehicleRef) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(vehicle)
            .is_some_and(|handle| !handle.is_finished())
    }
}

async fn simulate_leg(
    pool: Arc<InMemoryObjectPool>,
    vehicle: VehicleRef,
    drive_order: DriveOrder,
    travel_time: Duration,
    energy_drain: u8,
) {
    tokio::time::sleep(travel_time).await;

    let destination = drive_order
        .route
        .as_ref()
        .and_then(|r| r.final_destination_point())
        .cloned();
    let operation = drive_order.destination.operation.clone();

    let result = pool.update_vehicle(&vehicle, |v| {
        if destination.is_some() {
            v.current_position = destination.clone();
        }
        if operation == v.recharge_operation {
            v.energy_level = 100;
        } else {
            v.energy_level = v.energy_level.saturating_sub(energy_drain);
        }
        v.state = VehicleState::Idle;
    });

    let result = result.and_then(|_| {
        pool.update_vehicle_proc_state(&vehicle, ProcState::AwaitingOrder)
    });

    match result {
        Ok(()) => debug!("模拟车辆 {} 完成分段 {}", vehicle, drive_order),
        Err(e) => warn!("模拟车辆 {} 更新状态失败: {}", vehicle, e),
    }
}

impl VehicleController for LoopbackVehicleController {
    fn set_drive_order(
        &self,
        vehicle: &VehicleRef,
        drive_order: &DriveOrder,
        _order_properties: &BTreeMap<String, String>,
    ) -> DispatchResult<()> {
        let handle = Handle::try_current()
            .map_err(|e| DispatchError::VehicleController(format!("没有可用的运行时: {e}")))?;

        self.pool
            .update_vehicle(vehicle, |v| v.state = VehicleState::Executing)?;

        let task = handle.spawn(simulate_leg(
            self.pool.clone(),
            vehicle.clone(),
            drive_order.clone(),
            self.travel_time(drive_order),
            self.config.energy_drain_per_leg,
        ));

        let previous = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(vehicle.clone(), task);
        if let Some(previous) = previous {
            if !previous.is_finished() {
                warn!("模拟车辆 {} 的上一个分段尚未完成，已被替换", vehicle);
                previous.abort();
            }
        }

        info!("模拟车辆 {} 开始分段 {}", vehicle, drive_order);
        Ok(())
    }

    fn abort_drive_order(&self, vehicle: &VehicleRef, immediate: bool) -> DispatchResult<()> {
        if !immediate {
            debug!("模拟车辆 {} 将在当前分段结束后停止", vehicle);
            return Ok(());
        }

        let task = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(vehicle);
        if let Some(task) = task {
            task.abort();
        }

        self.pool
            .update_vehicle(vehicle, |v| v.state = VehicleState::Idle)?;
        info!("模拟车辆 {} 立即停止", vehicle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::models::{Destination, PointRef, Route, Step};
    use fleet_testing_utils::builders::VehicleBuilder;
    use fleet_testing_utils::helpers::wait_for;

    fn leg(to: &str, operation: &str) -> DriveOrder {
        DriveOrder::new(Destination::point(PointRef::new(to), operation)).with_route(Route::new(
            vec![Step {
                path: None,
                source_point: None,
                destination_point: PointRef::new(to),
            }],
            10,
        ))
    }

    fn setup() -> (Arc<InMemoryObjectPool>, LoopbackVehicleController) {
        let pool = Arc::new(InMemoryObjectPool::default());
        pool.add_vehicle(
            VehicleBuilder::new("Vehicle-01")
                .at("A")
                .with_energy_level(50)
                .with_proc_state(ProcState::ProcessingOrder)
                .build(),
        );
        let controller = LoopbackVehicleController::new(
            pool.clone(),
            LoopbackConfig {
                millis_per_cost_unit: 1.0,
                energy_drain_per_leg: 5,
            },
        );
        (pool, controller)
    }

    #[tokio::test]
    async fn test_leg_moves_vehicle_and_awaits_next_order() {
        let (pool, controller) = setup();
        let vehicle = VehicleRef::new("Vehicle-01");

        controller
            .set_drive_order(&vehicle, &leg("B", Destination::OP_NOP), &BTreeMap::new())
            .unwrap();
        assert_eq!(pool.fetch_vehicle(&vehicle).unwrap().state, VehicleState::Executing);

        let done = wait_for(
            || pool.fetch_vehicle(&vehicle).unwrap().proc_state == ProcState::AwaitingOrder,
            Duration::from_secs(2),
        )
        .await;
        assert!(done);

        let snapshot = pool.fetch_vehicle(&vehicle).unwrap();
        assert_eq!(snapshot.current_position, Some(PointRef::new("B")));
        assert_eq!(snapshot.energy_level, 45);
        assert_eq!(snapshot.state, VehicleState::Idle);
    }

    #[tokio::test]
    async fn test_recharge_operation_fills_battery() {
        let (pool, controller) = setup();
        let vehicle = VehicleRef::new("Vehicle-01");

        controller
            .set_drive_order(&vehicle, &leg("D", "CHARGE"), &BTreeMap::new())
            .unwrap();

        assert!(
            wait_for(
                || pool.fetch_vehicle(&vehicle).unwrap().energy_level == 100,
                Duration::from_secs(2),
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_immediate_abort_stops_leg() {
        let (pool, controller) = setup();
        let vehicle = VehicleRef::new("Vehicle-01");
        let mut slow = leg("B", Destination::OP_NOP);
        if let Some(route) = slow.route.as_mut() {
            route.costs = 60_000;
        }

        controller
            .set_drive_order(&vehicle, &slow, &BTreeMap::new())
            .unwrap();
        assert!(controller.is_moving(&vehicle));

        controller.abort_drive_order(&vehicle, true).unwrap();
        assert!(!controller.is_moving(&vehicle));

        let snapshot = pool.fetch_vehicle(&vehicle).unwrap();
        assert_eq!(snapshot.current_position, Some(PointRef::new("A")));
        assert_eq!(snapshot.state, VehicleState::Idle);
    }
}
