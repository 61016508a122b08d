//! 调度阶段
//!
//! 每个阶段对当前车队和订单状态做一次独立的处理，可能提交分配。[`PhasePipeline`]
//! 在每个调度周期按固定顺序执行全部阶段：
//!
//! 1. 撤回收尾
//! 2. 下发下一个分段
//! 3. 预留订单分配
//! 4. 订单序列后继分配
//! 5. 自由订单分配（含为忙碌车辆预留）
//! 6. 空闲车辆停车
//! 7. 低电量车辆充电

mod assign_free_orders;
mod assign_next_drive_orders;
mod assign_reserved_orders;
mod assign_sequence_successors;
mod finish_withdrawals;
mod park_vehicles;
mod recharge_vehicles;

pub use assign_free_orders::AssignFreeOrdersPhase;
pub use assign_next_drive_orders::AssignNextDriveOrdersPhase;
pub use assign_reserved_orders::AssignReservedOrdersPhase;
pub use assign_sequence_successors::AssignSequenceSuccessorsPhase;
pub use finish_withdrawals::FinishWithdrawalsPhase;
pub use park_vehicles::ParkIdleVehiclesPhase;
pub use recharge_vehicles::RechargeIdleVehiclesPhase;

use std::sync::Arc;

use chrono::Utc;
use fleet_core::{
    models::{Destination, OrderState, TransportOrder, TransportOrderCreation, Vehicle},
    DispatchError, DispatchResult, DispatcherConfig,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    candidate::AssignmentCandidate,
    reservation_pool::OrderReservationPool,
    services::DispatchServices,
    suppliers::{ParkingPositionSupplier, RechargePositionSupplier},
    transport_order_util::TransportOrderUtil,
};

/// 阶段生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Running,
    Terminated,
}

impl Lifecycle {
    /// 进入运行状态；已在运行时返回 false
    pub fn initialize(&mut self) -> bool {
        if *self == Self::Running {
            return false;
        }
        *self = Self::Running;
        true
    }

    /// 只有运行中的阶段可以终止；其他状态下返回 false
    pub fn terminate(&mut self) -> bool {
        if *self != Self::Running {
            return false;
        }
        *self = Self::Terminated;
        true
    }

    pub fn is_running(&self) -> bool {
        *self == Self::Running
    }
}

pub trait Phase: Send {
    fn name(&self) -> &'static str;

    fn lifecycle(&self) -> Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    fn initialize(&mut self) {
        if self.lifecycle_mut().initialize() {
            debug!("阶段 {} 已初始化", self.name());
        }
    }

    fn is_initialized(&self) -> bool {
        self.lifecycle().is_running()
    }

    fn terminate(&mut self) {
        if self.lifecycle_mut().terminate() {
            debug!("阶段 {} 已终止", self.name());
        }
    }

    /// 对当前状态执行一次完整处理
    fn run(&mut self, reservations: &mut OrderReservationPool) -> DispatchResult<()>;
}

/// 按固定顺序执行的阶段流水线
///
/// 单个阶段失败只记录日志，不影响同一周期中后续阶段的执行。
pub struct PhasePipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl PhasePipeline {
    pub fn new(phases: Vec<Box<dyn Phase>>) -> Self {
        Self { phases }
    }

    /// 标准的七阶段流水线
    pub fn standard(
        config: &DispatcherConfig,
        services: &DispatchServices,
        util: Arc<TransportOrderUtil>,
        parking: Arc<dyn ParkingPositionSupplier>,
        recharge: Arc<dyn RechargePositionSupplier>,
    ) -> Self {
        Self::new(vec![
            Box::new(FinishWithdrawalsPhase::new(services.clone(), util.clone())),
            Box::new(AssignNextDriveOrdersPhase::new(services.clone(), util.clone())),
            Box::new(AssignReservedOrdersPhase::new(services.clone(), util.clone())),
            Box::new(AssignSequenceSuccessorsPhase::new(
                services.clone(),
                util.clone(),
            )),
            Box::new(AssignFreeOrdersPhase::new(
                config,
                services.clone(),
                util.clone(),
            )),
            Box::new(ParkIdleVehiclesPhase::new(
                config,
                services.clone(),
                util.clone(),
                parking,
            )),
            Box::new(RechargeIdleVehiclesPhase::new(
                config,
                services.clone(),
                util,
                recharge,
            )),
        ])
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    pub fn initialize(&mut self) {
        for phase in &mut self.phases {
            phase.initialize();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.phases.iter().all(|phase| phase.is_initialized())
    }

    pub fn terminate(&mut self) {
        for phase in &mut self.phases {
            phase.terminate();
        }
    }

    /// 执行一个调度周期，返回失败的阶段数
    pub fn run(&mut self, reservations: &mut OrderReservationPool) -> usize {
        let mut failures = 0;

        for phase in &mut self.phases {
            if !phase.is_initialized() {
                warn!("阶段 {} 未初始化，跳过", phase.name());
                continue;
            }

            if let Err(e) = phase.run(reservations) {
                failures += 1;
                metrics::counter!("fleet_dispatch_phase_failures_total", "phase" => phase.name())
                    .increment(1);
                let failure = DispatchError::PhaseFailed {
                    phase: phase.name().to_string(),
                    message: e.to_string(),
                };
                error!("{failure}");
            }
        }

        failures
    }
}

/// 通过路由服务为车辆和订单计算分配候选；不可达时返回 `None`
pub(crate) fn compute_candidate(
    services: &DispatchServices,
    vehicle: &Vehicle,
    order: &TransportOrder,
) -> Option<AssignmentCandidate> {
    let origin = services.route_origin(vehicle)?;

    services
        .router
        .get_route(vehicle, &origin, order)
        .map(|drive_orders| AssignmentCandidate::new(vehicle.clone(), order.clone(), drive_orders))
}

/// 为车辆创建一个非生产性订单（停车、充电）并立即分配
///
/// 先按草稿订单规划路线，不可达时不创建订单，返回 `false`。
/// 分配失败时新建的订单置为 `FAILED`。
pub(crate) fn create_and_assign_order(
    services: &DispatchServices,
    util: &TransportOrderUtil,
    vehicle: &Vehicle,
    prefix: &str,
    destinations: Vec<Destination>,
) -> DispatchResult<bool> {
    let creation = TransportOrderCreation::new(
        format!("{prefix}-{}", Uuid::new_v4()),
        destinations,
    )
    .with_intended_vehicle(vehicle.name.clone());

    let draft = creation.clone().into_order(Utc::now());
    let Some(candidate) = compute_candidate(services, vehicle, &draft) else {
        warn!("车辆 {} 无法到达 {} 订单的目的地，不创建订单", vehicle.name, prefix);
        return Ok(false);
    };

    let order = services.orders.create_transport_order(creation)?;
    if let Err(e) = util.assign_transport_order(vehicle, &order, candidate.drive_orders) {
        services
            .orders
            .update_transport_order_state(&order.name, OrderState::Failed)?;
        return Err(e);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPhase {
        name: &'static str,
        lifecycle: Lifecycle,
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingPhase {
        fn new(name: &'static str, runs: Arc<AtomicUsize>, fail: bool) -> Self {
            Self {
                name,
                lifecycle: Lifecycle::default(),
                runs,
                fail,
            }
        }
    }

    impl Phase for CountingPhase {
        fn name(&self) -> &'static str {
            self.name
        }

        fn lifecycle(&self) -> Lifecycle {
            self.lifecycle
        }

        fn lifecycle_mut(&mut self) -> &mut Lifecycle {
            &mut self.lifecycle
        }

        fn run(&mut self, _reservations: &mut OrderReservationPool) -> DispatchResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DispatchError::Internal("boom".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut lifecycle = Lifecycle::default();
        assert!(!lifecycle.terminate());
        assert!(lifecycle.initialize());
        assert!(!lifecycle.initialize());
        assert!(lifecycle.is_running());
        assert!(lifecycle.terminate());
        assert!(!lifecycle.terminate());
        assert_eq!(lifecycle, Lifecycle::Terminated);
        assert!(lifecycle.initialize());
    }

    #[test]
    fn test_failing_phase_does_not_stop_the_cycle() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut pipeline = PhasePipeline::new(vec![
            Box::new(CountingPhase::new("first", runs.clone(), false)),
            Box::new(CountingPhase::new("failing", runs.clone(), true)),
            Box::new(CountingPhase::new("last", runs.clone(), false)),
        ]);
        let mut reservations = OrderReservationPool::new();

        pipeline.initialize();
        assert!(pipeline.is_initialized());

        let failures = pipeline.run(&mut reservations);

        assert_eq!(failures, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_terminated_pipeline_skips_phases() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut pipeline =
            PhasePipeline::new(vec![Box::new(CountingPhase::new("only", runs.clone(), false))]);
        let mut reservations = OrderReservationPool::new();

        pipeline.initialize();
        pipeline.terminate();
        pipeline.terminate();
        pipeline.run(&mut reservations);

        assert!(!pipeline.is_initialized());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
