use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use fleet_core::{
    models::{OrderRef, VehicleRef},
    DispatchError, DispatchResult,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span};

use crate::{
    phase::PhasePipeline,
    reroute::RerouteUtil,
    reservation_pool::OrderReservationPool,
    selection::{IsAvailableForAnyOrder, SelectionContext, SelectionFilter},
    services::DispatchServices,
    transport_order_util::TransportOrderUtil,
};

/// 调度请求的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTrigger {
    /// 调用方显式请求
    Explicit,
    /// 定时器触发的空闲车辆检查
    Periodic,
    /// 对象变更事件触发
    Implicit,
}

impl DispatchTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Periodic => "periodic",
            Self::Implicit => "implicit",
        }
    }
}

impl fmt::Display for DispatchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提交到串行执行上下文的工作单元
#[derive(Debug)]
pub enum DispatchCommand {
    Dispatch(DispatchTrigger),
    WithdrawByOrder {
        order: OrderRef,
        immediate_abort: bool,
    },
    WithdrawByVehicle {
        vehicle: VehicleRef,
        immediate_abort: bool,
    },
    Reroute,
    /// 此前提交的全部工作完成后应答
    Barrier(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<BTreeMap<VehicleRef, Vec<OrderRef>>>),
    Terminate,
}

/// 调度工作者
///
/// 独占预留池和阶段流水线，按提交顺序逐个执行工作单元，内部不需要任何锁。
pub struct DispatchWorker {
    services: DispatchServices,
    reservations: OrderReservationPool,
    pipeline: PhasePipeline,
    util: Arc<TransportOrderUtil>,
    reroute: RerouteUtil,
}

impl DispatchWorker {
    pub fn new(
        services: DispatchServices,
        pipeline: PhasePipeline,
        util: Arc<TransportOrderUtil>,
    ) -> Self {
        Self {
            reroute: RerouteUtil::new(services.clone()),
            services,
            reservations: OrderReservationPool::new(),
            pipeline,
            util,
        }
    }

    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<DispatchCommand>) {
        self.reservations.clear();
        self.pipeline.initialize();
        info!("调度工作者已启动，阶段: {:?}", self.pipeline.phase_names());

        while let Some(command) = commands.recv().await {
            if matches!(command, DispatchCommand::Terminate) {
                break;
            }
            self.handle(command);
        }

        self.pipeline.terminate();
        self.reservations.clear();
        info!("调度工作者已停止");
    }

    fn handle(&mut self, command: DispatchCommand) {
        match command {
            DispatchCommand::Dispatch(trigger) => self.dispatch(trigger),
            DispatchCommand::WithdrawByOrder {
                order,
                immediate_abort,
            } => {
                if let Err(e) = self.withdraw_by_order(&order, immediate_abort) {
                    error!("撤回订单 {} 失败: {}", order, e);
                }
            }
            DispatchCommand::WithdrawByVehicle {
                vehicle,
                immediate_abort,
            } => {
                if let Err(e) = self.withdraw_by_vehicle(&vehicle, immediate_abort) {
                    error!("撤回车辆 {} 的订单失败: {}", vehicle, e);
                }
            }
            DispatchCommand::Reroute => {
                if let Err(e) = self.reroute.reroute_all() {
                    error!("重新规划路线失败: {}", e);
                }
            }
            DispatchCommand::Barrier(reply) => {
                let _ = reply.send(());
            }
            DispatchCommand::Snapshot(reply) => {
                let _ = reply.send(self.reservations.snapshot());
            }
            DispatchCommand::Terminate => {}
        }
    }

    fn dispatch(&mut self, trigger: DispatchTrigger) {
        if trigger == DispatchTrigger::Periodic {
            let cleared = self.util.clear_controller_failures();
            if cleared > 0 {
                debug!("重新允许 {} 辆下发失败的车辆参与调度", cleared);
            }
            if !self.any_vehicle_available() {
                debug!("没有可调度的空闲车辆，跳过定时调度");
                return;
            }
        }

        let span = info_span!("dispatch_cycle", trigger = %trigger);
        let _guard = span.enter();

        let started = Instant::now();
        let failures = self.pipeline.run(&mut self.reservations);
        let elapsed = started.elapsed();

        metrics::counter!("fleet_dispatch_cycles_total", "trigger" => trigger.as_str()).increment(1);
        metrics::histogram!("fleet_dispatch_cycle_duration_seconds").record(elapsed.as_secs_f64());
        debug!(
            "调度周期完成，耗时 {:?}，失败阶段数 {}，预留数 {}",
            elapsed,
            failures,
            self.reservations.len()
        );
    }

    fn any_vehicle_available(&self) -> bool {
        let ctx = SelectionContext::new(&self.reservations);
        self.services
            .vehicles
            .fetch_vehicles()
            .iter()
            .any(|vehicle| IsAvailableForAnyOrder.apply(vehicle, &ctx).is_empty())
    }

    fn withdraw_by_order(&mut self, order_ref: &OrderRef, immediate_abort: bool) -> DispatchResult<()> {
        self.reservations.remove_reservation(order_ref);

        let order = self
            .services
            .orders
            .fetch_transport_order(order_ref)
            .ok_or_else(|| DispatchError::order_unknown(order_ref))?;

        self.util.abort_order(&order, immediate_abort)
    }

    fn withdraw_by_vehicle(
        &mut self,
        vehicle_ref: &VehicleRef,
        immediate_abort: bool,
    ) -> DispatchResult<()> {
        let dropped = self.reservations.remove_reservations(vehicle_ref);
        if !dropped.is_empty() {
            debug!("清除车辆 {} 的预留: {:?}", vehicle_ref, dropped);
        }

        let vehicle = self
            .services
            .vehicles
            .fetch_vehicle(vehicle_ref)
            .ok_or_else(|| DispatchError::vehicle_unknown(vehicle_ref))?;

        self.util.abort_order_by_vehicle(&vehicle, immediate_abort)
    }
}
