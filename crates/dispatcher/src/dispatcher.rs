use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fleet_core::{
    models::{FleetEvent, OrderRef, VehicleRef},
    DispatchError, DispatchResult, Dispatcher, DispatcherConfig, EventBus, RerouteTrigger,
};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc, oneshot,
    },
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    implicit_trigger::ImplicitDispatchTrigger,
    phase::PhasePipeline,
    services::DispatchServices,
    suppliers::{
        DefaultParkingPositionSupplier, DefaultRechargePositionSupplier, ParkingPositionSupplier,
        RechargePositionSupplier,
    },
    transport_order_util::TransportOrderUtil,
    worker::{DispatchCommand, DispatchTrigger, DispatchWorker},
};

enum DispatcherState {
    Uninitialized,
    Running(RunningDispatcher),
    Terminated { worker: Option<JoinHandle<()>> },
}

struct RunningDispatcher {
    commands: mpsc::UnboundedSender<DispatchCommand>,
    worker: JoinHandle<()>,
    periodic_task: JoinHandle<()>,
    implicit_trigger: JoinHandle<()>,
}

/// 默认调度器
///
/// 所有请求只在调用方线程上做引用和状态校验，随后提交给唯一的调度工作者按提交顺序执行。
pub struct DefaultDispatcher {
    config: DispatcherConfig,
    services: DispatchServices,
    event_bus: EventBus,
    parking_supplier: Arc<dyn ParkingPositionSupplier>,
    recharge_supplier: Arc<dyn RechargePositionSupplier>,
    state: Mutex<DispatcherState>,
}

impl DefaultDispatcher {
    pub fn new(config: DispatcherConfig, services: DispatchServices, event_bus: EventBus) -> Self {
        Self {
            parking_supplier: Arc::new(DefaultParkingPositionSupplier::new(services.clone())),
            recharge_supplier: Arc::new(DefaultRechargePositionSupplier::new(services.clone())),
            config,
            services,
            event_bus,
            state: Mutex::new(DispatcherState::Uninitialized),
        }
    }

    pub fn with_parking_supplier(mut self, supplier: Arc<dyn ParkingPositionSupplier>) -> Self {
        self.parking_supplier = supplier;
        self
    }

    pub fn with_recharge_supplier(mut self, supplier: Arc<dyn RechargePositionSupplier>) -> Self {
        self.recharge_supplier = supplier;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 启动调度工作者、事件订阅和定时重新调度
    ///
    /// 必须在 Tokio 运行时中调用；已在运行时不做任何事。终止后可以再次初始化，
    /// 新的工作者在上一个工作者退出之后才开始执行。
    pub fn initialize(&self) -> DispatchResult<()> {
        let mut state = self.lock_state();
        if matches!(*state, DispatcherState::Running(_)) {
            debug!("调度器已初始化");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DispatchError::Internal(format!("没有可用的Tokio运行时: {e}")))?;

        let (commands, receiver) = mpsc::unbounded_channel();

        let util = Arc::new(TransportOrderUtil::new(self.services.clone()));
        let pipeline = PhasePipeline::standard(
            &self.config,
            &self.services,
            util.clone(),
            self.parking_supplier.clone(),
            self.recharge_supplier.clone(),
        );
        let worker = DispatchWorker::new(self.services.clone(), pipeline, util);

        // 上一个工作者可能仍在执行终止前提交的工作，新工作者等它退出后才开始消费
        let previous = match &mut *state {
            DispatcherState::Terminated { worker } => worker.take(),
            _ => None,
        };
        let worker = runtime.spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!("上一个调度工作者异常退出: {}", e);
                }
            }
            worker.run(receiver).await;
        });
        let implicit_trigger = runtime.spawn(Self::forward_events(
            self.event_bus.subscribe(),
            commands.clone(),
        ));
        let periodic_task = runtime.spawn(Self::periodic_redispatch(
            Duration::from_millis(self.config.idle_vehicle_redispatching_interval_ms),
            commands.clone(),
        ));

        *state = DispatcherState::Running(RunningDispatcher {
            commands,
            worker,
            periodic_task,
            implicit_trigger,
        });

        info!(
            "调度器已初始化，定时重新调度间隔 {}ms",
            self.config.idle_vehicle_redispatching_interval_ms
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.lock_state(), DispatcherState::Running(_))
    }

    /// 停止定时器和事件订阅，并让工作者在执行完已提交的工作后退出
    ///
    /// 重复调用不做任何事。
    pub fn terminate(&self) {
        let mut state = self.lock_state();
        let previous = std::mem::replace(&mut *state, DispatcherState::Uninitialized);

        *state = match previous {
            DispatcherState::Running(running) => {
                running.periodic_task.abort();
                running.implicit_trigger.abort();
                if running.commands.send(DispatchCommand::Terminate).is_err() {
                    warn!("调度工作者已提前退出");
                }
                info!("调度器已终止");
                DispatcherState::Terminated {
                    worker: Some(running.worker),
                }
            }
            other => {
                debug!("调度器未在运行，忽略终止请求");
                other
            }
        };
    }

    /// 等待工作者执行完终止前提交的全部工作
    pub async fn wait_for_termination(&self) {
        if let Some(worker) = self.take_terminated_worker() {
            if let Err(e) = worker.await {
                warn!("调度工作者异常退出: {}", e);
            }
        }
    }

    /// 预留池快照，经由串行上下文获取
    pub async fn reservations_snapshot(&self) -> DispatchResult<BTreeMap<VehicleRef, Vec<OrderRef>>> {
        let (reply, response) = oneshot::channel();
        self.submit(DispatchCommand::Snapshot(reply))?;
        response
            .await
            .map_err(|_| DispatchError::Internal("调度工作者在应答前退出".to_string()))
    }

    fn submit(&self, command: DispatchCommand) -> DispatchResult<()> {
        match &*self.lock_state() {
            DispatcherState::Running(running) => running
                .commands
                .send(command)
                .map_err(|_| DispatchError::IllegalState("调度工作者已停止".to_string())),
            _ => Err(DispatchError::NotInitialized),
        }
    }

    fn take_terminated_worker(&self) -> Option<JoinHandle<()>> {
        match &mut *self.lock_state() {
            DispatcherState::Terminated { worker } => worker.take(),
            _ => None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn forward_events(
        mut events: broadcast::Receiver<FleetEvent>,
        commands: mpsc::UnboundedSender<DispatchCommand>,
    ) {
        loop {
            let trigger = match events.recv().await {
                Ok(event) => {
                    if !ImplicitDispatchTrigger::should_dispatch(&event) {
                        continue;
                    }
                    debug!("对象 {} 的变更触发调度", event.object_name());
                    DispatchTrigger::Implicit
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("事件订阅滞后，丢失 {} 个事件，补发一次调度", skipped);
                    DispatchTrigger::Implicit
                }
                Err(RecvError::Closed) => break,
            };

            if commands.send(DispatchCommand::Dispatch(trigger)).is_err() {
                break;
            }
        }
    }

    async fn periodic_redispatch(
        interval: Duration,
        commands: mpsc::UnboundedSender<DispatchCommand>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成，跳过
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if commands
                .send(DispatchCommand::Dispatch(DispatchTrigger::Periodic))
                .is_err()
            {
                break;
            }
        }
    }
}

#[async_trait]
impl Dispatcher for DefaultDispatcher {
    fn dispatch(&self) -> DispatchResult<()> {
        debug!("提交调度请求");
        self.submit(DispatchCommand::Dispatch(DispatchTrigger::Explicit))
    }

    fn withdraw_order(&self, order: &OrderRef, immediate_abort: bool) -> DispatchResult<()> {
        self.services
            .orders
            .fetch_transport_order(order)
            .ok_or_else(|| DispatchError::order_unknown(order))?;

        debug!("提交订单 {} 的撤回请求 (立即中止: {})", order, immediate_abort);
        self.submit(DispatchCommand::WithdrawByOrder {
            order: order.clone(),
            immediate_abort,
        })
    }

    fn withdraw_order_by_vehicle(
        &self,
        vehicle: &VehicleRef,
        immediate_abort: bool,
    ) -> DispatchResult<()> {
        self.services
            .vehicles
            .fetch_vehicle(vehicle)
            .ok_or_else(|| DispatchError::vehicle_unknown(vehicle))?;

        debug!(
            "提交车辆 {} 的撤回请求 (立即中止: {})",
            vehicle, immediate_abort
        );
        self.submit(DispatchCommand::WithdrawByVehicle {
            vehicle: vehicle.clone(),
            immediate_abort,
        })
    }

    fn topology_changed(&self) -> DispatchResult<()> {
        if !self.is_initialized() {
            return Err(DispatchError::NotInitialized);
        }

        if self.config.reroute_trigger != RerouteTrigger::TopologyChange {
            debug!("重新规划触发条件为 {:?}，忽略拓扑变化", self.config.reroute_trigger);
            return Ok(());
        }

        info!("场地拓扑发生变化，提交重新规划请求");
        self.submit(DispatchCommand::Reroute)
    }

    async fn flush(&self) -> DispatchResult<()> {
        let (reply, done) = oneshot::channel();
        self.submit(DispatchCommand::Barrier(reply))?;
        done.await
            .map_err(|_| DispatchError::Internal("调度工作者在应答前退出".to_string()))
    }
}

impl Drop for DefaultDispatcher {
    fn drop(&mut self) {
        self.terminate();
    }
}
