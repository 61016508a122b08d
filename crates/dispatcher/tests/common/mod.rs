#![allow(dead_code)]

use std::sync::Arc;

use fleet_core::{
    models::{
        DriveOrderState, OrderRef, OrderState, PointRef, ProcState, Route, SequenceRef, Step,
        TransportOrder, Vehicle, VehicleRef, VehicleState,
    },
    Dispatcher, DispatcherConfig, PlantModelService, Router, TransportOrderService,
    VehicleService,
};
use fleet_dispatcher::{DefaultDispatcher, DispatchServices};
use fleet_infrastructure::InMemoryObjectPool;
use fleet_testing_utils::{
    builders::TransportOrderBuilder, helpers::PlantFixture, mocks::MockRouter,
    mocks::RecordingVehicleController,
};

/// 调度器集成测试环境：内存对象池 + 可控路由 + 记录型车辆控制器
pub struct Harness {
    pub pool: Arc<InMemoryObjectPool>,
    pub router: MockRouter,
    pub controller: RecordingVehicleController,
    pub dispatcher: DefaultDispatcher,
}

/// 只做订单分配的配置：关闭停车和充电，定时调度间隔足够长
pub fn assignment_only_config() -> DispatcherConfig {
    DispatcherConfig {
        idle_vehicle_redispatching_interval_ms: 60_000,
        park_idle_vehicles: false,
        recharge_idle_vehicles: false,
        ..DispatcherConfig::default()
    }
}

impl Harness {
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_router(config, |router| Arc::new(router) as Arc<dyn Router>)
    }

    /// 用 `wrap` 包装模拟路由后交给调度器，测试仍可通过 `router` 字段控制模拟路由
    pub fn with_router(
        config: DispatcherConfig,
        wrap: impl FnOnce(MockRouter) -> Arc<dyn Router>,
    ) -> Self {
        let pool = Arc::new(InMemoryObjectPool::default());
        let fixture = PlantFixture::line();
        fixture.points.into_iter().for_each(|p| pool.add_point(p));
        fixture.paths.into_iter().for_each(|p| pool.add_path(p));
        fixture
            .location_types
            .into_iter()
            .for_each(|t| pool.add_location_type(t));
        fixture
            .locations
            .into_iter()
            .for_each(|l| pool.add_location(l));

        let router = MockRouter::new();
        router.link_location("Charger-01", "D");
        let controller = RecordingVehicleController::new();

        let services = DispatchServices::new(
            pool.clone(),
            pool.clone(),
            pool.clone(),
            wrap(router.clone()),
            Arc::new(controller.clone()),
        );
        let dispatcher = DefaultDispatcher::new(config, services, pool.event_bus().clone());

        Self {
            pool,
            router,
            controller,
            dispatcher,
        }
    }

    pub fn start(config: DispatcherConfig) -> Self {
        let harness = Self::new(config);
        harness.dispatcher.initialize().unwrap();
        harness
    }

    /// 显式调度一次并等待完成
    pub async fn dispatch(&self) {
        self.dispatcher.dispatch().unwrap();
        self.dispatcher.flush().await.unwrap();
    }

    pub fn vehicle(&self, name: &str) -> Vehicle {
        self.pool.fetch_vehicle(&VehicleRef::new(name)).unwrap()
    }

    pub fn order(&self, name: &str) -> TransportOrder {
        self.pool
            .fetch_transport_order(&OrderRef::new(name))
            .unwrap()
    }

    pub fn order_state(&self, name: &str) -> OrderState {
        self.order(name).state
    }

    pub fn orders_with_prefix(&self, prefix: &str) -> Vec<TransportOrder> {
        self.pool
            .fetch_transport_orders()
            .into_iter()
            .filter(|o| o.name.name().starts_with(prefix))
            .collect()
    }

    pub fn sequence_finished(&self, name: &str) -> bool {
        self.pool
            .fetch_order_sequence(&SequenceRef::new(name))
            .unwrap()
            .finished
    }

    /// 模拟车辆通信层上报：当前分段已完成，车辆停在 `position`
    pub fn report_leg_finished(&self, vehicle: &str, position: &str) {
        let vehicle = VehicleRef::new(vehicle);
        self.pool
            .set_vehicle_position(&vehicle, Some(PointRef::new(position)))
            .unwrap();
        self.pool
            .set_vehicle_state(&vehicle, VehicleState::Idle)
            .unwrap();
        self.pool
            .update_vehicle_proc_state(&vehicle, ProcState::AwaitingOrder)
            .unwrap();
    }

    /// 直接构造一个正由车辆执行最后一个分段的订单
    pub fn add_order_in_progress(&self, order: &str, vehicle: &str, from: &str, to: &str) {
        let mut order = TransportOrderBuilder::new(order)
            .to_point(to)
            .with_state(OrderState::BeingProcessed)
            .processed_by(vehicle)
            .build();
        let step = Step {
            path: None,
            source_point: Some(PointRef::new(from)),
            destination_point: PointRef::new(to),
        };
        order.drive_orders[0].route = Some(Route::new(vec![step], 1000));
        order.drive_orders[0].state = DriveOrderState::Travelling;

        let order_ref = order.name.clone();
        self.pool.add_transport_order(order);
        self.pool
            .update_vehicle_transport_order(&VehicleRef::new(vehicle), Some(order_ref))
            .unwrap();
        self.pool
            .update_vehicle_proc_state(&VehicleRef::new(vehicle), ProcState::ProcessingOrder)
            .unwrap();
        self.pool
            .set_vehicle_state(&VehicleRef::new(vehicle), VehicleState::Executing)
            .unwrap();
    }

    pub fn has_point(&self, point: &str) -> bool {
        self.pool.fetch_point(&PointRef::new(point)).is_some()
    }
}
