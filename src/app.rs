use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_core::{AppConfig, Dispatcher};
use fleet_dispatcher::{DefaultDispatcher, DispatchServices};
use fleet_infrastructure::{
    InMemoryObjectPool, LoopbackVehicleController, PlantModelFile, ShortestPathRouter,
};
use tokio::sync::broadcast;
use tracing::info;

/// 主应用程序
///
/// 把内存对象池、最短路径路由和模拟车辆控制器装配到调度器上。
pub struct Application {
    config: AppConfig,
    pool: Arc<InMemoryObjectPool>,
    dispatcher: DefaultDispatcher,
}

impl Application {
    /// 按配置中的场地模型文件创建应用
    pub fn new(config: AppConfig) -> Result<Self> {
        let plant = PlantModelFile::load(&config.plant.model_file)
            .with_context(|| format!("加载场地模型失败: {}", config.plant.model_file))?;
        Self::with_plant(config, plant)
    }

    pub fn with_plant(config: AppConfig, plant: PlantModelFile) -> Result<Self> {
        config.validate()?;

        let pool = Arc::new(InMemoryObjectPool::default());
        plant.populate(&pool)?;

        let router = Arc::new(ShortestPathRouter::new(pool.clone()));
        let controller = Arc::new(LoopbackVehicleController::new(
            pool.clone(),
            config.loopback.clone(),
        ));
        let services = DispatchServices::new(
            pool.clone(),
            pool.clone(),
            pool.clone(),
            router,
            controller,
        );
        let dispatcher = DefaultDispatcher::new(
            config.dispatcher.clone(),
            services,
            pool.event_bus().clone(),
        );

        Ok(Self {
            config,
            pool,
            dispatcher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<InMemoryObjectPool> {
        &self.pool
    }

    pub fn dispatcher(&self) -> &DefaultDispatcher {
        &self.dispatcher
    }

    /// 启动调度器并运行到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.dispatcher.initialize().context("初始化调度器失败")?;
        self.dispatcher.dispatch()?;
        info!("车队调度服务已启动");

        let _ = shutdown_rx.recv().await;

        info!("停止调度器");
        self.dispatcher.terminate();
        self.dispatcher.wait_for_termination().await;
        Ok(())
    }
}
