//! # 基础设施
//!
//! 调度器依赖的服务的单进程实现：内存对象池、最短路径路由、模拟车辆控制器，
//! TOML 场地模型的加载，以及 Prometheus 指标导出。

pub mod loopback;
pub mod metrics_exporter;
pub mod object_pool;
pub mod plant_loader;
pub mod router;

pub use loopback::LoopbackVehicleController;
pub use metrics_exporter::init_metrics_exporter;
pub use object_pool::InMemoryObjectPool;
pub use plant_loader::{PlantModelFile, VehicleDefinition};
pub use router::ShortestPathRouter;
