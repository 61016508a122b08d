pub mod app_config;
pub mod dispatcher;
pub mod runtime;

pub use app_config::AppConfig;
pub use dispatcher::{DispatcherConfig, OrderPriority, RerouteTrigger, VehiclePriority};
pub use runtime::{LoopbackConfig, ObservabilityConfig, PlantConfig};
