//! 配置模型
//!
//! 配置来自 TOML 文件，再由 `FLEET__` 前缀的环境变量覆盖，例如
//! `FLEET__DISPATCHER__PARK_IDLE_VEHICLES=false`。

pub mod models;

pub use models::{
    AppConfig, DispatcherConfig, LoopbackConfig, ObservabilityConfig, OrderPriority,
    PlantConfig, RerouteTrigger, VehiclePriority,
};
