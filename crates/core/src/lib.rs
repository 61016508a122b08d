pub mod config;
pub mod errors;
pub mod event_bus;
pub mod logging;
pub mod models;
pub mod traits;

pub use config::{AppConfig, DispatcherConfig, OrderPriority, RerouteTrigger, VehiclePriority};
pub use errors::*;
pub use event_bus::EventBus;
pub use models::*;
pub use traits::{
    Dispatcher, PlantModelService, Router, TransportOrderService, VehicleController,
    VehicleService,
};

/// 统一的Result类型
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
