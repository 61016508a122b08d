pub mod dispatcher;
pub mod router;
pub mod services;
pub mod vehicle_controller;

pub use dispatcher::*;
pub use router::*;
pub use services::*;
pub use vehicle_controller::*;
