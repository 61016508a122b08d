//! 运输订单调度引擎
//!
//! 入口是 [`DefaultDispatcher`]：外部请求（显式调度、撤回、拓扑变化）、定时器和对象变更事件
//! 都被转换为工作单元，交给唯一的调度工作者按提交顺序执行。工作者独占订单预留池和
//! 阶段流水线，因此阶段、过滤器和预留池内部都不需要加锁。

pub mod candidate;
pub mod dispatcher;
pub mod implicit_trigger;
pub mod phase;
pub mod priorization;
pub mod reroute;
pub mod reservation_pool;
pub mod selection;
pub mod services;
pub mod suppliers;
pub mod transport_order_util;
pub mod worker;

pub use candidate::AssignmentCandidate;
pub use dispatcher::DefaultDispatcher;
pub use implicit_trigger::ImplicitDispatchTrigger;
pub use phase::{Lifecycle, Phase, PhasePipeline};
pub use reservation_pool::OrderReservationPool;
pub use services::DispatchServices;
pub use suppliers::{
    DefaultParkingPositionSupplier, DefaultRechargePositionSupplier, ParkingPositionSupplier,
    RechargePositionSupplier,
};
pub use transport_order_util::TransportOrderUtil;
pub use worker::{DispatchCommand, DispatchTrigger};
