//! # 数据模型
//!
//! 定义车队调度的核心数据结构：场地模型（点、路径、位置）、车辆、运输订单、订单序列，
//! 以及对象变更事件。
//!
//! 所有模型都是不可变快照：服务层按引用返回对象的克隆，修改必须经由对应服务的更新接口，
//! 由服务发布 [`FleetEvent`]。
//!
//! ## 车辆状态
//! ```text
//! ProcState: Idle → ProcessingOrder ⇄ AwaitingOrder → Idle
//! ```

pub mod event;
pub mod ids;
pub mod order_sequence;
pub mod plant;
pub mod transport_order;
pub mod vehicle;

pub use event::*;
pub use ids::*;
pub use order_sequence::*;
pub use plant::*;
pub use transport_order::*;
pub use vehicle::*;
