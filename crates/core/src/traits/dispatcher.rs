use async_trait::async_trait;

use crate::{
    models::{OrderRef, VehicleRef},
    DispatchResult,
};

/// 调度器接口
///
/// 所有请求都只做基本校验（引用是否有效、调度器是否已初始化），随后提交到调度器的
/// 串行执行上下文，不在调用方线程上修改共享状态。
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// 提交一次完整的调度
    fn dispatch(&self) -> DispatchResult<()>;

    /// 撤回运输订单
    fn withdraw_order(&self, order: &OrderRef, immediate_abort: bool) -> DispatchResult<()>;

    /// 撤回车辆当前处理的运输订单
    fn withdraw_order_by_vehicle(
        &self,
        vehicle: &VehicleRef,
        immediate_abort: bool,
    ) -> DispatchResult<()>;

    /// 通知场地拓扑发生变化
    fn topology_changed(&self) -> DispatchResult<()>;

    /// 等待此前提交的所有工作执行完毕
    async fn flush(&self) -> DispatchResult<()>;
}
