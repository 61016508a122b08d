use crate::models::{DriveOrder, Point, PointRef, TransportOrder, Vehicle};

/// 路由服务接口
///
/// 调度器只通过该接口获得路线与代价，不关心具体的图搜索和资源分配实现。
/// 所有方法都是同步且有界的，在调度器的串行执行上下文中调用。
pub trait Router: Send + Sync {
    /// 为车辆从 `source` 出发执行订单的全部分段规划路线
    ///
    /// 返回带路线的行驶订单序列（与订单分段一一对应），`None` 表示不可达。
    fn get_route(
        &self,
        vehicle: &Vehicle,
        source: &Point,
        order: &TransportOrder,
    ) -> Option<Vec<DriveOrder>>;

    /// 两点之间的行驶代价，`None` 表示不可达
    fn get_costs(&self, vehicle: &Vehicle, source: &PointRef, destination: &PointRef)
        -> Option<u64>;

    /// 订单的目的地之间是否相互可达
    fn check_routability(&self, order: &TransportOrder) -> bool;
}
