use std::collections::BTreeMap;

use crate::{
    models::{DriveOrder, VehicleRef},
    DispatchResult,
};

/// 车辆控制器接口（车辆通信层）
///
/// 调度器通过它下发行驶订单或要求中止。车辆完成分段后由通信层更新车辆状态
/// （位置、`ProcState::AwaitingOrder`），调度器再经事件触发下一轮调度。
pub trait VehicleController: Send + Sync {
    /// 下发一个带路线的行驶订单
    fn set_drive_order(
        &self,
        vehicle: &VehicleRef,
        drive_order: &DriveOrder,
        order_properties: &BTreeMap<String, String>,
    ) -> DispatchResult<()>;

    /// 中止当前行驶订单
    ///
    /// `immediate` 为 false 时车辆完成当前分段后停下。
    fn abort_drive_order(&self, vehicle: &VehicleRef, immediate: bool) -> DispatchResult<()>;
}
