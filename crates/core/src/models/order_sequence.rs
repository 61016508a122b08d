use serde::{Deserialize, Serialize};

use super::{OrderRef, SequenceRef, VehicleRef};

/// 订单序列：一组必须由同一辆车按顺序执行的运输订单
///
/// 只要有车辆正在处理序列中的订单（`processing_vehicle` 非空），序列就被该车辆占用，
/// 其中的订单不再参与自由分配。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSequence {
    pub name: SequenceRef,
    pub orders: Vec<OrderRef>,
    /// 已结束（完成或失败）的订单数
    pub finished_count: usize,
    /// 是否不会再追加订单
    pub complete: bool,
    pub finished: bool,
    /// 序列中一个订单失败时，其余订单是否一并失败
    pub failure_fatal: bool,
    pub intended_vehicle: Option<VehicleRef>,
    pub processing_vehicle: Option<VehicleRef>,
}

impl OrderSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: SequenceRef::new(name),
            orders: Vec::new(),
            finished_count: 0,
            complete: false,
            finished: false,
            failure_fatal: false,
            intended_vehicle: None,
            processing_vehicle: None,
        }
    }

    /// 下一个待执行的订单
    pub fn next_unfinished_order(&self) -> Option<&OrderRef> {
        self.orders.get(self.finished_count)
    }

    /// 序列中尚未结束的订单
    pub fn unfinished_orders(&self) -> &[OrderRef] {
        self.orders.get(self.finished_count..).unwrap_or(&[])
    }

    /// 是否已被某辆车占用
    pub fn is_claimed(&self) -> bool {
        self.processing_vehicle.is_some()
    }

    /// 序列已完整且所有订单均已结束
    pub fn is_exhausted(&self) -> bool {
        self.complete && self.finished_count >= self.orders.len()
    }
}
