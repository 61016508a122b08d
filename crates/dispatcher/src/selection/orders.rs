use std::sync::Arc;

use fleet_core::{
    models::{OrderState, TransportOrder},
    TransportOrderService,
};

use super::{SelectionContext, SelectionFilter};

/// 订单是否可以自由分配给任意车辆
///
/// 要求订单处于 `DISPATCHABLE`，所属序列（若有）未被车辆占用，且没有为任何车辆预留。
pub struct IsFreelyDispatchableToAnyVehicle {
    orders: Arc<dyn TransportOrderService>,
}

impl IsFreelyDispatchableToAnyVehicle {
    pub fn new(orders: Arc<dyn TransportOrderService>) -> Self {
        Self { orders }
    }
}

impl SelectionFilter<TransportOrder> for IsFreelyDispatchableToAnyVehicle {
    fn name(&self) -> &'static str {
        "IsFreelyDispatchableToAnyVehicle"
    }

    fn apply(&self, order: &TransportOrder, ctx: &SelectionContext<'_>) -> Vec<String> {
        let mut reasons = Vec::new();

        if !order.has_state(OrderState::Dispatchable) {
            reasons.push(format!("订单状态为 {:?}，不可调度", order.state));
        }

        if let Some(sequence_ref) = &order.wrapping_sequence {
            match self.orders.fetch_order_sequence(sequence_ref) {
                Some(sequence) => {
                    if let Some(vehicle) = &sequence.processing_vehicle {
                        reasons.push(format!("所属序列 {sequence_ref} 已被车辆 {vehicle} 占用"));
                    }
                }
                None => reasons.push(format!("所属序列 {sequence_ref} 不存在")),
            }
        }

        if let Some(vehicle) = ctx.reservations.reserved_vehicle(&order.name) {
            reasons.push(format!("订单已为车辆 {vehicle} 预留"));
        }

        reasons
    }
}

/// 序列中的订单必须按顺序执行，只有序列的下一个未完成订单可以分配
pub struct IsNextInSequence {
    orders: Arc<dyn TransportOrderService>,
}

impl IsNextInSequence {
    pub fn new(orders: Arc<dyn TransportOrderService>) -> Self {
        Self { orders }
    }
}

impl SelectionFilter<TransportOrder> for IsNextInSequence {
    fn name(&self) -> &'static str {
        "IsNextInSequence"
    }

    fn apply(&self, order: &TransportOrder, _ctx: &SelectionContext<'_>) -> Vec<String> {
        let Some(sequence_ref) = &order.wrapping_sequence else {
            return vec![];
        };

        match self
            .orders
            .fetch_order_sequence(sequence_ref)
            .as_ref()
            .and_then(|sequence| sequence.next_unfinished_order().cloned())
        {
            Some(next) if next == order.name => vec![],
            Some(next) => vec![format!("序列 {sequence_ref} 的下一个订单是 {next}")],
            None => vec![format!("序列 {sequence_ref} 没有待执行的订单")],
        }
    }
}
