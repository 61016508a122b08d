use fleet_core::models::{FleetEvent, OrderState, ProcState, TransportOrder, Vehicle};

/// 根据对象变更事件判断是否需要隐式触发一次调度
///
/// 触发条件：订单变为 `DISPATCHABLE`；车辆变为可调度；可调度车辆的处理状态变为
/// `IDLE`/`AWAITING_ORDER`；空闲的可调度车辆状态或位置发生变化。
#[derive(Debug, Default, Clone, Copy)]
pub struct ImplicitDispatchTrigger;

impl ImplicitDispatchTrigger {
    pub fn should_dispatch(event: &FleetEvent) -> bool {
        match event {
            FleetEvent::TransportOrder {
                previous,
                current: Some(current),
            } => order_became_dispatchable(previous.as_deref(), current),
            FleetEvent::Vehicle {
                previous,
                current: Some(current),
            } => vehicle_may_be_dispatched(previous.as_deref(), current),
            _ => false,
        }
    }
}

fn order_became_dispatchable(previous: Option<&TransportOrder>, current: &TransportOrder) -> bool {
    current.has_state(OrderState::Dispatchable)
        && previous.map_or(true, |previous| !previous.has_state(OrderState::Dispatchable))
}

fn vehicle_may_be_dispatched(previous: Option<&Vehicle>, current: &Vehicle) -> bool {
    if !current.is_to_be_utilized() {
        return false;
    }

    let Some(previous) = previous else {
        return true;
    };

    if !previous.is_to_be_utilized() {
        return true;
    }

    if previous.proc_state != current.proc_state
        && matches!(
            current.proc_state,
            ProcState::Idle | ProcState::AwaitingOrder
        )
    {
        return true;
    }

    current.has_proc_state(ProcState::Idle)
        && (previous.state != current.state
            || previous.current_position != current.current_position
            || previous.energy_level != current.energy_level)
}
