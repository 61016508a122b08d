use std::cmp::Ordering;

use fleet_core::{models::TransportOrder, OrderPriority};

/// 按配置的排序键依次比较运输订单
#[derive(Debug, Clone)]
pub struct OrderComparator {
    keys: Vec<OrderPriority>,
}

impl OrderComparator {
    pub fn new(keys: Vec<OrderPriority>) -> Self {
        Self { keys }
    }

    /// 仅按创建时间排序（早者优先）
    pub fn by_age() -> Self {
        Self::new(vec![OrderPriority::ByAge])
    }

    /// 配置的排序键都相等时，先加入对象池的订单优先
    pub fn compare(&self, a: &TransportOrder, b: &TransportOrder) -> Ordering {
        self.keys
            .iter()
            .fold(Ordering::Equal, |ordering, key| {
                ordering.then_with(|| compare_by(*key, a, b))
            })
            .then_with(|| a.creation_sequence.cmp(&b.creation_sequence))
    }

    pub fn sort(&self, orders: &mut [TransportOrder]) {
        orders.sort_by(|a, b| self.compare(a, b));
    }
}

impl Default for OrderComparator {
    fn default() -> Self {
        Self::by_age()
    }
}

fn compare_by(key: OrderPriority, a: &TransportOrder, b: &TransportOrder) -> Ordering {
    match key {
        OrderPriority::ByAge => a.creation_time.cmp(&b.creation_time),
        // 没有截止时间的订单排在最后
        OrderPriority::ByDeadline => match (&a.deadline, &b.deadline) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        OrderPriority::ByName => a.name.cmp(&b.name),
    }
}
