use std::cmp::Ordering;

use super::{OrderComparator, VehicleComparator};
use crate::candidate::AssignmentCandidate;

/// 候选比较：先比较路线总代价，再依次按车辆、订单排序键
#[derive(Debug, Clone, Default)]
pub struct CandidateComparator {
    vehicles: VehicleComparator,
    orders: OrderComparator,
}

impl CandidateComparator {
    pub fn new(vehicles: VehicleComparator, orders: OrderComparator) -> Self {
        Self { vehicles, orders }
    }

    pub fn compare(&self, a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
        a.completely_routed_costs()
            .cmp(&b.completely_routed_costs())
            .then_with(|| self.vehicles.compare(&a.vehicle, &b.vehicle))
            .then_with(|| {
                self.orders
                    .compare(&a.transport_order, &b.transport_order)
            })
    }

    /// 最优候选；多个候选相同时取先出现者
    pub fn best(&self, candidates: Vec<AssignmentCandidate>) -> Option<AssignmentCandidate> {
        candidates.into_iter().reduce(|best, candidate| {
            if self.compare(&candidate, &best) == Ordering::Less {
                candidate
            } else {
                best
            }
        })
    }
}
