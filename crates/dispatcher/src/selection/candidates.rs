use super::{SelectionContext, SelectionFilter};
use crate::candidate::AssignmentCandidate;

/// 订单指定了其他车辆时拒绝
#[derive(Debug, Default)]
pub struct IsProcessableByVehicle;

impl SelectionFilter<AssignmentCandidate> for IsProcessableByVehicle {
    fn name(&self) -> &'static str {
        "IsProcessableByVehicle"
    }

    fn apply(&self, candidate: &AssignmentCandidate, _ctx: &SelectionContext<'_>) -> Vec<String> {
        match &candidate.transport_order.intended_vehicle {
            Some(intended) if *intended != candidate.vehicle.name => {
                vec![format!("订单指定由车辆 {intended} 执行")]
            }
            _ => vec![],
        }
    }
}

/// 每个分段都必须带有路线
#[derive(Debug, Default)]
pub struct HasCompleteRoute;

impl SelectionFilter<AssignmentCandidate> for HasCompleteRoute {
    fn name(&self) -> &'static str {
        "HasCompleteRoute"
    }

    fn apply(&self, candidate: &AssignmentCandidate, _ctx: &SelectionContext<'_>) -> Vec<String> {
        let mut reasons: Vec<String> = candidate
            .drive_orders
            .iter()
            .filter(|drive_order| drive_order.route.is_none())
            .map(|drive_order| format!("分段 {} 没有路线", drive_order.destination))
            .collect();

        if candidate.drive_orders.len() != candidate.transport_order.drive_orders.len() {
            reasons.push(format!(
                "路线分段数 {} 与订单分段数 {} 不一致",
                candidate.drive_orders.len(),
                candidate.transport_order.drive_orders.len()
            ));
        }

        reasons
    }
}
