//! 候选选择过滤器
//!
//! 过滤器返回拒绝原因列表，列表为空表示接受。[`CompositeFilter`] 汇总其中每个过滤器的
//! 全部原因，不做短路。

pub mod candidates;
pub mod composite;
pub mod orders;
pub mod vehicles;

use fleet_core::models::{TransportOrder, Vehicle};

use crate::{candidate::AssignmentCandidate, reservation_pool::OrderReservationPool};

pub use candidates::{HasCompleteRoute, IsProcessableByVehicle};
pub use composite::CompositeFilter;
pub use orders::{IsFreelyDispatchableToAnyVehicle, IsNextInSequence};
pub use vehicles::{
    IsAvailableForAnyOrder, IsNotBoundToSequence, IsNotProcessingOrder, IsParkable,
    IsRechargeable, IsReservableForFutureOrder,
};

/// 过滤器求值时可见的调度器内部状态
pub struct SelectionContext<'a> {
    pub reservations: &'a OrderReservationPool,
}

impl<'a> SelectionContext<'a> {
    pub fn new(reservations: &'a OrderReservationPool) -> Self {
        Self { reservations }
    }
}

pub trait SelectionFilter<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// 返回拒绝原因，空列表表示接受
    fn apply(&self, input: &T, ctx: &SelectionContext<'_>) -> Vec<String>;
}

pub type OrderSelectionFilter = CompositeFilter<TransportOrder>;
pub type VehicleSelectionFilter = CompositeFilter<Vehicle>;
pub type CandidateSelectionFilter = CompositeFilter<AssignmentCandidate>;
