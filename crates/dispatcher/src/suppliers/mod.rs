//! 停车点与充电位置的选择策略

mod parking;
mod recharge;

pub use parking::{DefaultParkingPositionSupplier, ParkingPositionSupplier};
pub use recharge::{DefaultRechargePositionSupplier, RechargePositionSupplier};

/// 在候选中按"指定 > 偏好 > 最近"的顺序选择
///
/// 指定值不在候选中时直接返回 `None`，不会退而选择偏好值或最近的候选。
pub(crate) fn select_by_precedence<T, F>(
    candidates: &[T],
    assigned: Option<&T>,
    preferred: Option<&T>,
    nearest: F,
) -> Option<T>
where
    T: Clone + PartialEq,
    F: FnOnce(&[T]) -> Option<T>,
{
    if candidates.is_empty() {
        return None;
    }

    if let Some(assigned) = assigned {
        return candidates.contains(assigned).then(|| assigned.clone());
    }

    if let Some(preferred) = preferred.filter(|p| candidates.contains(p)) {
        return Some(preferred.clone());
    }

    nearest(candidates)
}
