//! 排序与决胜规则
//!
//! 所有排序都是稳定排序，排序键相同的元素保持原有的相对顺序。

mod candidates;
mod orders;
mod vehicles;

pub use candidates::CandidateComparator;
pub use orders::OrderComparator;
pub use vehicles::VehicleComparator;
