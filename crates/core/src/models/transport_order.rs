use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LocationRef, OrderRef, PathRef, PointRef, SequenceRef, VehicleRef};

/// 运输订单
///
/// 一个运输订单由一个或多个有序的行驶订单（分段）组成，必须由同一辆车依次完成。
///
/// # 状态流转
///
/// ```text
/// Raw → Dispatchable → BeingProcessed → Finished
///            ↓               ↓
///   Failed/Unroutable    Withdrawn → Failed
/// ```
///
/// 不变量：处于 `Dispatchable` 状态的订单没有任何正在执行的分段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOrder {
    pub name: OrderRef,
    pub state: OrderState,
    pub drive_orders: Vec<DriveOrder>,
    pub wrapping_sequence: Option<SequenceRef>,
    pub intended_vehicle: Option<VehicleRef>,
    pub processing_vehicle: Option<VehicleRef>,
    pub creation_time: DateTime<Utc>,
    /// 加入对象池的先后序号，创建时间相同的订单按它排序
    #[serde(default)]
    pub creation_sequence: u64,
    pub deadline: Option<DateTime<Utc>>,
    pub properties: BTreeMap<String, String>,
}

/// 运输订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// 刚创建，尚不可调度
    Raw,
    /// 可参与分配
    Dispatchable,
    /// 已分配给车辆，正在执行
    BeingProcessed,
    /// 已撤回，等待车辆结束当前分段
    Withdrawn,
    Finished,
    Failed,
    /// 没有车辆能够规划出路线
    Unroutable,
}

impl OrderState {
    /// 是否为终止状态
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Unroutable)
    }
}

impl TransportOrder {
    pub fn has_state(&self, state: OrderState) -> bool {
        self.state == state
    }

    /// 当前正在执行的分段
    pub fn current_drive_order(&self) -> Option<&DriveOrder> {
        self.drive_orders.iter().find(|d| d.state.is_active())
    }

    pub fn current_drive_order_index(&self) -> Option<usize> {
        self.drive_orders.iter().position(|d| d.state.is_active())
    }

    /// 下一个尚未开始的分段索引
    pub fn next_drive_order_index(&self) -> Option<usize> {
        self.drive_orders
            .iter()
            .position(|d| d.state == DriveOrderState::Pristine)
    }

    /// 当前分段是否为最后一个分段
    pub fn is_on_final_drive_order(&self) -> bool {
        self.current_drive_order().is_some() && self.next_drive_order_index().is_none()
    }

    /// 订单全部分段执行完毕后车辆所处的点（需要已规划路线）
    pub fn final_destination_point(&self) -> Option<&PointRef> {
        self.drive_orders
            .last()
            .and_then(|d| d.route.as_ref())
            .and_then(Route::final_destination_point)
    }
}

/// 行驶订单（运输订单的一个分段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveOrder {
    pub destination: Destination,
    pub route: Option<Route>,
    pub state: DriveOrderState,
}

impl DriveOrder {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            route: None,
            state: DriveOrderState::Pristine,
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_state(mut self, state: DriveOrderState) -> Self {
        self.state = state;
        self
    }
}

impl fmt::Display for DriveOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route {
            Some(route) => write!(f, "{} -> {}", route.costs, self.destination),
            None => write!(f, "<无路线> -> {}", self.destination),
        }
    }
}

/// 行驶订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveOrderState {
    #[default]
    Pristine,
    Travelling,
    Operating,
    Finished,
    Failed,
}

impl DriveOrderState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Travelling | Self::Operating)
    }
}

/// 目的地的目标对象：点或位置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationTarget {
    Point(PointRef),
    Location(LocationRef),
}

impl fmt::Display for DestinationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(point) => write!(f, "{point}"),
            Self::Location(location) => write!(f, "{location}"),
        }
    }
}

/// 行驶订单的目的地：目标对象 + 在该处执行的操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub target: DestinationTarget,
    pub operation: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Destination {
    pub const OP_NOP: &'static str = "NOP";
    pub const OP_PARK: &'static str = "PARK";
    pub const OP_MOVE: &'static str = "MOVE";

    pub fn point(point: PointRef, operation: impl Into<String>) -> Self {
        Self {
            target: DestinationTarget::Point(point),
            operation: operation.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn location(location: LocationRef, operation: impl Into<String>) -> Self {
        Self {
            target: DestinationTarget::Location(location),
            operation: operation.into(),
            properties: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target, self.operation)
    }
}

/// 路线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<Step>,
    pub costs: u64,
}

impl Route {
    pub fn new(steps: Vec<Step>, costs: u64) -> Self {
        Self { steps, costs }
    }

    pub fn final_destination_point(&self) -> Option<&PointRef> {
        self.steps.last().map(|step| &step.destination_point)
    }

    /// 路线经过的所有点（含终点）
    pub fn points(&self) -> impl Iterator<Item = &PointRef> {
        self.steps
            .iter()
            .flat_map(|step| step.source_point.iter().chain(Some(&step.destination_point)))
    }
}

/// 路线中的一步
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 为空表示原地步骤（起点即终点）
    pub path: Option<PathRef>,
    pub source_point: Option<PointRef>,
    pub destination_point: PointRef,
}

/// 创建运输订单所需的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOrderCreation {
    pub name: String,
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub intended_vehicle: Option<VehicleRef>,
    #[serde(default)]
    pub wrapping_sequence: Option<SequenceRef>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl TransportOrderCreation {
    pub fn new(name: impl Into<String>, destinations: Vec<Destination>) -> Self {
        Self {
            name: name.into(),
            destinations,
            intended_vehicle: None,
            wrapping_sequence: None,
            deadline: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_intended_vehicle(mut self, vehicle: VehicleRef) -> Self {
        self.intended_vehicle = Some(vehicle);
        self
    }

    /// 以给定的创建时间构造订单对象（初始状态为 `Dispatchable`）
    pub fn into_order(self, creation_time: DateTime<Utc>) -> TransportOrder {
        TransportOrder {
            name: OrderRef::new(self.name),
            state: OrderState::Dispatchable,
            drive_orders: self.destinations.into_iter().map(DriveOrder::new).collect(),
            wrapping_sequence: self.wrapping_sequence,
            intended_vehicle: self.intended_vehicle,
            processing_vehicle: None,
            creation_time,
            creation_sequence: 0,
            deadline: self.deadline,
            properties: self.properties,
        }
    }
}
