use serde::{Deserialize, Serialize};

use super::{LocationRef, PathRef, PointRef};

/// 点的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointType {
    /// 可停靠点
    #[default]
    Halt,
    /// 停车点
    Park,
    /// 仅上报点，车辆不可停留
    Report,
}

/// 场地模型中的点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: PointRef,
    #[serde(rename = "type", default)]
    pub point_type: PointType,
}

impl Point {
    pub fn new(name: impl Into<String>, point_type: PointType) -> Self {
        Self {
            name: PointRef::new(name),
            point_type,
        }
    }

    pub fn is_parking_position(&self) -> bool {
        self.point_type == PointType::Park
    }
}

/// 两点之间的有向路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub name: PathRef,
    pub source: PointRef,
    pub destination: PointRef,
    /// 路径长度（毫米），作为路由代价
    pub length: u64,
    #[serde(default)]
    pub locked: bool,
}

/// 位置类型，声明该类位置允许的操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationType {
    pub name: String,
    #[serde(default)]
    pub allowed_operations: Vec<String>,
}

impl LocationType {
    pub fn allows_operation(&self, operation: &str) -> bool {
        self.allowed_operations.iter().any(|op| op == operation)
    }
}

/// 位置（工位），通过链接与一个或多个点相连
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: LocationRef,
    #[serde(rename = "type")]
    pub location_type: String,
    #[serde(default)]
    pub links: Vec<PointRef>,
    #[serde(default)]
    pub locked: bool,
}
