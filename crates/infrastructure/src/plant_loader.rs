use std::collections::{BTreeMap, HashSet};
use std::path::Path as FsPath;

use anyhow::{bail, Context, Result};
use fleet_core::{
    models::{
        IntegrationLevel, Location, LocationType, Path, Point, PointRef, TransportOrderCreation,
        Vehicle, VehicleState,
    },
    TransportOrderService,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::object_pool::InMemoryObjectPool;

/// 场地模型文件中的车辆定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDefinition {
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default = "default_energy_level")]
    pub energy_level: u8,
    #[serde(default = "default_energy_level_critical")]
    pub energy_level_critical: u8,
    #[serde(default = "default_energy_level_good")]
    pub energy_level_good: u8,
    #[serde(default = "default_recharge_operation")]
    pub recharge_operation: String,
    #[serde(default = "default_integration_level")]
    pub integration_level: IntegrationLevel,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_energy_level() -> u8 {
    100
}

fn default_energy_level_critical() -> u8 {
    30
}

fn default_energy_level_good() -> u8 {
    90
}

fn default_recharge_operation() -> String {
    "CHARGE".to_string()
}

fn default_integration_level() -> IntegrationLevel {
    IntegrationLevel::ToBeUtilized
}

impl VehicleDefinition {
    fn into_vehicle(self) -> Vehicle {
        let mut vehicle = Vehicle::new(self.name);
        vehicle.current_position = self.position.map(PointRef::new);
        vehicle.state = VehicleState::Idle;
        vehicle.energy_level = self.energy_level.min(100);
        vehicle.energy_level_critical = self.energy_level_critical;
        vehicle.energy_level_good = self.energy_level_good;
        vehicle.recharge_operation = self.recharge_operation;
        vehicle.integration_level = self.integration_level;
        vehicle.properties = self.properties;
        vehicle
    }
}

/// 场地模型文件（TOML）
///
/// ```toml
/// [[points]]
/// name = "A"
/// type = "HALT"
///
/// [[paths]]
/// name = "A--B"
/// source = "A"
/// destination = "B"
/// length = 1000
///
/// [[vehicles]]
/// name = "Vehicle-01"
/// position = "A"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantModelFile {
    pub points: Vec<Point>,
    pub paths: Vec<Path>,
    pub location_types: Vec<LocationType>,
    pub locations: Vec<Location>,
    pub vehicles: Vec<VehicleDefinition>,
    pub transport_orders: Vec<TransportOrderCreation>,
}

impl PlantModelFile {
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取场地模型文件失败: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let model: PlantModelFile = toml::from_str(toml_str).context("解析场地模型失败")?;
        model.validate()?;
        Ok(model)
    }

    /// 检查模型内部的引用是否都能解析
    pub fn validate(&self) -> Result<()> {
        let points: HashSet<&str> = self.points.iter().map(|p| p.name.name()).collect();
        if points.len() != self.points.len() {
            bail!("场地模型中存在重名的点");
        }

        for path in &self.paths {
            for end in [&path.source, &path.destination] {
                if !points.contains(end.name()) {
                    bail!("路径 {} 引用了不存在的点 {}", path.name, end);
                }
            }
        }

        let location_types: HashSet<&str> =
            self.location_types.iter().map(|t| t.name.as_str()).collect();
        for location in &self.locations {
            if !location_types.contains(location.location_type.as_str()) {
                bail!(
                    "位置 {} 引用了不存在的位置类型 {}",
                    location.name,
                    location.location_type
                );
            }
            if let Some(link) = location.links.iter().find(|l| !points.contains(l.name())) {
                bail!("位置 {} 链接了不存在的点 {}", location.name, link);
            }
        }

        let mut vehicle_names = HashSet::new();
        for vehicle in &self.vehicles {
            if !vehicle_names.insert(vehicle.name.as_str()) {
                bail!("车辆 {} 重复定义", vehicle.name);
            }
            if let Some(position) = &vehicle.position {
                if !points.contains(position.as_str()) {
                    bail!("车辆 {} 位于不存在的点 {}", vehicle.name, position);
                }
            }
        }

        for order in &self.transport_orders {
            if order.destinations.is_empty() {
                bail!("运输订单 {} 没有目的地", order.name);
            }
            if let Some(vehicle) = &order.intended_vehicle {
                if !vehicle_names.contains(vehicle.name()) {
                    bail!("运输订单 {} 指定了不存在的车辆 {}", order.name, vehicle);
                }
            }
        }

        Ok(())
    }

    /// 把模型写入对象池，初始订单最后创建
    pub fn populate(self, pool: &InMemoryObjectPool) -> Result<()> {
        let summary = format!(
            "{} 个点, {} 条路径, {} 个位置, {} 辆车, {} 个初始订单",
            self.points.len(),
            self.paths.len(),
            self.locations.len(),
            self.vehicles.len(),
            self.transport_orders.len()
        );

        self.points.into_iter().for_each(|p| pool.add_point(p));
        self.paths.into_iter().for_each(|p| pool.add_path(p));
        self.location_types
            .into_iter()
            .for_each(|t| pool.add_location_type(t));
        self.locations.into_iter().for_each(|l| pool.add_location(l));
        self.vehicles
            .into_iter()
            .for_each(|v| pool.add_vehicle(v.into_vehicle()));

        for creation in self.transport_orders {
            let name = creation.name.clone();
            pool.create_transport_order(creation)
                .with_context(|| format!("创建初始运输订单 {name} 失败"))?;
        }

        info!("场地模型已加载: {}", summary);
        Ok(())
    }
}
