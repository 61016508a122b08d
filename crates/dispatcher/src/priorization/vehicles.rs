use std::cmp::Ordering;

use fleet_core::{models::Vehicle, VehiclePriority};

/// 按配置的排序键依次比较车辆
#[derive(Debug, Clone, Default)]
pub struct VehicleComparator {
    keys: Vec<VehiclePriority>,
}

impl VehicleComparator {
    pub fn new(keys: Vec<VehiclePriority>) -> Self {
        Self { keys }
    }

    pub fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        self.keys
            .iter()
            .fold(Ordering::Equal, |ordering, key| {
                ordering.then_with(|| match key {
                    // 电量高者优先
                    VehiclePriority::ByEnergyLevel => b.energy_level.cmp(&a.energy_level),
                    VehiclePriority::ByName => a.name.cmp(&b.name),
                })
            })
    }

    pub fn sort(&self, vehicles: &mut [Vehicle]) {
        vehicles.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_testing_utils::builders::VehicleBuilder;

    #[test]
    fn test_energy_level_then_name() {
        let mut vehicles = vec![
            VehicleBuilder::new("Vehicle-03").with_energy_level(50).build(),
            VehicleBuilder::new("Vehicle-02").with_energy_level(80).build(),
            VehicleBuilder::new("Vehicle-01").with_energy_level(50).build(),
        ];

        VehicleComparator::new(vec![VehiclePriority::ByEnergyLevel, VehiclePriority::ByName])
            .sort(&mut vehicles);

        let names: Vec<&str> = vehicles.iter().map(|v| v.name.name()).collect();
        assert_eq!(names, vec!["Vehicle-02", "Vehicle-01", "Vehicle-03"]);
    }
}
