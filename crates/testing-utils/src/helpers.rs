//! Test helper utilities and common plant fixtures

use fleet_core::models::{Location, LocationRef, LocationType, Path, PathRef, Point, PointRef, PointType};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Wait for a condition to be true with timeout
///
/// Polls every 10ms; returns whether the condition became true in time.
pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }

    condition()
}

/// A small plant model built in code
#[derive(Debug, Clone, Default)]
pub struct PlantFixture {
    pub points: Vec<Point>,
    pub paths: Vec<Path>,
    pub location_types: Vec<LocationType>,
    pub locations: Vec<Location>,
}

impl PlantFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point(mut self, name: &str, point_type: PointType) -> Self {
        self.points.push(Point::new(name, point_type));
        self
    }

    /// Adds a directed path named `source--destination`
    pub fn path(mut self, source: &str, destination: &str, length: u64) -> Self {
        self.paths.push(Path {
            name: PathRef::new(format!("{source}--{destination}")),
            source: PointRef::new(source),
            destination: PointRef::new(destination),
            length,
            locked: false,
        });
        self
    }

    /// Adds paths in both directions
    pub fn bidirectional(self, a: &str, b: &str, length: u64) -> Self {
        self.path(a, b, length).path(b, a, length)
    }

    pub fn location_type(mut self, name: &str, operations: &[&str]) -> Self {
        self.location_types.push(LocationType {
            name: name.to_string(),
            allowed_operations: operations.iter().map(|op| op.to_string()).collect(),
        });
        self
    }

    pub fn location(mut self, name: &str, location_type: &str, links: &[&str]) -> Self {
        self.locations.push(Location {
            name: LocationRef::new(name),
            location_type: location_type.to_string(),
            links: links.iter().map(|p| PointRef::new(*p)).collect(),
            locked: false,
        });
        self
    }

    /// A line of halt points `A -- B -- C -- D`, one meter apart, with a
    /// park point `P` next to `A` and a charger linked to `D`
    pub fn line() -> Self {
        Self::new()
            .point("A", PointType::Halt)
            .point("B", PointType::Halt)
            .point("C", PointType::Halt)
            .point("D", PointType::Halt)
            .point("P", PointType::Park)
            .bidirectional("A", "B", 1000)
            .bidirectional("B", "C", 1000)
            .bidirectional("C", "D", 1000)
            .bidirectional("P", "A", 500)
            .location_type("Charger", &["CHARGE"])
            .location("Charger-01", "Charger", &["D"])
    }
}
