use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use fleet_core::{
    models::{DestinationTarget, DriveOrder, Path, Point, PointRef, Route, Step, TransportOrder, Vehicle},
    PlantModelService, Router,
};
use tracing::debug;

/// 基于场地模型的最短路径路由
///
/// 以路径长度为代价在未锁定的路径上执行 Dijkstra 搜索。每次请求都读取当前的
/// 场地模型，因此锁定或解锁路径后立即生效。目的地为位置时，在其链接点中取代价最小者。
pub struct ShortestPathRouter {
    plant: Arc<dyn PlantModelService>,
}

/// 一次请求内使用的邻接表
struct Graph {
    edges: HashMap<PointRef, Vec<Path>>,
}

impl Graph {
    fn from_paths(paths: Vec<Path>) -> Self {
        let mut edges: HashMap<PointRef, Vec<Path>> = HashMap::new();
        for path in paths.into_iter().filter(|p| !p.locked) {
            edges.entry(path.source.clone()).or_default().push(path);
        }
        Self { edges }
    }

    /// 单源最短路径；`from == to` 时返回原地步骤
    fn shortest_route(&self, from: &PointRef, to: &PointRef) -> Option<Route> {
        if from == to {
            let step = Step {
                path: None,
                source_point: None,
                destination_point: to.clone(),
            };
            return Some(Route::new(vec![step], 0));
        }

        let mut dist: HashMap<&PointRef, u64> = HashMap::new();
        let mut prev: HashMap<&PointRef, &Path> = HashMap::new();
        // 次级键为点名，保证代价相同时结果确定
        let mut heap = BinaryHeap::new();

        dist.insert(from, 0);
        heap.push(Reverse((0u64, from)));

        while let Some(Reverse((cost, point))) = heap.pop() {
            if point == to {
                return Some(Self::reconstruct(&prev, to, cost));
            }

            if dist.get(point).is_some_and(|best| cost > *best) {
                continue;
            }

            for path in self.edges.get(point).into_iter().flatten() {
                let next_cost = cost.saturating_add(path.length);
                let improved = dist
                    .get(&path.destination)
                    .map_or(true, |best| next_cost < *best);
                if improved {
                    dist.insert(&path.destination, next_cost);
                    prev.insert(&path.destination, path);
                    heap.push(Reverse((next_cost, &path.destination)));
                }
            }
        }

        None
    }

    fn reconstruct(prev: &HashMap<&PointRef, &Path>, to: &PointRef, costs: u64) -> Route {
        let mut steps = Vec::new();
        let mut current = to;
        while let Some(path) = prev.get(current) {
            steps.push(Step {
                path: Some(path.name.clone()),
                source_point: Some(path.source.clone()),
                destination_point: path.destination.clone(),
            });
            current = &path.source;
        }
        steps.reverse();
        Route::new(steps, costs)
    }
}

impl ShortestPathRouter {
    pub fn new(plant: Arc<dyn PlantModelService>) -> Self {
        Self { plant }
    }

    fn graph(&self) -> Graph {
        Graph::from_paths(self.plant.fetch_paths())
    }

    /// 目的地可以到达的点；位置被锁定或点不存在时为空
    fn destination_points(&self, target: &DestinationTarget) -> Vec<PointRef> {
        match target {
            DestinationTarget::Point(point) => self
                .plant
                .fetch_point(point)
                .map(|p| vec![p.name])
                .unwrap_or_default(),
            DestinationTarget::Location(location) => self
                .plant
                .fetch_location(location)
                .filter(|l| !l.locked)
                .map(|l| l.links)
                .unwrap_or_default(),
        }
    }

    fn best_route(&self, graph: &Graph, from: &PointRef, candidates: &[PointRef]) -> Option<Route> {
        candidates
            .iter()
            .filter_map(|to| graph.shortest_route(from, to))
            .min_by_key(|route| route.costs)
    }
}

impl Router for ShortestPathRouter {
    fn get_route(
        &self,
        vehicle: &Vehicle,
        source: &Point,
        order: &TransportOrder,
    ) -> Option<Vec<DriveOrder>> {
        let graph = self.graph();
        let mut current = source.name.clone();
        let mut routed = Vec::with_capacity(order.drive_orders.len());

        for drive_order in &order.drive_orders {
            let candidates = self.destination_points(&drive_order.destination.target);
            let Some(route) = self.best_route(&graph, &current, &candidates) else {
                debug!(
                    "车辆 {} 无法从 {} 到达 {}",
                    vehicle.name, current, drive_order.destination
                );
                return None;
            };

            if let Some(point) = route.final_destination_point() {
                current = point.clone();
            }
            routed.push(drive_order.clone().with_route(route));
        }

        Some(routed)
    }

    fn get_costs(&self, _vehicle: &Vehicle, source: &PointRef, destination: &PointRef) -> Option<u64> {
        self.graph()
            .shortest_route(source, destination)
            .map(|route| route.costs)
    }

    fn check_routability(&self, order: &TransportOrder) -> bool {
        let graph = self.graph();
        let targets: Vec<Vec<PointRef>> = order
            .drive_orders
            .iter()
            .map(|d| self.destination_points(&d.destination.target))
            .collect();

        if targets.iter().any(Vec::is_empty) {
            return false;
        }

        targets.windows(2).all(|pair| {
            pair[0].iter().any(|from| {
                pair[1]
                    .iter()
                    .any(|to| graph.shortest_route(from, to).is_some())
            })
        })
    }
}
