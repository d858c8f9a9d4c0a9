use std::sync::Arc;

use fxhash::FxHashMap;

use crate::problem::{
    catalog::NodeCatalog,
    node::{Node, NodeIdx, NodeKind},
    problem::Problem,
    travel_matrix::TravelTimeMatrix,
    vehicle::Vehicle,
    weights::CostWeights,
};

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Small instances on a line or plane with Euclidean travel times, one
/// coordinate unit per minute. Node order: depot, dump, containers.
pub struct TestInstance {
    pub problem: Problem,
    pub dump: NodeIdx,
    pub containers: Vec<NodeIdx>,
}

impl TestInstance {
    pub fn container(&self, index: usize) -> NodeIdx {
        self.containers[index]
    }

    /// Unit-demand containers at the given x positions, capacity 5,
    /// always-open windows, zero service times.
    pub fn line(
        xs: &[f64],
        dump_x: f64,
        max_trips: usize,
        shift_start: f64,
        shift_end: f64,
    ) -> Self {
        let specs: Vec<ContainerSpec> = xs
            .iter()
            .map(|&x| ContainerSpec {
                x,
                y: 0.0,
                opens: 0.0,
                closes: 1440.0,
                service: 0.0,
                demand: 1.0,
            })
            .collect();

        Self::build(
            &specs,
            (dump_x, 0.0),
            &[VehicleSpec {
                capacity: 5.0,
                max_trips,
                shift_start,
                shift_end,
            }],
            None,
        )
    }

    /// Containers with explicit windows and demands at planar positions.
    pub fn with_containers(specs: &[ContainerSpec], dump_at: (f64, f64), fleet: &[VehicleSpec]) -> Self {
        Self::build(specs, dump_at, fleet, None)
    }

    /// A line instance whose matrix only covers the depot, the dump and
    /// the first container; every arc touching the others is missing.
    pub fn with_missing_arcs(xs: &[f64], dump_x: f64) -> Self {
        let specs: Vec<ContainerSpec> = xs
            .iter()
            .map(|&x| ContainerSpec {
                x,
                y: 0.0,
                opens: 0.0,
                closes: 1440.0,
                service: 0.0,
                demand: 1.0,
            })
            .collect();

        Self::build(
            &specs,
            (dump_x, 0.0),
            &[VehicleSpec {
                capacity: 5.0,
                max_trips: 1,
                shift_start: 0.0,
                shift_end: 1440.0,
            }],
            Some(3),
        )
    }

    fn build(
        specs: &[ContainerSpec],
        dump_at: (f64, f64),
        fleet: &[VehicleSpec],
        reachable_prefix: Option<usize>,
    ) -> Self {
        let mut nodes = vec![
            Node::new(100, 0.0, 0.0, 0.0, 1440.0, 0.0, 0.0, -1, NodeKind::Depot),
            Node::new(
                200, dump_at.0, dump_at.1, 0.0, 1440.0, 0.0, 0.0, -1,
                NodeKind::Dump,
            ),
        ];

        for (index, spec) in specs.iter().enumerate() {
            nodes.push(Node::new(
                index as i64 + 1,
                spec.x,
                spec.y,
                spec.opens,
                spec.closes,
                spec.service,
                spec.demand,
                -1,
                NodeKind::Container,
            ));
        }

        let catalog = NodeCatalog::new(nodes);
        let coordinates = catalog.coordinates();

        let oracle = match reachable_prefix {
            None => TravelTimeMatrix::from_coordinates(&coordinates),
            Some(prefix) => {
                let mut entries = FxHashMap::default();
                for i in 0..prefix {
                    for j in 0..prefix {
                        let (x1, y1) = coordinates[i];
                        let (x2, y2) = coordinates[j];
                        let minutes = ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt();
                        entries.insert((NodeIdx::new(i), NodeIdx::new(j)), minutes);
                    }
                }
                TravelTimeMatrix::from_entries(coordinates.len(), &entries)
            }
        };

        let depot = NodeIdx::new(0);
        let dump = NodeIdx::new(1);

        let vehicles = fleet
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                Vehicle::new(
                    index as i64 + 1,
                    depot,
                    dump,
                    depot,
                    spec.capacity,
                    spec.max_trips,
                    spec.shift_start,
                    spec.shift_end,
                )
            })
            .collect();

        let problem = Problem::new(catalog, vehicles, Arc::new(oracle), CostWeights::default())
            .expect("test instance must validate");

        TestInstance {
            containers: (0..specs.len()).map(|i| NodeIdx::new(2 + i)).collect(),
            problem,
            dump,
        }
    }
}

#[derive(Clone, Copy)]
pub struct ContainerSpec {
    pub x: f64,
    pub y: f64,
    pub opens: f64,
    pub closes: f64,
    pub service: f64,
    pub demand: f64,
}

impl ContainerSpec {
    pub fn at(x: f64, y: f64) -> Self {
        ContainerSpec {
            x,
            y,
            opens: 0.0,
            closes: 1440.0,
            service: 0.0,
            demand: 1.0,
        }
    }

    pub fn window(mut self, opens: f64, closes: f64) -> Self {
        self.opens = opens;
        self.closes = closes;
        self
    }

    pub fn demand(mut self, demand: f64) -> Self {
        self.demand = demand;
        self
    }
}

#[derive(Clone, Copy)]
pub struct VehicleSpec {
    pub capacity: f64,
    pub max_trips: usize,
    pub shift_start: f64,
    pub shift_end: f64,
}

impl VehicleSpec {
    pub fn capacity(capacity: f64) -> Self {
        VehicleSpec {
            capacity,
            max_trips: 4,
            shift_start: 0.0,
            shift_end: 1440.0,
        }
    }

    pub fn max_trips(mut self, max_trips: usize) -> Self {
        self.max_trips = max_trips;
        self
    }
}
