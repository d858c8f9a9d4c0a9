use std::sync::Arc;

use trash_optimizer::problem::{
    catalog::NodeCatalog,
    node::{Node, NodeIdx, NodeKind},
    problem::Problem,
    travel_matrix::TravelTimeMatrix,
    vehicle::Vehicle,
    weights::CostWeights,
};

/// A container description for scenario instances: position, window,
/// service and demand.
#[derive(Clone, Copy)]
pub struct Container {
    pub x: f64,
    pub y: f64,
    pub opens: f64,
    pub closes: f64,
    pub service: f64,
    pub demand: f64,
}

impl Container {
    pub fn at(x: f64, y: f64) -> Self {
        Container {
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
pub struct Truck {
    pub capacity: f64,
    pub max_trips: usize,
    pub shift_start: f64,
    pub shift_end: f64,
}

impl Truck {
    pub fn capacity(capacity: f64) -> Self {
        Truck {
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

    pub fn shift(mut self, start: f64, end: f64) -> Self {
        self.shift_start = start;
        self.shift_end = end;
        self
    }
}

pub struct Scenario {
    pub problem: Arc<Problem>,
    pub depot: NodeIdx,
    pub dump: NodeIdx,
    pub containers: Vec<NodeIdx>,
}

impl Scenario {
    pub fn container(&self, index: usize) -> NodeIdx {
        self.containers[index]
    }
}

/// Builds a planar instance with Euclidean travel times (one coordinate
/// unit per minute). Node order: depot at `depot_at`, dump at `dump_at`,
/// then the containers.
pub fn scenario(containers: &[Container], dump_at: (f64, f64), fleet: &[Truck]) -> Scenario {
    let mut nodes = vec![
        Node::new(100, 0.0, 0.0, 0.0, 1440.0, 0.0, 0.0, -1, NodeKind::Depot),
        Node::new(
            200, dump_at.0, dump_at.1, 0.0, 1440.0, 0.0, 0.0, -1,
            NodeKind::Dump,
        ),
    ];

    for (index, c) in containers.iter().enumerate() {
        nodes.push(Node::new(
            index as i64 + 1,
            c.x,
            c.y,
            c.opens,
            c.closes,
            c.service,
            c.demand,
            -1,
            NodeKind::Container,
        ));
    }

    let catalog = NodeCatalog::new(nodes);
    let matrix = TravelTimeMatrix::from_coordinates(&catalog.coordinates());

    let depot = NodeIdx::new(0);
    let dump = NodeIdx::new(1);

    let vehicles = fleet
        .iter()
        .enumerate()
        .map(|(index, truck)| {
            Vehicle::new(
                index as i64 + 1,
                depot,
                dump,
                depot,
                truck.capacity,
                truck.max_trips,
                truck.shift_start,
                truck.shift_end,
            )
        })
        .collect();

    let problem = Problem::new(catalog, vehicles, Arc::new(matrix), CostWeights::default())
        .expect("scenario must validate");

    Scenario {
        containers: (0..containers.len()).map(|i| NodeIdx::new(2 + i)).collect(),
        problem: Arc::new(problem),
        depot,
        dump,
    }
}
