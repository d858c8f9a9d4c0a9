use serde::Serialize;

use crate::define_index_newtype;
use crate::problem::travel_matrix::Minutes;

define_index_newtype!(NodeIdx, Node);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Container,
    Dump,
    Depot,
}

/// An immutable location record. Coordinates are kept for matrix providers
/// and reporting; the solver itself only ever consults the travel oracle.
#[derive(Serialize, Debug, Clone)]
pub struct Node {
    external_id: i64,
    x: f64,
    y: f64,
    opens: Minutes,
    closes: Minutes,
    service: Minutes,
    demand: f64,
    street_id: i64,
    kind: NodeKind,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        external_id: i64,
        x: f64,
        y: f64,
        opens: Minutes,
        closes: Minutes,
        service: Minutes,
        demand: f64,
        street_id: i64,
        kind: NodeKind,
    ) -> Self {
        Node {
            external_id,
            x,
            y,
            opens,
            closes,
            service,
            demand,
            street_id,
            kind,
        }
    }

    pub fn external_id(&self) -> i64 {
        self.external_id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn opens(&self) -> Minutes {
        self.opens
    }

    pub fn closes(&self) -> Minutes {
        self.closes
    }

    pub fn service(&self) -> Minutes {
        self.service
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn street_id(&self) -> i64 {
        self.street_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    pub fn is_dump(&self) -> bool {
        self.kind == NodeKind::Dump
    }

    pub fn is_depot(&self) -> bool {
        self.kind == NodeKind::Depot
    }

    pub fn window_length(&self) -> Minutes {
        self.closes - self.opens
    }

    /// True when `arrival` misses the closing time.
    pub fn late_arrival(&self, arrival: Minutes) -> bool {
        arrival > self.closes
    }

    pub fn waiting_duration(&self, arrival: Minutes) -> Minutes {
        (self.opens - arrival).max(0.0)
    }
}
