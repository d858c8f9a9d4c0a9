use serde::Serialize;

use crate::define_index_newtype;
use crate::problem::{node::NodeIdx, travel_matrix::Minutes};

define_index_newtype!(VehicleIdx, Vehicle);

/// Immutable vehicle configuration. Every vehicle has a start depot, a
/// default dump for unloading, an end depot and a working shift window.
#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    vid: i64,
    start_depot: NodeIdx,
    dump: NodeIdx,
    end_depot: NodeIdx,
    capacity: f64,
    max_trips: usize,
    shift_start: Minutes,
    shift_end: Minutes,
}

impl Vehicle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vid: i64,
        start_depot: NodeIdx,
        dump: NodeIdx,
        end_depot: NodeIdx,
        capacity: f64,
        max_trips: usize,
        shift_start: Minutes,
        shift_end: Minutes,
    ) -> Self {
        Vehicle {
            vid,
            start_depot,
            dump,
            end_depot,
            capacity,
            max_trips,
            shift_start,
            shift_end,
        }
    }

    pub fn vid(&self) -> i64 {
        self.vid
    }

    pub fn start_depot(&self) -> NodeIdx {
        self.start_depot
    }

    pub fn dump(&self) -> NodeIdx {
        self.dump
    }

    pub fn end_depot(&self) -> NodeIdx {
        self.end_depot
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn max_trips(&self) -> usize {
        self.max_trips
    }

    pub fn shift_start(&self) -> Minutes {
        self.shift_start
    }

    pub fn shift_end(&self) -> Minutes {
        self.shift_end
    }

    pub fn shift_length(&self) -> Minutes {
        self.shift_end - self.shift_start
    }
}
