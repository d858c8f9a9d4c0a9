use std::sync::Arc;

use crate::error::InputError;
use crate::problem::{
    catalog::NodeCatalog,
    node::{Node, NodeIdx},
    travel_matrix::{CostOracle, Minutes},
    vehicle::{Vehicle, VehicleIdx},
    weights::CostWeights,
};

/// The immutable problem instance: node catalog, fleet, travel oracle and
/// cost weights. Shared read-only across searches; all mutable state lives
/// in `Solution`.
pub struct Problem {
    catalog: NodeCatalog,
    vehicles: Vec<Vehicle>,
    oracle: Arc<dyn CostOracle>,
    weights: CostWeights,
}

impl std::fmt::Debug for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Problem").finish_non_exhaustive()
    }
}

impl Problem {
    pub fn new(
        catalog: NodeCatalog,
        vehicles: Vec<Vehicle>,
        oracle: Arc<dyn CostOracle>,
        weights: CostWeights,
    ) -> Result<Self, InputError> {
        let problem = Problem {
            catalog,
            vehicles,
            oracle,
            weights,
        };
        problem.validate()?;
        Ok(problem)
    }

    fn validate(&self) -> Result<(), InputError> {
        for node in self.catalog.nodes() {
            if node.opens() > node.closes() {
                return Err(InputError::Inconsistency(format!(
                    "node {} has an inverted time window [{}, {}]",
                    node.external_id(),
                    node.opens(),
                    node.closes()
                )));
            }
            if node.is_container() && node.demand() <= 0.0 {
                return Err(InputError::Inconsistency(format!(
                    "container {} has non-positive demand {}",
                    node.external_id(),
                    node.demand()
                )));
            }
            if !node.is_container() && node.demand() != 0.0 {
                return Err(InputError::Inconsistency(format!(
                    "non-container {} has demand {}",
                    node.external_id(),
                    node.demand()
                )));
            }
        }

        for vehicle in &self.vehicles {
            if vehicle.capacity() <= 0.0 {
                return Err(InputError::Inconsistency(format!(
                    "vehicle {} has non-positive capacity {}",
                    vehicle.vid(),
                    vehicle.capacity()
                )));
            }
            if vehicle.max_trips() < 1 {
                return Err(InputError::Inconsistency(format!(
                    "vehicle {} allows no trips",
                    vehicle.vid()
                )));
            }
            if vehicle.shift_start() > vehicle.shift_end() {
                return Err(InputError::Inconsistency(format!(
                    "vehicle {} has an inverted shift [{}, {}]",
                    vehicle.vid(),
                    vehicle.shift_start(),
                    vehicle.shift_end()
                )));
            }

            for (idx, role) in [
                (vehicle.start_depot(), "start depot"),
                (vehicle.dump(), "dump"),
                (vehicle.end_depot(), "end depot"),
            ] {
                if idx.get() >= self.catalog.len() {
                    return Err(InputError::reference(
                        idx.get() as i64,
                        format!("vehicle {} {role}", vehicle.vid()),
                    ));
                }
            }

            if !self.catalog.get(vehicle.dump()).is_dump() {
                return Err(InputError::Inconsistency(format!(
                    "vehicle {} dump {} is not a dump node",
                    vehicle.vid(),
                    self.catalog.get(vehicle.dump()).external_id()
                )));
            }
        }

        Ok(())
    }

    pub fn catalog(&self) -> &NodeCatalog {
        &self.catalog
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        self.catalog.get(idx)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, idx: VehicleIdx) -> &Vehicle {
        &self.vehicles[idx]
    }

    pub fn num_containers(&self) -> usize {
        self.catalog.containers().len()
    }

    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    pub fn oracle(&self) -> &dyn CostOracle {
        self.oracle.as_ref()
    }

    #[inline]
    pub fn travel(&self, from: NodeIdx, to: NodeIdx) -> Minutes {
        self.oracle.travel(from, to)
    }

    /// Travel time from `from` to the nearest dump in the catalog.
    pub fn nearest_dump_distance(&self, from: NodeIdx) -> Minutes {
        self.catalog
            .dumps()
            .iter()
            .map(|&dump| self.travel(from, dump))
            .fold(f64::INFINITY, f64::min)
    }
}
