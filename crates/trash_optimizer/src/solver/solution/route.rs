use crate::define_index_newtype;
use crate::problem::{
    node::{NodeIdx, NodeKind},
    problem::Problem,
    travel_matrix::{Minutes, UNREACHABLE},
    vehicle::{Vehicle, VehicleIdx},
};

define_index_newtype!(RouteIdx, Route);

/// Cached evaluation record for one route position. Point values
/// (`arrival`, `departure`, `load`) describe the position itself; the
/// remaining fields are running totals from the route start, so route
/// level queries read only the last record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepState {
    pub arrival: Minutes,
    pub departure: Minutes,
    pub load: f64,

    pub travel: Minutes,
    pub lateness: Minutes,
    pub waiting: Minutes,
    pub overflow: f64,
    pub twv: u32,
    pub cv: u32,
    pub dumps: u32,
    pub missing: u32,
}

/// Result of a dry-run move evaluation. `delta_cost` is meaningful only
/// when `feasible_after` is true; infeasible outcomes report infinity.
/// `oracle_miss` flags rejections caused by a pair the oracle does not
/// cover, which the driver tracks for its stuck detection.
#[derive(Debug, Clone, Copy)]
pub struct DeltaEval {
    pub delta_cost: f64,
    pub feasible_after: bool,
    pub oracle_miss: bool,
}

impl DeltaEval {
    pub fn infeasible() -> DeltaEval {
        DeltaEval {
            delta_cost: f64::INFINITY,
            feasible_after: false,
            oracle_miss: false,
        }
    }

    pub fn missing() -> DeltaEval {
        DeltaEval {
            delta_cost: f64::INFINITY,
            feasible_after: false,
            oracle_miss: true,
        }
    }

    pub fn combine(self, other: DeltaEval) -> DeltaEval {
        DeltaEval {
            delta_cost: self.delta_cost + other.delta_cost,
            feasible_after: self.feasible_after && other.feasible_after,
            oracle_miss: self.oracle_miss || other.oracle_miss,
        }
    }
}

/// One vehicle's ordered visit sequence, always bracketed by the
/// vehicle's start and end depot. Interior positions hold containers and
/// dumps. The cached `state` vector is re-evaluated forward from the
/// first mutated index after every edit.
#[derive(Clone)]
pub struct Route {
    vehicle: VehicleIdx,
    sequence: Vec<NodeIdx>,
    state: Vec<StepState>,
}

impl Route {
    pub fn new(problem: &Problem, vehicle: VehicleIdx) -> Self {
        let v = problem.vehicle(vehicle);
        let mut route = Route {
            vehicle,
            sequence: vec![v.start_depot(), v.end_depot()],
            state: Vec::new(),
        };
        route.evaluate_from(problem, 0);
        route
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        // A route always carries its two depot brackets.
        self.sequence.len() <= 2
    }

    pub fn vehicle_idx(&self) -> VehicleIdx {
        self.vehicle
    }

    pub fn vehicle<'a>(&self, problem: &'a Problem) -> &'a Vehicle {
        problem.vehicle(self.vehicle)
    }

    pub fn sequence(&self) -> &[NodeIdx] {
        &self.sequence
    }

    pub fn node_at(&self, pos: usize) -> NodeIdx {
        self.sequence[pos]
    }

    pub fn step(&self, pos: usize) -> &StepState {
        &self.state[pos]
    }

    pub fn last_state(&self) -> &StepState {
        self.state.last().expect("route is never empty")
    }

    /// Interior positions holding containers, in route order.
    pub fn container_positions<'a>(
        &'a self,
        problem: &'a Problem,
    ) -> impl Iterator<Item = (usize, NodeIdx)> + 'a {
        self.sequence
            .iter()
            .enumerate()
            .skip(1)
            .take(self.sequence.len().saturating_sub(2))
            .filter(|&(_, &node)| problem.node(node).is_container())
            .map(|(pos, &node)| (pos, node))
    }

    pub fn num_containers(&self, problem: &Problem) -> usize {
        self.container_positions(problem).count()
    }

    pub fn dump_count(&self) -> u32 {
        self.last_state().dumps
    }

    // -- evaluation -------------------------------------------------------

    pub fn evaluate_from(&mut self, problem: &Problem, from: usize) {
        self.state.resize(self.sequence.len(), StepState::default());

        let vehicle = problem.vehicle(self.vehicle);
        for i in from..self.sequence.len() {
            self.state[i] = if i == 0 {
                start_state(problem, vehicle, self.sequence[0])
            } else {
                advance(
                    problem,
                    vehicle,
                    &self.state[i - 1],
                    self.sequence[i - 1],
                    self.sequence[i],
                )
            };
        }
    }

    pub fn feasible(&self, problem: &Problem) -> bool {
        state_feasible(self.last_state(), problem.vehicle(self.vehicle))
    }

    pub fn cost(&self, problem: &Problem) -> f64 {
        state_cost(self.last_state(), problem)
    }

    pub fn total_travel(&self) -> Minutes {
        self.last_state().travel
    }

    pub fn total_waiting(&self) -> Minutes {
        self.last_state().waiting
    }

    pub fn total_lateness(&self) -> Minutes {
        self.last_state().lateness
    }

    // -- edits ------------------------------------------------------------

    /// Inserts `node` before position `pos` (interior: `1..len`).
    pub fn insert(&mut self, problem: &Problem, pos: usize, node: NodeIdx) {
        debug_assert!(pos >= 1 && pos < self.sequence.len());
        self.sequence.insert(pos, node);
        self.evaluate_from(problem, pos);
    }

    pub fn insert_seq(&mut self, problem: &Problem, pos: usize, nodes: &[NodeIdx]) {
        debug_assert!(pos >= 1 && pos < self.sequence.len());
        self.sequence.splice(pos..pos, nodes.iter().copied());
        self.evaluate_from(problem, pos);
    }

    pub fn remove(&mut self, problem: &Problem, pos: usize) -> NodeIdx {
        debug_assert!(pos >= 1 && pos + 1 < self.sequence.len());
        let node = self.sequence.remove(pos);
        self.evaluate_from(problem, pos);
        node
    }

    pub fn replace(&mut self, problem: &Problem, pos: usize, node: NodeIdx) -> NodeIdx {
        debug_assert!(pos >= 1 && pos + 1 < self.sequence.len());
        let old = std::mem::replace(&mut self.sequence[pos], node);
        self.evaluate_from(problem, pos);
        old
    }

    pub fn swap(&mut self, problem: &Problem, i: usize, j: usize) {
        debug_assert!(i != j);
        self.sequence.swap(i, j);
        self.evaluate_from(problem, i.min(j));
    }

    /// Moves the node at `from` so that it ends up at the index `to`
    /// held before the removal.
    pub fn relocate(&mut self, problem: &Problem, from: usize, to: usize) {
        debug_assert!(from != to);
        let node = self.sequence.remove(from);
        let target = if to > from { to - 1 } else { to };
        self.sequence.insert(target, node);
        self.evaluate_from(problem, from.min(target));
    }

    /// Drops dump visits that close a trip with no pickups in it. Called
    /// outside the move machinery so dry-run deltas stay exact.
    pub fn strip_empty_trips(&mut self, problem: &Problem) {
        let mut changed = false;
        let mut i = 1;
        let mut trip_has_pickup = false;

        while i + 1 < self.sequence.len() {
            let node = problem.node(self.sequence[i]);
            if node.is_container() {
                trip_has_pickup = true;
                i += 1;
            } else if node.is_dump() {
                if trip_has_pickup {
                    trip_has_pickup = false;
                    i += 1;
                } else {
                    self.sequence.remove(i);
                    changed = true;
                }
            } else {
                i += 1;
            }
        }

        if changed {
            self.evaluate_from(problem, 0);
        }
    }

    // -- dry runs ---------------------------------------------------------

    pub fn delta_insert(&self, problem: &Problem, pos: usize, node: NodeIdx) -> DeltaEval {
        let tail = std::iter::once(node).chain(self.sequence[pos..].iter().copied());
        self.eval_tail(problem, pos, tail)
    }

    pub fn delta_insert_seq(&self, problem: &Problem, pos: usize, nodes: &[NodeIdx]) -> DeltaEval {
        let tail = nodes
            .iter()
            .copied()
            .chain(self.sequence[pos..].iter().copied());
        self.eval_tail(problem, pos, tail)
    }

    pub fn delta_remove(&self, problem: &Problem, pos: usize) -> DeltaEval {
        self.eval_tail(problem, pos, self.sequence[pos + 1..].iter().copied())
    }

    pub fn delta_replace(&self, problem: &Problem, pos: usize, node: NodeIdx) -> DeltaEval {
        let tail = std::iter::once(node).chain(self.sequence[pos + 1..].iter().copied());
        self.eval_tail(problem, pos, tail)
    }

    pub fn delta_swap(&self, problem: &Problem, i: usize, j: usize) -> DeltaEval {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        let tail = std::iter::once(self.sequence[j])
            .chain(self.sequence[i + 1..j].iter().copied())
            .chain(std::iter::once(self.sequence[i]))
            .chain(self.sequence[j + 1..].iter().copied());
        self.eval_tail(problem, i, tail)
    }

    pub fn delta_relocate(&self, problem: &Problem, from: usize, to: usize) -> DeltaEval {
        let mut reordered = self.sequence.clone();
        let node = reordered.remove(from);
        let target = if to > from { to - 1 } else { to };
        reordered.insert(target, node);

        let start = from.min(target);
        self.eval_tail(problem, start, reordered[start..].iter().copied())
    }

    /// Exchange of the containers at `(self, i)` and `(other, j)`,
    /// evaluated on both routes without mutating either.
    pub fn delta_swap_between(
        &self,
        problem: &Problem,
        i: usize,
        other: &Route,
        j: usize,
    ) -> DeltaEval {
        let mine = self.sequence[i];
        let theirs = other.sequence[j];
        self.delta_replace(problem, i, theirs)
            .combine(other.delta_replace(problem, j, mine))
    }

    /// Forward-simulates the route as `sequence[..from]` followed by
    /// `tail`, without touching the cache. Bails out as soon as a
    /// violation shows up, since every caller rejects infeasible moves.
    fn eval_tail<I>(&self, problem: &Problem, from: usize, tail: I) -> DeltaEval
    where
        I: Iterator<Item = NodeIdx>,
    {
        let vehicle = problem.vehicle(self.vehicle);

        let (mut state, mut prev_node) = if from == 0 {
            (None, None)
        } else {
            (Some(self.state[from - 1]), Some(self.sequence[from - 1]))
        };

        for node in tail {
            let next = match (&state, prev_node) {
                (Some(prev), Some(prev_node)) => advance(problem, vehicle, prev, prev_node, node),
                _ => start_state(problem, vehicle, node),
            };

            if next.missing > 0 {
                return DeltaEval::missing();
            }
            if next.twv > 0 || next.cv > 0 {
                return DeltaEval::infeasible();
            }

            state = Some(next);
            prev_node = Some(node);
        }

        let Some(final_state) = state else {
            return DeltaEval::infeasible();
        };

        if !state_feasible(&final_state, vehicle) {
            return DeltaEval::infeasible();
        }

        DeltaEval {
            delta_cost: state_cost(&final_state, problem) - self.cost(problem),
            feasible_after: true,
            oracle_miss: false,
        }
    }
}

fn start_state(problem: &Problem, vehicle: &Vehicle, start: NodeIdx) -> StepState {
    let node = problem.node(start);
    let arrival = vehicle.shift_start();
    let waiting = node.waiting_duration(arrival);
    let lateness = (arrival - node.closes()).max(0.0);

    StepState {
        arrival,
        departure: arrival.max(node.opens()) + node.service(),
        load: 0.0,
        travel: 0.0,
        lateness,
        waiting,
        overflow: 0.0,
        twv: if lateness > 0.0 { 1 } else { 0 },
        cv: 0,
        dumps: 0,
        missing: 0,
    }
}

fn advance(
    problem: &Problem,
    vehicle: &Vehicle,
    prev: &StepState,
    prev_node: NodeIdx,
    node_idx: NodeIdx,
) -> StepState {
    let node = problem.node(node_idx);
    let leg = problem.travel(prev_node, node_idx);

    let mut next = *prev;

    next.load = match node.kind() {
        NodeKind::Container => prev.load + node.demand(),
        NodeKind::Dump => 0.0,
        NodeKind::Depot => prev.load,
    };
    if node.is_dump() {
        next.dumps += 1;
    }

    let overflow = (next.load - vehicle.capacity()).max(0.0);
    if overflow > 0.0 {
        next.overflow += overflow;
        next.cv += 1;
    }

    if !leg.is_finite() || !prev.departure.is_finite() {
        if !leg.is_finite() {
            next.missing += 1;
        }
        next.arrival = UNREACHABLE;
        next.departure = UNREACHABLE;
        return next;
    }

    let arrival = prev.departure + leg;
    let waiting = node.waiting_duration(arrival);
    let lateness = (arrival - node.closes()).max(0.0);

    next.arrival = arrival;
    next.departure = arrival.max(node.opens()) + node.service();
    next.travel += leg;
    next.waiting += waiting;
    next.lateness += lateness;
    if lateness > 0.0 {
        next.twv += 1;
    }

    next
}

fn state_feasible(last: &StepState, vehicle: &Vehicle) -> bool {
    last.twv == 0
        && last.cv == 0
        && last.missing == 0
        && last.arrival <= vehicle.shift_end()
        && last.dumps as usize <= vehicle.max_trips()
        && last.load == 0.0
}

fn state_cost(last: &StepState, problem: &Problem) -> f64 {
    if last.missing > 0 {
        return f64::INFINITY;
    }

    let w = problem.weights();
    w.distance * last.travel
        + w.time_window * last.lateness
        + w.capacity * last.overflow
        + w.waiting * last.waiting
        + w.trips * f64::from(last.dumps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestInstance, approx_eq};

    // One depot at the origin, one dump at (10, 0), containers on the x
    // axis, one minute per coordinate unit.
    fn instance() -> TestInstance {
        TestInstance::line(&[2.0, 4.0, 6.0], 10.0, 1, 0.0, 1440.0)
    }

    #[test]
    fn test_empty_route_state() {
        let inst = instance();
        let route = Route::new(&inst.problem, VehicleIdx::new(0));

        assert_eq!(route.len(), 2);
        assert!(route.is_empty());
        assert!(route.feasible(&inst.problem));

        // Start depot -> end depot at the same location: no travel.
        let last = route.last_state();
        assert_eq!(last.travel, 0.0);
        assert_eq!(last.load, 0.0);
        assert_eq!(last.dumps, 0);
    }

    #[test]
    fn test_forward_evaluation() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));

        // depot -> c0(2) -> c1(4) -> dump(10) -> depot
        route.insert(&inst.problem, 1, inst.container(0));
        route.insert(&inst.problem, 2, inst.container(1));
        route.insert(&inst.problem, 3, inst.dump);

        assert_eq!(route.len(), 5);
        assert_eq!(route.num_containers(&inst.problem), 2);
        assert_eq!(route.dump_count(), 1);

        // service is zero in the line instance, so departures track
        // arrivals and travel is 2 + 2 + 6 + 10.
        let last = route.last_state();
        assert!(approx_eq(last.travel, 20.0));
        assert_eq!(last.load, 0.0);
        assert_eq!(last.twv, 0);
        assert_eq!(last.cv, 0);
        assert!(route.feasible(&inst.problem));

        // Load trace: 1.0 after each container, reset at the dump.
        assert!(approx_eq(route.step(1).load, 1.0));
        assert!(approx_eq(route.step(2).load, 2.0));
        assert_eq!(route.step(3).load, 0.0);
    }

    #[test]
    fn test_insert_remove_round_trip() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));
        route.insert(&inst.problem, 1, inst.container(0));
        route.insert(&inst.problem, 2, inst.dump);

        let sequence_before = route.sequence().to_vec();
        let state_before = route.state.clone();

        route.insert(&inst.problem, 2, inst.container(1));
        route.remove(&inst.problem, 2);

        assert_eq!(route.sequence(), &sequence_before[..]);
        assert_eq!(route.state, state_before);
    }

    #[test]
    fn test_swap_involution() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));
        route.insert(&inst.problem, 1, inst.container(0));
        route.insert(&inst.problem, 2, inst.container(1));
        route.insert(&inst.problem, 3, inst.container(2));
        route.insert(&inst.problem, 4, inst.dump);

        let sequence_before = route.sequence().to_vec();
        let state_before = route.state.clone();

        route.swap(&inst.problem, 1, 3);
        route.swap(&inst.problem, 1, 3);

        assert_eq!(route.sequence(), &sequence_before[..]);
        assert_eq!(route.state, state_before);
    }

    #[test]
    fn test_delta_insert_matches_applied_cost() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));
        route.insert(&inst.problem, 1, inst.container(0));
        route.insert(&inst.problem, 2, inst.dump);

        let before = route.cost(&inst.problem);
        let eval = route.delta_insert(&inst.problem, 2, inst.container(1));
        assert!(eval.feasible_after);

        route.insert(&inst.problem, 2, inst.container(1));
        let after = route.cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));
    }

    #[test]
    fn test_delta_remove_matches_applied_cost() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));
        route.insert(&inst.problem, 1, inst.container(0));
        route.insert(&inst.problem, 2, inst.container(1));
        route.insert(&inst.problem, 3, inst.dump);

        let before = route.cost(&inst.problem);
        let eval = route.delta_remove(&inst.problem, 2);
        assert!(eval.feasible_after);

        route.remove(&inst.problem, 2);
        let after = route.cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));
    }

    #[test]
    fn test_delta_swap_matches_applied_cost() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));
        route.insert(&inst.problem, 1, inst.container(2));
        route.insert(&inst.problem, 2, inst.container(0));
        route.insert(&inst.problem, 3, inst.container(1));
        route.insert(&inst.problem, 4, inst.dump);

        let before = route.cost(&inst.problem);
        let eval = route.delta_swap(&inst.problem, 1, 2);
        assert!(eval.feasible_after);

        route.swap(&inst.problem, 1, 2);
        let after = route.cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));
    }

    #[test]
    fn test_capacity_violation_detected() {
        let inst = TestInstance::line(&[2.0, 4.0], 10.0, 1, 0.0, 1440.0);
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));

        // Unit demands against capacity 5: six pickups in one trip push
        // the load to 6 before the dump.
        route.insert(&inst.problem, 1, inst.dump);
        for _ in 0..6 {
            route.insert(&inst.problem, 1, inst.container(0));
        }

        let last = route.last_state();
        assert_eq!(last.cv, 1);
        assert!(approx_eq(last.overflow, 1.0));
        assert!(!route.feasible(&inst.problem));

        // A dry run that would overload is rejected outright.
        let eval = route.delta_insert(&inst.problem, 1, inst.container(1));
        assert!(!eval.feasible_after);
    }

    #[test]
    fn test_container_without_closing_dump_is_infeasible() {
        let inst = instance();
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));

        route.insert(&inst.problem, 1, inst.container(0));
        assert!(!route.feasible(&inst.problem));

        route.insert(&inst.problem, 2, inst.dump);
        assert!(route.feasible(&inst.problem));
    }

    #[test]
    fn test_missing_arc_is_infeasible() {
        let inst = TestInstance::with_missing_arcs(&[2.0, 4.0], 10.0);
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));

        route.insert(&inst.problem, 1, inst.container(1));
        assert!(!route.feasible(&inst.problem));
        assert!(route.cost(&inst.problem).is_infinite());

        let eval = route.delta_insert(&inst.problem, 1, inst.container(1));
        assert!(!eval.feasible_after);
    }

    #[test]
    fn test_trip_limit() {
        let inst = TestInstance::line(&[2.0, 4.0], 10.0, 1, 0.0, 1440.0);
        let mut route = Route::new(&inst.problem, VehicleIdx::new(0));

        route.insert(&inst.problem, 1, inst.container(0));
        route.insert(&inst.problem, 2, inst.dump);
        route.insert(&inst.problem, 3, inst.container(1));
        route.insert(&inst.problem, 4, inst.dump);

        // max_trips is 1 in this instance; two dump visits break it.
        assert_eq!(route.dump_count(), 2);
        assert!(!route.feasible(&inst.problem));
    }
}
