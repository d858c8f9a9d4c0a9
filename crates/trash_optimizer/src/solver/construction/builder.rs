use std::cmp::Ordering;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info};

use crate::problem::{node::NodeIdx, problem::Problem};
use crate::solver::construction::insertion::{
    InsertionPlan, apply_plan, best_insertion, best_insertion_in_route, best_two_insertions,
};
use crate::solver::solution::{route::RouteIdx, solution::Solution};

/// Container selection rule for one constructive run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    EarliestClosing,
    LargestDemand,
    FarthestFromDump,
    NearestNeighbor,
    RandomOrder,
    AngularSweep,
    RegretInsertion,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::EarliestClosing,
        Strategy::LargestDemand,
        Strategy::FarthestFromDump,
        Strategy::NearestNeighbor,
        Strategy::RandomOrder,
        Strategy::AngularSweep,
        Strategy::RegretInsertion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::EarliestClosing => "earliest-closing",
            Strategy::LargestDemand => "largest-demand",
            Strategy::FarthestFromDump => "farthest-from-dump",
            Strategy::NearestNeighbor => "nearest-neighbor",
            Strategy::RandomOrder => "random-order",
            Strategy::AngularSweep => "angular-sweep",
            Strategy::RegretInsertion => "regret-insertion",
        }
    }
}

/// Multi-strategy constructive builder. Each strategy fills the fleet by
/// cheapest feasible insertion under its own container ordering; the
/// cheapest result wins, ties broken by fewer vehicles, then fewer
/// unassigned containers.
pub struct TruckManyVisitsDump<'a> {
    problem: &'a Problem,
    seed: u64,
}

impl<'a> TruckManyVisitsDump<'a> {
    pub fn new(problem: &'a Problem, seed: u64) -> Self {
        TruckManyVisitsDump { problem, seed }
    }

    pub fn build(&self) -> (Solution, Strategy) {
        let results: Vec<(Strategy, Solution)> = Strategy::ALL
            .par_iter()
            .map(|&strategy| (strategy, self.run_strategy(strategy)))
            .collect();

        let problem = self.problem;
        let mut winner: Option<(Strategy, Solution)> = None;

        for (strategy, solution) in results {
            let cost = solution.total_cost(problem);
            debug!(
                strategy = strategy.name(),
                cost,
                vehicles = solution.num_vehicles_used(problem),
                unassigned = solution.unassigned().len(),
                "constructive strategy finished"
            );

            let replace = match &winner {
                None => true,
                Some((_, incumbent)) => {
                    let key = |s: &Solution| {
                        (s.num_vehicles_used(problem), s.unassigned().len())
                    };
                    match cost.total_cmp(&incumbent.total_cost(problem)) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => key(&solution) < key(incumbent),
                    }
                }
            };

            if replace {
                winner = Some((strategy, solution));
            }
        }

        let (strategy, solution) = winner.expect("at least one strategy always runs");
        info!(
            strategy = strategy.name(),
            cost = solution.total_cost(problem),
            vehicles = solution.num_vehicles_used(problem),
            unassigned = solution.unassigned().len(),
            "initial solution built"
        );

        (solution, strategy)
    }

    pub fn run_strategy(&self, strategy: Strategy) -> Solution {
        match strategy {
            Strategy::EarliestClosing => {
                self.run_ordered(self.ordered_by(|node| self.problem.node(node).closes()))
            }
            Strategy::LargestDemand => {
                self.run_ordered(self.ordered_by(|node| -self.problem.node(node).demand()))
            }
            Strategy::FarthestFromDump => {
                self.run_ordered(self.ordered_by(|node| -self.problem.nearest_dump_distance(node)))
            }
            Strategy::NearestNeighbor => self.run_nearest_neighbor(),
            Strategy::RandomOrder => {
                let mut order = self.problem.catalog().containers().to_vec();
                let mut rng = StdRng::seed_from_u64(self.seed);
                order.shuffle(&mut rng);
                self.run_ordered(order)
            }
            Strategy::AngularSweep => self.run_ordered(self.angular_order()),
            Strategy::RegretInsertion => self.run_regret(),
        }
    }

    fn ordered_by(&self, key: impl Fn(NodeIdx) -> f64) -> Vec<NodeIdx> {
        let mut order = self.problem.catalog().containers().to_vec();
        order.sort_by(|&a, &b| key(a).total_cmp(&key(b)).then(a.cmp(&b)));
        order
    }

    fn angular_order(&self) -> Vec<NodeIdx> {
        let containers = self.problem.catalog().containers();
        if containers.is_empty() {
            return Vec::new();
        }

        let (mut cx, mut cy) = (0.0, 0.0);
        for &c in containers {
            let node = self.problem.node(c);
            cx += node.x();
            cy += node.y();
        }
        cx /= containers.len() as f64;
        cy /= containers.len() as f64;

        self.ordered_by(|idx| {
            let node = self.problem.node(idx);
            (node.y() - cy).atan2(node.x() - cx)
        })
    }

    /// Shared skeleton for the ordering strategies: sweep the pool in
    /// order, inserting each container at its cheapest feasible position;
    /// repeat until a full pass makes no progress.
    fn run_ordered(&self, order: Vec<NodeIdx>) -> Solution {
        let mut solution = Solution::new(self.problem);
        let mut pool = order;

        while !pool.is_empty() {
            let mut remaining = Vec::with_capacity(pool.len());
            let mut progress = false;

            for &container in &pool {
                match best_insertion(self.problem, &solution, container, None) {
                    Some(plan) => {
                        apply_plan(self.problem, &mut solution, &plan, container);
                        progress = true;
                    }
                    None => remaining.push(container),
                }
            }

            if !progress {
                break;
            }
            pool = remaining;
        }

        solution
    }

    /// Fills one vehicle at a time, always extending with the container
    /// nearest to the route's last stop.
    fn run_nearest_neighbor(&self) -> Solution {
        let problem = self.problem;
        let mut solution = Solution::new(problem);
        let mut pool = problem.catalog().containers().to_vec();

        for index in 0..solution.routes().len() {
            let route_idx = RouteIdx::new(index);

            while !pool.is_empty() {
                let route = solution.route(route_idx);
                let anchor = route
                    .container_positions(problem)
                    .last()
                    .map(|(_, node)| node)
                    .unwrap_or_else(|| route.node_at(0));

                let mut ranked: Vec<(f64, NodeIdx)> = pool
                    .iter()
                    .map(|&c| (problem.travel(anchor, c), c))
                    .collect();
                ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

                let mut inserted = None;
                for &(_, container) in &ranked {
                    if let Some(plan) =
                        best_insertion_in_route(problem, solution.route(route_idx), route_idx, container)
                    {
                        apply_plan(problem, &mut solution, &plan, container);
                        inserted = Some(container);
                        break;
                    }
                }

                match inserted {
                    Some(container) => pool.retain(|&c| c != container),
                    None => break,
                }
            }
        }

        solution
    }

    /// Regret construction: always place the container whose second-best
    /// placement is most expensive relative to its best.
    fn run_regret(&self) -> Solution {
        let problem = self.problem;
        let mut solution = Solution::new(problem);
        let mut pool = problem.catalog().containers().to_vec();

        loop {
            let mut pick: Option<(f64, f64, NodeIdx, InsertionPlan)> = None;

            for &container in &pool {
                let (best, second) = best_two_insertions(problem, &solution, container);
                let Some(best_plan) = best else { continue };

                let regret = second
                    .map_or(f64::INFINITY, |plan| plan.delta_cost - best_plan.delta_cost);

                let replace = match &pick {
                    None => true,
                    Some((incumbent_regret, incumbent_delta, incumbent_node, _)) => {
                        match regret.total_cmp(incumbent_regret) {
                            Ordering::Greater => true,
                            Ordering::Less => false,
                            Ordering::Equal => {
                                match best_plan.delta_cost.total_cmp(incumbent_delta) {
                                    Ordering::Less => true,
                                    Ordering::Greater => false,
                                    Ordering::Equal => container < *incumbent_node,
                                }
                            }
                        }
                    }
                };

                if replace {
                    pick = Some((regret, best_plan.delta_cost, container, best_plan));
                }
            }

            match pick {
                Some((_, _, container, plan)) => {
                    apply_plan(problem, &mut solution, &plan, container);
                    pool.retain(|&c| c != container);
                }
                None => break,
            }
        }

        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ContainerSpec, TestInstance, VehicleSpec};

    #[test]
    fn test_all_strategies_stay_feasible() {
        let inst = TestInstance::with_containers(
            &[
                ContainerSpec::at(1.0, 1.0),
                ContainerSpec::at(2.0, -1.0),
                ContainerSpec::at(3.0, 2.0),
                ContainerSpec::at(4.0, 0.5),
                ContainerSpec::at(5.0, -2.0),
            ],
            (6.0, 0.0),
            &[VehicleSpec::capacity(3.0), VehicleSpec::capacity(3.0)],
        );

        let builder = TruckManyVisitsDump::new(&inst.problem, 42);
        for strategy in Strategy::ALL {
            let solution = builder.run_strategy(strategy);
            assert!(
                solution.is_feasible(&inst.problem),
                "strategy {} built an infeasible solution",
                strategy.name()
            );
            assert!(
                solution.unassigned().is_empty(),
                "strategy {} left containers behind",
                strategy.name()
            );
        }
    }

    #[test]
    fn test_build_keeps_cheapest_strategy() {
        let inst = TestInstance::line(&[1.0, 2.0, 3.0], 5.0, 2, 0.0, 1440.0);
        let builder = TruckManyVisitsDump::new(&inst.problem, 42);

        let (solution, strategy) = builder.build();

        let chosen_cost = solution.total_cost(&inst.problem);
        for other in Strategy::ALL {
            let candidate = builder.run_strategy(other);
            assert!(
                chosen_cost <= candidate.total_cost(&inst.problem) + 1e-9,
                "strategy {} beat the chosen {}",
                other.name(),
                strategy.name()
            );
        }
    }

    #[test]
    fn test_oversized_container_left_unassigned() {
        let inst = TestInstance::with_containers(
            &[
                ContainerSpec::at(1.0, 0.0).demand(9.0),
                ContainerSpec::at(2.0, 0.0),
            ],
            (3.0, 0.0),
            &[VehicleSpec::capacity(5.0)],
        );

        let builder = TruckManyVisitsDump::new(&inst.problem, 42);
        let (solution, _) = builder.build();

        assert_eq!(solution.unassigned().len(), 1);
        assert!(solution.unassigned().contains(&inst.container(0)));
        assert!(solution.is_feasible(&inst.problem));
    }

    #[test]
    fn test_unreachable_window_left_unassigned() {
        // The container closes before any vehicle can reach it.
        let inst = TestInstance::with_containers(
            &[ContainerSpec::at(30.0, 0.0).window(0.0, 10.0)],
            (3.0, 0.0),
            &[VehicleSpec::capacity(5.0)],
        );

        let builder = TruckManyVisitsDump::new(&inst.problem, 42);
        let (solution, _) = builder.build();

        assert_eq!(solution.unassigned().len(), 1);
    }
}
