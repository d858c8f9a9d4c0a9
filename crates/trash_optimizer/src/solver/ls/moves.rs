use crate::problem::{node::NodeIdx, problem::Problem};
use crate::solver::solution::{
    route::{DeltaEval, RouteIdx},
    solution::Solution,
};

/// A candidate neighborhood move over a solution. Every variant supports
/// a dry-run `delta` and an in-place `apply` with identical semantics;
/// the tabu list keys on `attribute`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Move {
    /// Exchange two container positions within one route.
    IntraSwap {
        route: RouteIdx,
        first: usize,
        second: usize,
    },

    /// Exchange the containers at `(route_a, pos_a)` and `(route_b, pos_b)`.
    InterSwap {
        route_a: RouteIdx,
        pos_a: usize,
        route_b: RouteIdx,
        pos_b: usize,
    },

    /// Remove the container at `(from, pos)` and insert it before `at` in
    /// `to`, optionally bundling a dump visit of the target vehicle.
    Insert {
        from: RouteIdx,
        pos: usize,
        to: RouteIdx,
        at: usize,
        dump: DumpPlacement,
    },
}

/// How an insertion touches the target route's trip structure: close the
/// preceding trip with a dump first, or close the container's own trip
/// with a dump right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpPlacement {
    None,
    Before,
    After,
}

/// Tabu key of an applied move: the unordered container pair for swaps,
/// the (container, target vehicle) pair for insertions. The derived
/// `Ord` doubles as the final tie-break in move selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MoveAttribute {
    Pair(NodeIdx, NodeIdx),
    Relocation(NodeIdx, i64),
}

impl MoveAttribute {
    fn pair(a: NodeIdx, b: NodeIdx) -> Self {
        if a <= b {
            MoveAttribute::Pair(a, b)
        } else {
            MoveAttribute::Pair(b, a)
        }
    }
}

impl Move {
    pub fn is_inter_route(&self) -> bool {
        match self {
            Move::IntraSwap { .. } => false,
            Move::InterSwap { .. } => true,
            Move::Insert { from, to, .. } => from != to,
        }
    }

    pub fn attribute(&self, solution: &Solution) -> MoveAttribute {
        match *self {
            Move::IntraSwap {
                route,
                first,
                second,
            } => {
                let r = solution.route(route);
                MoveAttribute::pair(r.node_at(first), r.node_at(second))
            }
            Move::InterSwap {
                route_a,
                pos_a,
                route_b,
                pos_b,
            } => MoveAttribute::pair(
                solution.route(route_a).node_at(pos_a),
                solution.route(route_b).node_at(pos_b),
            ),
            Move::Insert { from, pos, to, .. } => MoveAttribute::Relocation(
                solution.route(from).node_at(pos),
                solution.route(to).vehicle_idx().get() as i64,
            ),
        }
    }

    /// Dry-run evaluation against the current solution; never mutates.
    pub fn delta(&self, problem: &Problem, solution: &Solution) -> DeltaEval {
        match *self {
            Move::IntraSwap {
                route,
                first,
                second,
            } => solution.route(route).delta_swap(problem, first, second),
            Move::InterSwap {
                route_a,
                pos_a,
                route_b,
                pos_b,
            } => solution.route(route_a).delta_swap_between(
                problem,
                pos_a,
                solution.route(route_b),
                pos_b,
            ),
            Move::Insert {
                from,
                pos,
                to,
                at,
                dump,
            } => {
                if from == to {
                    debug_assert!(dump == DumpPlacement::None);
                    solution.route(from).delta_relocate(problem, pos, at)
                } else {
                    let node = solution.route(from).node_at(pos);
                    let target = solution.route(to);
                    let insertion = match dump {
                        DumpPlacement::None => target.delta_insert(problem, at, node),
                        DumpPlacement::Before => {
                            let dump = target.vehicle(problem).dump();
                            target.delta_insert_seq(problem, at, &[dump, node])
                        }
                        DumpPlacement::After => {
                            let dump = target.vehicle(problem).dump();
                            target.delta_insert_seq(problem, at, &[node, dump])
                        }
                    };

                    solution
                        .route(from)
                        .delta_remove(problem, pos)
                        .combine(insertion)
                }
            }
        }
    }

    pub fn apply(&self, problem: &Problem, solution: &mut Solution) {
        match *self {
            Move::IntraSwap {
                route,
                first,
                second,
            } => solution.route_mut(route).swap(problem, first, second),
            Move::InterSwap {
                route_a,
                pos_a,
                route_b,
                pos_b,
            } => {
                let (a, b) = solution.route_pair_mut(route_a, route_b);
                let node_a = a.node_at(pos_a);
                let node_b = b.node_at(pos_b);
                a.replace(problem, pos_a, node_b);
                b.replace(problem, pos_b, node_a);
            }
            Move::Insert {
                from,
                pos,
                to,
                at,
                dump,
            } => {
                if from == to {
                    solution.route_mut(from).relocate(problem, pos, at);
                } else {
                    let (source, target) = solution.route_pair_mut(from, to);
                    let node = source.remove(problem, pos);
                    match dump {
                        DumpPlacement::None => target.insert(problem, at, node),
                        DumpPlacement::Before => {
                            let dump = target.vehicle(problem).dump();
                            target.insert_seq(problem, at, &[dump, node]);
                        }
                        DumpPlacement::After => {
                            let dump = target.vehicle(problem).dump();
                            target.insert_seq(problem, at, &[node, dump]);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ContainerSpec, TestInstance, VehicleSpec, approx_eq};

    fn two_route_instance() -> (TestInstance, Solution) {
        let inst = TestInstance::with_containers(
            &[
                ContainerSpec::at(1.0, 0.0),
                ContainerSpec::at(2.0, 0.0),
                ContainerSpec::at(3.0, 0.0),
                ContainerSpec::at(4.0, 0.0),
            ],
            (5.0, 0.0),
            &[VehicleSpec::capacity(10.0), VehicleSpec::capacity(10.0)],
        );

        let mut solution = Solution::new(&inst.problem);
        for (route, containers) in [(0usize, [0usize, 1]), (1, [2, 3])] {
            let idx = RouteIdx::new(route);
            for (offset, &c) in containers.iter().enumerate() {
                solution
                    .route_mut(idx)
                    .insert(&inst.problem, 1 + offset, inst.container(c));
                solution.mark_assigned(inst.container(c));
            }
            let len = solution.route(idx).len();
            solution
                .route_mut(idx)
                .insert(&inst.problem, len - 1, inst.dump);
        }

        (inst, solution)
    }

    #[test]
    fn test_intra_swap_delta_matches_apply() {
        let (inst, mut solution) = two_route_instance();
        let mv = Move::IntraSwap {
            route: RouteIdx::new(0),
            first: 1,
            second: 2,
        };

        let before = solution.total_cost(&inst.problem);
        let eval = mv.delta(&inst.problem, &solution);
        assert!(eval.feasible_after);

        mv.apply(&inst.problem, &mut solution);
        let after = solution.total_cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));
        assert!(solution.is_feasible(&inst.problem));
    }

    #[test]
    fn test_inter_swap_delta_matches_apply() {
        let (inst, mut solution) = two_route_instance();
        let mv = Move::InterSwap {
            route_a: RouteIdx::new(0),
            pos_a: 1,
            route_b: RouteIdx::new(1),
            pos_b: 2,
        };

        let before = solution.total_cost(&inst.problem);
        let eval = mv.delta(&inst.problem, &solution);
        assert!(eval.feasible_after);

        mv.apply(&inst.problem, &mut solution);
        let after = solution.total_cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));

        // The containers actually changed routes.
        assert_eq!(
            solution.route(RouteIdx::new(0)).node_at(1),
            inst.container(3)
        );
        assert_eq!(
            solution.route(RouteIdx::new(1)).node_at(2),
            inst.container(0)
        );
    }

    #[test]
    fn test_insert_delta_matches_apply() {
        let (inst, mut solution) = two_route_instance();
        let mv = Move::Insert {
            from: RouteIdx::new(0),
            pos: 2,
            to: RouteIdx::new(1),
            at: 1,
            dump: DumpPlacement::None,
        };

        let before = solution.total_cost(&inst.problem);
        let eval = mv.delta(&inst.problem, &solution);
        assert!(eval.feasible_after);

        mv.apply(&inst.problem, &mut solution);
        let after = solution.total_cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));
        assert_eq!(solution.route(RouteIdx::new(0)).num_containers(&inst.problem), 1);
        assert_eq!(solution.route(RouteIdx::new(1)).num_containers(&inst.problem), 3);
    }

    #[test]
    fn test_same_route_insert_is_relocate() {
        let (inst, mut solution) = two_route_instance();
        let mv = Move::Insert {
            from: RouteIdx::new(0),
            pos: 1,
            to: RouteIdx::new(0),
            at: 3,
            dump: DumpPlacement::None,
        };

        let before = solution.total_cost(&inst.problem);
        let eval = mv.delta(&inst.problem, &solution);
        assert!(eval.feasible_after);

        mv.apply(&inst.problem, &mut solution);
        let after = solution.total_cost(&inst.problem);

        assert!(approx_eq(before + eval.delta_cost, after));
        assert_eq!(
            solution.route(RouteIdx::new(0)).node_at(2),
            inst.container(0)
        );
    }

    #[test]
    fn test_insert_with_trailing_dump_opens_empty_route() {
        let inst = TestInstance::with_containers(
            &[ContainerSpec::at(1.0, 0.0), ContainerSpec::at(2.0, 0.0)],
            (3.0, 0.0),
            &[VehicleSpec::capacity(10.0), VehicleSpec::capacity(10.0)],
        );

        let mut solution = Solution::new(&inst.problem);
        let r0 = RouteIdx::new(0);
        solution.route_mut(r0).insert(&inst.problem, 1, inst.container(0));
        solution.route_mut(r0).insert(&inst.problem, 2, inst.container(1));
        solution.route_mut(r0).insert(&inst.problem, 3, inst.dump);
        solution.mark_assigned(inst.container(0));
        solution.mark_assigned(inst.container(1));

        // A plain insertion into the empty route leaves the container
        // with no dump to unload at; bundling one after it works.
        let plain = Move::Insert {
            from: r0,
            pos: 1,
            to: RouteIdx::new(1),
            at: 1,
            dump: DumpPlacement::None,
        };
        assert!(!plain.delta(&inst.problem, &solution).feasible_after);

        let bundled = Move::Insert {
            from: r0,
            pos: 1,
            to: RouteIdx::new(1),
            at: 1,
            dump: DumpPlacement::After,
        };
        let eval = bundled.delta(&inst.problem, &solution);
        assert!(eval.feasible_after);

        let before = solution.total_cost(&inst.problem);
        bundled.apply(&inst.problem, &mut solution);

        assert!(approx_eq(
            before + eval.delta_cost,
            solution.total_cost(&inst.problem)
        ));
        assert!(solution.is_feasible(&inst.problem));
        assert_eq!(solution.route(RouteIdx::new(1)).dump_count(), 1);
    }

    #[test]
    fn test_attribute_is_order_insensitive() {
        let (_inst, solution) = two_route_instance();

        let forward = Move::InterSwap {
            route_a: RouteIdx::new(0),
            pos_a: 1,
            route_b: RouteIdx::new(1),
            pos_b: 1,
        };
        let backward = Move::InterSwap {
            route_a: RouteIdx::new(1),
            pos_a: 1,
            route_b: RouteIdx::new(0),
            pos_b: 1,
        };

        assert_eq!(forward.attribute(&solution), backward.attribute(&solution));
    }
}
