use smallvec::SmallVec;

use crate::problem::{node::NodeIdx, problem::Problem};
use crate::solver::solution::{
    route::{Route, RouteIdx},
    solution::Solution,
};

/// A feasible way to place one container into one route. `nodes` is what
/// actually gets spliced in: the container alone, or the container
/// bundled with a dump visit when the placement opens or closes a trip.
#[derive(Debug, Clone)]
pub struct InsertionPlan {
    pub route: RouteIdx,
    pub pos: usize,
    pub nodes: SmallVec<[NodeIdx; 2]>,
    pub delta_cost: f64,
}

pub fn apply_plan(
    problem: &Problem,
    solution: &mut Solution,
    plan: &InsertionPlan,
    container: NodeIdx,
) {
    solution
        .route_mut(plan.route)
        .insert_seq(problem, plan.pos, &plan.nodes);
    solution.mark_assigned(container);
}

/// Cheapest feasible placement of `container` across all routes except
/// `exclude`. Ties keep the earliest route and position.
pub fn best_insertion(
    problem: &Problem,
    solution: &Solution,
    container: NodeIdx,
    exclude: Option<RouteIdx>,
) -> Option<InsertionPlan> {
    let mut best: Option<InsertionPlan> = None;

    for (index, route) in solution.routes().iter().enumerate() {
        let route_idx = RouteIdx::new(index);
        if exclude == Some(route_idx) {
            continue;
        }

        plans_for_route(problem, route, route_idx, container, |plan| {
            if best
                .as_ref()
                .is_none_or(|incumbent| plan.delta_cost < incumbent.delta_cost)
            {
                best = Some(plan);
            }
        });
    }

    best
}

/// Best and second-best placements, for regret selection. The two plans
/// may sit in the same route.
pub fn best_two_insertions(
    problem: &Problem,
    solution: &Solution,
    container: NodeIdx,
) -> (Option<InsertionPlan>, Option<InsertionPlan>) {
    let mut best: Option<InsertionPlan> = None;
    let mut second: Option<InsertionPlan> = None;

    for (index, route) in solution.routes().iter().enumerate() {
        let route_idx = RouteIdx::new(index);
        plans_for_route(problem, route, route_idx, container, |plan| {
            if best
                .as_ref()
                .is_none_or(|incumbent| plan.delta_cost < incumbent.delta_cost)
            {
                second = best.take();
                best = Some(plan);
            } else if second
                .as_ref()
                .is_none_or(|incumbent| plan.delta_cost < incumbent.delta_cost)
            {
                second = Some(plan);
            }
        });
    }

    (best, second)
}

/// Cheapest feasible placement within a single route.
pub fn best_insertion_in_route(
    problem: &Problem,
    route: &Route,
    route_idx: RouteIdx,
    container: NodeIdx,
) -> Option<InsertionPlan> {
    let mut best: Option<InsertionPlan> = None;

    plans_for_route(problem, route, route_idx, container, |plan| {
        if best
            .as_ref()
            .is_none_or(|incumbent| plan.delta_cost < incumbent.delta_cost)
        {
            best = Some(plan);
        }
    });

    best
}

/// Enumerates feasible placements of `container` in `route`.
///
/// A route whose trips are all closed accepts a plain insertion anywhere
/// before its final dump; a route with no dump yet must take the dump in
/// the same edit, and a route with trip budget to spare may open a fresh
/// trip on either side of the insertion point.
fn plans_for_route(
    problem: &Problem,
    route: &Route,
    route_idx: RouteIdx,
    container: NodeIdx,
    mut consider: impl FnMut(InsertionPlan),
) {
    let vehicle = route.vehicle(problem);
    let dump = vehicle.dump();

    if route.dump_count() == 0 {
        for pos in 1..route.len() {
            let nodes = [container, dump];
            let eval = route.delta_insert_seq(problem, pos, &nodes);
            if eval.feasible_after {
                consider(InsertionPlan {
                    route: route_idx,
                    pos,
                    nodes: SmallVec::from_slice(&nodes),
                    delta_cost: eval.delta_cost,
                });
            }
        }
        return;
    }

    for pos in 1..route.len() {
        let eval = route.delta_insert(problem, pos, container);
        if eval.feasible_after {
            consider(InsertionPlan {
                route: route_idx,
                pos,
                nodes: SmallVec::from_slice(&[container]),
                delta_cost: eval.delta_cost,
            });
        }
    }

    if (route.dump_count() as usize) < vehicle.max_trips() {
        for pos in 1..route.len() {
            for nodes in [[dump, container], [container, dump]] {
                let eval = route.delta_insert_seq(problem, pos, &nodes);
                if eval.feasible_after {
                    consider(InsertionPlan {
                        route: route_idx,
                        pos,
                        nodes: SmallVec::from_slice(&nodes),
                        delta_cost: eval.delta_cost,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ContainerSpec, TestInstance, VehicleSpec, approx_eq};

    #[test]
    fn test_first_insertion_brings_its_dump() {
        let inst = TestInstance::line(&[2.0], 10.0, 1, 0.0, 1440.0);
        let mut solution = Solution::new(&inst.problem);

        let plan = best_insertion(&inst.problem, &solution, inst.container(0), None)
            .expect("container must fit");

        assert_eq!(plan.nodes.as_slice(), &[inst.container(0), inst.dump]);

        apply_plan(&inst.problem, &mut solution, &plan, inst.container(0));
        let route = solution.route(plan.route);

        assert_eq!(route.len(), 4);
        assert!(route.feasible(&inst.problem));
        assert!(solution.unassigned().is_empty());

        // depot -> c(2) -> dump(10) -> depot: 2 + 8 + 10 minutes.
        assert!(approx_eq(route.total_travel(), 20.0));
    }

    #[test]
    fn test_second_insertion_reuses_trip() {
        let inst = TestInstance::line(&[2.0, 4.0], 10.0, 1, 0.0, 1440.0);
        let mut solution = Solution::new(&inst.problem);

        for c in [inst.container(0), inst.container(1)] {
            let plan = best_insertion(&inst.problem, &solution, c, None).expect("fits");
            apply_plan(&inst.problem, &mut solution, &plan, c);
        }

        let route = solution.route(RouteIdx::new(0));
        assert_eq!(route.dump_count(), 1);
        assert_eq!(route.num_containers(&inst.problem), 2);
        assert!(route.feasible(&inst.problem));
    }

    #[test]
    fn test_capacity_opens_second_trip() {
        let inst = TestInstance::with_containers(
            &[
                ContainerSpec::at(1.0, 0.0).demand(3.0),
                ContainerSpec::at(2.0, 0.0).demand(3.0),
            ],
            (3.0, 0.0),
            &[VehicleSpec::capacity(5.0).max_trips(2)],
        );
        let mut solution = Solution::new(&inst.problem);

        for c in [inst.container(0), inst.container(1)] {
            let plan = best_insertion(&inst.problem, &solution, c, None).expect("fits");
            apply_plan(&inst.problem, &mut solution, &plan, c);
        }

        let route = solution.route(RouteIdx::new(0));
        assert_eq!(route.dump_count(), 2);
        assert!(route.feasible(&inst.problem));
    }

    #[test]
    fn test_trip_budget_exhausted() {
        let inst = TestInstance::with_containers(
            &[
                ContainerSpec::at(1.0, 0.0).demand(3.0),
                ContainerSpec::at(2.0, 0.0).demand(3.0),
            ],
            (3.0, 0.0),
            &[VehicleSpec::capacity(5.0).max_trips(1)],
        );
        let mut solution = Solution::new(&inst.problem);

        let plan = best_insertion(&inst.problem, &solution, inst.container(0), None).expect("fits");
        apply_plan(&inst.problem, &mut solution, &plan, inst.container(0));

        // The second container cannot share the trip (capacity) and the
        // vehicle has no trips left.
        assert!(best_insertion(&inst.problem, &solution, inst.container(1), None).is_none());
    }
}
