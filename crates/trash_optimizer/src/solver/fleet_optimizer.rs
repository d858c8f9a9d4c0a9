use tracing::{debug, info};

use crate::problem::problem::Problem;
use crate::solver::construction::insertion::{apply_plan, best_insertion};
use crate::solver::solution::{
    route::{Route, RouteIdx},
    solution::Solution,
};

/// Post-search pass that tries to run the plan with fewer vehicles:
/// empty the smallest routes first, redistributing their containers via
/// cheapest feasible insertion. A removal only commits when every
/// container found a new feasible home, and the whole pass is discarded
/// when it costs more than the allowed slack.
pub struct FleetOptimizer<'a> {
    problem: &'a Problem,
    slack: f64,
}

impl<'a> FleetOptimizer<'a> {
    pub fn new(problem: &'a Problem, slack: f64) -> Self {
        FleetOptimizer { problem, slack }
    }

    pub fn optimize(&self, solution: Solution) -> Solution {
        let problem = self.problem;
        let pre_cost = solution.total_cost(problem);

        let mut work = solution.clone();
        work.strip_empty_trips(problem);

        loop {
            let mut order: Vec<(usize, RouteIdx)> = work
                .routes()
                .iter()
                .enumerate()
                .map(|(index, route)| (route.num_containers(problem), RouteIdx::new(index)))
                .filter(|&(count, _)| count > 0)
                .collect();
            order.sort();

            // Redistribution may land containers in a previously unused
            // vehicle; only commit when the fleet actually shrinks.
            let used = work.num_vehicles_used(problem);
            let removed = order.iter().find_map(|&(_, route_idx)| {
                self.try_remove_route(&work, route_idx)
                    .filter(|trial| trial.num_vehicles_used(problem) < used)
            });

            match removed {
                Some(reduced) => {
                    debug!(
                        vehicles = reduced.num_vehicles_used(problem),
                        "route emptied and redistributed"
                    );
                    work = reduced;
                }
                None => break,
            }
        }

        let post_cost = work.total_cost(problem);
        if post_cost <= pre_cost * (1.0 + self.slack) {
            info!(
                pre_cost,
                post_cost,
                vehicles = work.num_vehicles_used(problem),
                "fleet reduction accepted"
            );
            work
        } else {
            debug!(pre_cost, post_cost, "fleet reduction discarded");
            solution
        }
    }

    fn try_remove_route(&self, solution: &Solution, route_idx: RouteIdx) -> Option<Solution> {
        let problem = self.problem;
        let mut trial = solution.clone();

        let containers: Vec<_> = trial
            .route(route_idx)
            .container_positions(problem)
            .map(|(_, node)| node)
            .collect();

        let vehicle = trial.route(route_idx).vehicle_idx();
        *trial.route_mut(route_idx) = Route::new(problem, vehicle);

        for container in containers {
            let plan = best_insertion(problem, &trial, container, Some(route_idx))?;
            apply_plan(problem, &mut trial, &plan, container);
        }

        Some(trial)
    }
}
