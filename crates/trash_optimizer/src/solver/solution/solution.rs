use std::collections::BTreeSet;

use crate::problem::{node::NodeIdx, problem::Problem, vehicle::VehicleIdx};
use crate::solver::solution::route::{Route, RouteIdx};

/// One candidate assignment of containers to vehicle routes. Owns its
/// routes exclusively; cloning yields a fully independent solution, which
/// is how best-known tracking works.
#[derive(Clone)]
pub struct Solution {
    routes: Vec<Route>,
    unassigned: BTreeSet<NodeIdx>,
}

impl Solution {
    /// Fresh solution: one empty route per vehicle, every container
    /// unassigned.
    pub fn new(problem: &Problem) -> Self {
        let routes = (0..problem.vehicles().len())
            .map(|index| Route::new(problem, VehicleIdx::new(index)))
            .collect();

        Solution {
            routes,
            unassigned: problem.catalog().containers().iter().copied().collect(),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, idx: RouteIdx) -> &Route {
        &self.routes[idx]
    }

    pub fn route_mut(&mut self, idx: RouteIdx) -> &mut Route {
        &mut self.routes[idx]
    }

    pub fn route_pair_mut(&mut self, a: RouteIdx, b: RouteIdx) -> (&mut Route, &mut Route) {
        debug_assert!(a != b);
        if a.get() < b.get() {
            let (head, tail) = self.routes.split_at_mut(b.get());
            (&mut head[a.get()], &mut tail[0])
        } else {
            let (head, tail) = self.routes.split_at_mut(a.get());
            (&mut tail[0], &mut head[b.get()])
        }
    }

    pub fn unassigned(&self) -> &BTreeSet<NodeIdx> {
        &self.unassigned
    }

    pub fn mark_assigned(&mut self, node: NodeIdx) {
        self.unassigned.remove(&node);
    }

    pub fn mark_unassigned(&mut self, node: NodeIdx) {
        self.unassigned.insert(node);
    }

    /// Routes that serve at least one container.
    pub fn num_vehicles_used(&self, problem: &Problem) -> usize {
        self.routes
            .iter()
            .filter(|route| route.num_containers(problem) > 0)
            .count()
    }

    pub fn total_cost(&self, problem: &Problem) -> f64 {
        let route_cost: f64 = self.routes.iter().map(|route| route.cost(problem)).sum();
        route_cost + problem.weights().unassigned * self.unassigned.len() as f64
    }

    pub fn is_feasible(&self, problem: &Problem) -> bool {
        self.routes.iter().all(|route| route.feasible(problem))
    }

    /// Locates an assigned container by scanning the routes.
    pub fn find_container(&self, node: NodeIdx) -> Option<(RouteIdx, usize)> {
        for (index, route) in self.routes.iter().enumerate() {
            if let Some(pos) = route.sequence().iter().position(|&n| n == node) {
                return Some((RouteIdx::new(index), pos));
            }
        }
        None
    }

    pub fn strip_empty_trips(&mut self, problem: &Problem) {
        for route in &mut self.routes {
            route.strip_empty_trips(problem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestInstance, approx_eq};

    #[test]
    fn test_fresh_solution() {
        let inst = TestInstance::line(&[1.0, 2.0, 3.0], 10.0, 2, 0.0, 1440.0);
        let solution = Solution::new(&inst.problem);

        assert_eq!(solution.routes().len(), 1);
        assert_eq!(solution.unassigned().len(), 3);
        assert_eq!(solution.num_vehicles_used(&inst.problem), 0);
        assert!(solution.is_feasible(&inst.problem));

        // Cost is dominated by the unassigned penalty.
        let expected = inst.problem.weights().unassigned * 3.0;
        assert!(approx_eq(
            solution.total_cost(&inst.problem) - expected,
            solution
                .routes()
                .iter()
                .map(|r| r.cost(&inst.problem))
                .sum::<f64>()
        ));
    }

    #[test]
    fn test_find_container() {
        let inst = TestInstance::line(&[1.0, 2.0], 10.0, 2, 0.0, 1440.0);
        let mut solution = Solution::new(&inst.problem);

        let c0 = inst.container(0);
        solution
            .route_mut(RouteIdx::new(0))
            .insert(&inst.problem, 1, c0);
        solution.mark_assigned(c0);

        assert_eq!(solution.find_container(c0), Some((RouteIdx::new(0), 1)));
        assert_eq!(solution.find_container(inst.container(1)), None);
        assert_eq!(solution.unassigned().len(), 1);
    }
}
