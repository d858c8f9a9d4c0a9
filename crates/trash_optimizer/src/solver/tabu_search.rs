use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use fxhash::FxHashMap;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::error::StopReason;
use crate::problem::{node::NodeIdx, problem::Problem};
use crate::solver::{
    ls::{
        generator::{Candidate, MoveGenerator},
        moves::{DumpPlacement, Move, MoveAttribute},
    },
    solution::{route::RouteIdx, solution::Solution},
    solver_params::SolverParams,
    tabu_list::TabuList,
};

/// Wall-clock and cancellation limits, checked once at the top of every
/// iteration so no partial move is ever committed.
pub struct SearchBudget<'a> {
    pub deadline: Option<Instant>,
    pub cancel: &'a AtomicBool,
}

impl SearchBudget<'_> {
    fn check(&self) -> Option<StopReason> {
        if self.cancel.load(AtomicOrdering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Some(StopReason::Timeout);
        }
        None
    }
}

pub struct TabuOutcome {
    pub best: Solution,
    pub stop: StopReason,
    pub iterations: u64,
}

/// Best-admissible tabu search over the three move families. The current
/// solution is always feasible; candidate evaluation filters infeasible
/// moves before selection, and a tabu candidate is only admitted when it
/// beats the best known cost (aspiration).
pub struct TabuSearch<'a> {
    problem: &'a Problem,
    params: &'a SolverParams,
}

impl<'a> TabuSearch<'a> {
    pub fn new(problem: &'a Problem, params: &'a SolverParams) -> Self {
        TabuSearch { problem, params }
    }

    pub fn run(
        &self,
        initial: Solution,
        budget: &SearchBudget<'_>,
        mut on_best: impl FnMut(&Solution, u64),
    ) -> TabuOutcome {
        let problem = self.problem;
        let n = problem.num_containers();
        let max_iterations = self.params.max_iterations_for(n);
        let patience = self.params.patience_for(n);
        let tenure = SolverParams::tabu_tenure_for(n);

        let generator = MoveGenerator::new(self.params.neighborhood_cap);
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let mut current = initial;
        let mut current_cost = current.total_cost(problem);
        let mut best = current.clone();
        let mut best_cost = current_cost;

        let mut tabu = TabuList::new(tenure);
        let mut move_counts: FxHashMap<NodeIdx, u64> = FxHashMap::default();

        let mut iteration: u64 = 0;
        let mut iterations_since_improvement: u64 = 0;
        let mut last_diversified: u64 = 0;

        let stop = loop {
            if let Some(reason) = budget.check() {
                break reason;
            }
            if iteration >= max_iterations {
                break StopReason::Iterations;
            }
            if iterations_since_improvement >= patience {
                break StopReason::Patience;
            }

            let neighborhood = generator.generate(problem, &current, &mut rng);
            if neighborhood.candidates.is_empty() {
                if neighborhood.evaluated > 0
                    && neighborhood.oracle_misses == neighborhood.evaluated
                {
                    break StopReason::Stuck;
                }
                break StopReason::Patience;
            }

            let mut chosen: Option<&Candidate> = None;
            for candidate in &neighborhood.candidates {
                let is_tabu = tabu.is_tabu(&candidate.attribute, iteration);
                // Emitted candidates are always feasible-after, so the
                // aspiration predicate reduces to beating the best cost.
                let aspiration = current_cost + candidate.delta_cost < best_cost;
                if is_tabu && !aspiration {
                    continue;
                }

                let replace = match chosen {
                    None => true,
                    Some(incumbent) => prefer(candidate, incumbent),
                };
                if replace {
                    chosen = Some(candidate);
                }
            }

            let Some(candidate) = chosen.copied() else {
                debug!(iteration, "no admissible candidate left");
                break StopReason::Patience;
            };

            candidate.mv.apply(problem, &mut current);
            tabu.insert(candidate.attribute, iteration);
            bump_move_counts(&mut move_counts, &candidate.attribute);
            iteration += 1;

            if iteration.is_multiple_of(64) {
                tabu.sweep(iteration);
            }

            current_cost = current.total_cost(problem);
            if current.is_feasible(problem) && current_cost < best_cost {
                best = current.clone();
                best_cost = current_cost;
                iterations_since_improvement = 0;
                on_best(&best, iteration);
            } else {
                iterations_since_improvement += 1;
            }

            if self.params.diversification
                && iterations_since_improvement > patience / 2
                && iteration - last_diversified >= tenure
                && self.diversify(&mut current, &mut tabu, &move_counts, iteration, &mut rng)
            {
                current_cost = current.total_cost(problem);
                last_diversified = iteration;
            }
        };

        debug!(
            iterations = iteration,
            best_cost,
            ?stop,
            tabu_entries = tabu.len(),
            "tabu search finished"
        );

        TabuOutcome {
            best,
            stop,
            iterations: iteration,
        }
    }

    /// Kicks the search by relocating the least-moved container into a
    /// random other route, accepting any feasible placement.
    fn diversify(
        &self,
        current: &mut Solution,
        tabu: &mut TabuList,
        move_counts: &FxHashMap<NodeIdx, u64>,
        iteration: u64,
        rng: &mut StdRng,
    ) -> bool {
        let problem = self.problem;
        if current.routes().len() < 2 {
            return false;
        }

        let mut pick: Option<(u64, NodeIdx, RouteIdx, usize)> = None;
        for (index, route) in current.routes().iter().enumerate() {
            for (pos, node) in route.container_positions(problem) {
                let count = move_counts.get(&node).copied().unwrap_or(0);
                if pick.is_none_or(|(best_count, best_node, _, _)| (count, node) < (best_count, best_node))
                {
                    pick = Some((count, node, RouteIdx::new(index), pos));
                }
            }
        }

        let Some((_, _, from, pos)) = pick else {
            return false;
        };

        for _ in 0..10 {
            let to = RouteIdx::new(rng.random_range(0..current.routes().len()));
            if to == from {
                continue;
            }
            let at = rng.random_range(1..current.route(to).len());

            for placement in [
                DumpPlacement::None,
                DumpPlacement::Before,
                DumpPlacement::After,
            ] {
                let mv = Move::Insert {
                    from,
                    pos,
                    to,
                    at,
                    dump: placement,
                };
                if mv.delta(problem, current).feasible_after {
                    let attribute = mv.attribute(current);
                    mv.apply(problem, current);
                    tabu.insert(attribute, iteration);
                    debug!(iteration, "diversification kick applied");
                    return true;
                }
            }
        }

        false
    }
}

/// Total selection order: lower delta wins, then inter-route moves, then
/// the lexicographically smallest attribute. The feasibility-restoring
/// tie-break is vacuous here: every emitted candidate keeps the solution
/// feasible, so candidates never differ on it.
fn prefer(a: &Candidate, b: &Candidate) -> bool {
    match a.delta_cost.total_cmp(&b.delta_cost) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }

    if a.inter_route != b.inter_route {
        return a.inter_route;
    }

    a.attribute < b.attribute
}

fn bump_move_counts(counts: &mut FxHashMap<NodeIdx, u64>, attribute: &MoveAttribute) {
    match *attribute {
        MoveAttribute::Pair(a, b) => {
            *counts.entry(a).or_insert(0) += 1;
            *counts.entry(b).or_insert(0) += 1;
        }
        MoveAttribute::Relocation(node, _) => {
            *counts.entry(node).or_insert(0) += 1;
        }
    }
}
