use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use jiff::SignedDuration;
use tracing::info;

use crate::error::StopReason;
use crate::problem::problem::Problem;
use crate::solver::{
    construction::builder::{Strategy, TruckManyVisitsDump},
    fleet_optimizer::FleetOptimizer,
    solution::solution::Solution,
    solver_params::SolverParams,
    tabu_search::{SearchBudget, TabuSearch},
};

pub struct SolveReport {
    pub solution: Solution,
    pub stop: StopReason,
    pub iterations: u64,
    pub strategy: Strategy,
    pub elapsed: SignedDuration,
}

type BestCallback = Box<dyn FnMut(&Solution, u64) + Send>;

/// Full pipeline: constructive builder, tabu search, fleet reduction.
/// The solver owns the cancellation flag; clones of it can be flipped
/// from other threads and are honored at iteration boundaries.
pub struct Solver {
    problem: Arc<Problem>,
    params: SolverParams,
    cancel: Arc<AtomicBool>,
    on_best: Vec<BestCallback>,
}

impl Solver {
    pub fn new(problem: Arc<Problem>, params: SolverParams) -> Self {
        Solver {
            problem,
            params,
            cancel: Arc::new(AtomicBool::new(false)),
            on_best: Vec::new(),
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn on_best_solution<F>(&mut self, callback: F)
    where
        F: FnMut(&Solution, u64) + Send + 'static,
    {
        self.on_best.push(Box::new(callback));
    }

    pub fn solve(&mut self) -> SolveReport {
        let started = Instant::now();
        let deadline = self
            .params
            .time_budget
            .map(|budget| started + Duration::from_secs_f64(budget.as_secs_f64().max(0.0)));

        let problem = self.problem.as_ref();

        let builder = TruckManyVisitsDump::new(problem, self.params.seed);
        let (initial, strategy) = builder.build();

        for callback in &mut self.on_best {
            callback(&initial, 0);
        }

        let budget = SearchBudget {
            deadline,
            cancel: &self.cancel,
        };

        let search = TabuSearch::new(problem, &self.params);
        let callbacks = &mut self.on_best;
        let outcome = search.run(initial, &budget, |best, iteration| {
            for callback in callbacks.iter_mut() {
                callback(best, iteration);
            }
        });

        let mut best = outcome.best;
        if matches!(outcome.stop, StopReason::Timeout | StopReason::Cancelled) {
            info!(stop = ?outcome.stop, "skipping fleet reduction");
        } else {
            best = FleetOptimizer::new(problem, self.params.fleet_reduction_slack).optimize(best);
        }
        best.strip_empty_trips(problem);

        let elapsed = SignedDuration::try_from(started.elapsed()).unwrap_or(SignedDuration::ZERO);
        info!(
            cost = best.total_cost(problem),
            vehicles = best.num_vehicles_used(problem),
            unassigned = best.unassigned().len(),
            iterations = outcome.iterations,
            ?elapsed,
            "solve finished"
        );

        SolveReport {
            solution: best,
            stop: outcome.stop,
            iterations: outcome.iterations,
            strategy,
            elapsed,
        }
    }
}
