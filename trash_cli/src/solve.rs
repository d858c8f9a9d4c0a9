use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Context;
use indicatif::ProgressBar;
use tracing::{info, warn};
use trash_optimizer::error::{InputError, StopReason};
use trash_optimizer::parsers::files;
use trash_optimizer::problem::{
    catalog::NodeCatalog,
    problem::Problem,
    travel_matrix::{CostOracle, TravelTimeMatrix},
    weights::CostWeights,
};
use trash_optimizer::report::{machine_report, text_report};
use trash_optimizer::solver::{solver::Solver, solver_params::SolverParams};
use trash_osrm::{OsrmMatrixClient, OsrmMatrixClientParams};

use crate::Cli;

struct LonLat {
    lon: f64,
    lat: f64,
}

impl From<&LonLat> for geo_types::Point {
    fn from(p: &LonLat) -> Self {
        geo_types::Point::new(p.lon, p.lat)
    }
}

pub async fn run(args: Cli) -> anyhow::Result<i32> {
    let problem = match load(&args).await? {
        Ok(problem) => Arc::new(problem),
        Err(error) => {
            tracing::error!("{error}");
            return Ok(2);
        }
    };

    let params = SolverParams {
        seed: args.seed,
        time_budget: Some(args.timeout),
        ..SolverParams::default()
    };

    let mut solver = Solver::new(Arc::clone(&problem), params);

    let cancel = solver.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, returning best solution so far");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let progress = ProgressBar::new_spinner();
    progress.set_message("running...");
    {
        let progress = progress.clone();
        let problem = Arc::clone(&problem);
        solver.on_best_solution(move |best, iteration| {
            progress.set_message(format!(
                "iteration {iteration}: cost {:.1}, vehicles {}, unassigned {}",
                best.total_cost(&problem),
                best.num_vehicles_used(&problem),
                best.unassigned().len(),
            ));
        });
    }

    let report = solver.solve();
    let solution = &report.solution;
    progress.finish_with_message(format!(
        "finished: cost = {:.1}, vehicles = {}, unassigned = {}",
        solution.total_cost(&problem),
        solution.num_vehicles_used(&problem),
        solution.unassigned().len(),
    ));

    let output = if args.machine {
        machine_report(&problem, solution)
    } else {
        text_report(&problem, solution)
    };
    print!("{output}");

    let sol_path = args
        .out
        .clone()
        .unwrap_or_else(|| format!("{}.sol.txt", args.base.display()).into());
    std::fs::write(&sol_path, &output)
        .with_context(|| format!("failed to write {}", sol_path.display()))?;
    info!(path = %sol_path.display(), "solution written");

    if report.stop == StopReason::Stuck {
        warn!("search stopped: travel times missing for every candidate move");
    }

    let total = problem.num_containers();
    let unassigned = solution.unassigned().len();

    let code = if total > 0 && unassigned == total {
        3
    } else if report.stop == StopReason::Timeout && !solution.is_feasible(&problem) {
        4
    } else {
        0
    };

    Ok(code)
}

/// Parses the instance and builds the problem. `Err` on the inner level
/// is a validation failure (exit code 2); the outer level is an
/// operational failure such as an unreachable routing backend.
async fn load(args: &Cli) -> anyhow::Result<Result<Problem, InputError>> {
    let data = match files::load_instance(&args.base) {
        Ok(data) => data,
        Err(error) => return Ok(Err(error)),
    };

    let (catalog, vehicles) = match files::assemble(&data) {
        Ok(parts) => parts,
        Err(error) => return Ok(Err(error)),
    };

    let oracle: Arc<dyn CostOracle> = match std::env::var("OSRM_BASE_URL") {
        Ok(url) => Arc::new(fetch_osrm_matrix(&url, &catalog).await?),
        Err(_) => match &data.matrix {
            Some(records) => Arc::new(files::matrix_from_records(&catalog, records)),
            None => {
                return Ok(Err(InputError::Inconsistency(format!(
                    "missing travel time matrix {}.dmatrix-time.txt and OSRM_BASE_URL is not set",
                    args.base.display()
                ))));
            }
        },
    };

    Ok(Problem::new(
        catalog,
        vehicles,
        oracle,
        CostWeights::default(),
    ))
}

async fn fetch_osrm_matrix(url: &str, catalog: &NodeCatalog) -> anyhow::Result<TravelTimeMatrix> {
    let points: Vec<LonLat> = catalog
        .coordinates()
        .iter()
        .map(|&(x, y)| LonLat { lon: x, lat: y })
        .collect();

    info!(nodes = points.len(), "fetching travel times from OSRM");
    let client = OsrmMatrixClient::new(OsrmMatrixClientParams {
        osrm_url: url.to_owned(),
    });
    let durations = client
        .fetch_durations(&points)
        .await
        .context("OSRM table request failed")?;

    let mut matrix = TravelTimeMatrix::new(catalog.len());
    for (i, row) in durations.iter().enumerate() {
        for (j, &seconds) in row.iter().enumerate() {
            if let Some(seconds) = seconds {
                matrix.set(i.into(), j.into(), seconds / 60.0);
            }
        }
    }

    Ok(matrix)
}
