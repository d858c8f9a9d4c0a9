use std::fmt::Write;

use crate::problem::{node::NodeKind, problem::Problem};
use crate::solver::solution::solution::Solution;

/// Human-readable plan: per used vehicle the visit sequence with times
/// and the load trace, then the fleet summary line.
pub fn text_report(problem: &Problem, solution: &Solution) -> String {
    let mut out = String::new();

    for route in solution.routes() {
        if route.num_containers(problem) == 0 {
            continue;
        }

        let vehicle = route.vehicle(problem);
        let ids: Vec<String> = route
            .sequence()
            .iter()
            .map(|&idx| problem.node(idx).external_id().to_string())
            .collect();
        writeln!(out, "vehicle {}: {}", vehicle.vid(), ids.join(" -> ")).unwrap();
        writeln!(
            out,
            "  {:>4} {:>10} {:>10} {:>10} {:>10} {:>8}",
            "seq", "node", "kind", "arrival", "departure", "load"
        )
        .unwrap();

        for (pos, &idx) in route.sequence().iter().enumerate() {
            let node = problem.node(idx);
            let step = route.step(pos);
            writeln!(
                out,
                "  {:>4} {:>10} {:>10} {:>10.1} {:>10.1} {:>8.2}",
                pos,
                node.external_id(),
                kind_name(node.kind()),
                step.arrival,
                step.departure,
                step.load,
            )
            .unwrap();
        }

        writeln!(
            out,
            "  travel {:.1} min, waiting {:.1} min, trips {}",
            route.total_travel(),
            route.total_waiting(),
            route.dump_count(),
        )
        .unwrap();
    }

    if !solution.unassigned().is_empty() {
        let ids: Vec<String> = solution
            .unassigned()
            .iter()
            .map(|&idx| problem.node(idx).external_id().to_string())
            .collect();
        writeln!(out, "unassigned: {}", ids.join(" ")).unwrap();
    }

    writeln!(
        out,
        "total cost {:.3}, vehicles used {}, unassigned {}",
        solution.total_cost(problem),
        solution.num_vehicles_used(problem),
        solution.unassigned().len(),
    )
    .unwrap();

    out
}

/// Machine mode: one `vid seq_index node_id arrival departure load`
/// record per visit of every used vehicle.
pub fn machine_report(problem: &Problem, solution: &Solution) -> String {
    let mut out = String::new();

    for route in solution.routes() {
        if route.num_containers(problem) == 0 {
            continue;
        }

        let vid = route.vehicle(problem).vid();
        for (pos, &idx) in route.sequence().iter().enumerate() {
            let step = route.step(pos);
            writeln!(
                out,
                "{} {} {} {:.3} {:.3} {:.3}",
                vid,
                pos,
                problem.node(idx).external_id(),
                step.arrival,
                step.departure,
                step.load,
            )
            .unwrap();
        }
    }

    out
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Container => "container",
        NodeKind::Dump => "dump",
        NodeKind::Depot => "depot",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::solution::route::RouteIdx;
    use crate::test_utils::TestInstance;

    fn assigned_instance() -> (TestInstance, Solution) {
        let inst = TestInstance::line(&[2.0, 4.0], 10.0, 1, 0.0, 1440.0);
        let mut solution = Solution::new(&inst.problem);

        let idx = RouteIdx::new(0);
        solution.route_mut(idx).insert(&inst.problem, 1, inst.container(0));
        solution.mark_assigned(inst.container(0));
        solution.route_mut(idx).insert(&inst.problem, 2, inst.dump);

        (inst, solution)
    }

    #[test]
    fn test_text_report_shape() {
        let (inst, solution) = assigned_instance();
        let report = text_report(&inst.problem, &solution);

        assert!(report.contains("vehicle 1: 100 -> 1 -> 200 -> 100"));
        assert!(report.contains("unassigned: 2"));
        assert!(report.contains("vehicles used 1, unassigned 1"));
    }

    #[test]
    fn test_machine_report_records() {
        let (inst, solution) = assigned_instance();
        let report = machine_report(&inst.problem, &solution);

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("1 0 100 "));
        assert!(lines[1].starts_with("1 1 1 "));
        assert!(lines[2].starts_with("1 2 200 "));

        for line in lines {
            assert_eq!(line.split_whitespace().count(), 6);
        }
    }
}
