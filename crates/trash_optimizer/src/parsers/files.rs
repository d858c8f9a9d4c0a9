use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::error::InputError;
use crate::problem::{
    catalog::NodeCatalog,
    node::{Node, NodeIdx, NodeKind},
    problem::Problem,
    travel_matrix::TravelTimeMatrix,
    vehicle::Vehicle,
    weights::CostWeights,
};

/// `<base>.containers.txt`: `id x y opens closes service demand street_id`.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub opens: f64,
    pub closes: f64,
    pub service: f64,
    pub demand: f64,
    pub street_id: i64,
}

/// `<base>.otherlocs.txt`: `id x y opens closes`. Whether a location is a
/// dump or a depot is decided by how the vehicles reference it.
#[derive(Debug, Clone)]
pub struct OtherLocRecord {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub opens: f64,
    pub closes: f64,
}

/// `<base>.vehicles.txt`:
/// `vid start_id dump_id end_id capacity max_trips shift_start shift_end`.
#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub vid: i64,
    pub start_id: i64,
    pub dump_id: i64,
    pub end_id: i64,
    pub capacity: f64,
    pub max_trips: usize,
    pub shift_start: f64,
    pub shift_end: f64,
}

/// `<base>.dmatrix-time.txt`: `from_id to_id minutes`.
#[derive(Debug, Clone, Copy)]
pub struct MatrixRecord {
    pub from: i64,
    pub to: i64,
    pub minutes: f64,
}

pub struct InstanceData {
    pub containers: Vec<ContainerRecord>,
    pub other_locs: Vec<OtherLocRecord>,
    pub vehicles: Vec<VehicleRecord>,
    pub matrix: Option<Vec<MatrixRecord>>,
}

/// Reads the instance files next to `base`. The time matrix file is
/// optional so an external routing backend can take its place.
pub fn load_instance(base: &Path) -> Result<InstanceData, InputError> {
    let containers_path = with_suffix(base, "containers.txt");
    let other_locs_path = with_suffix(base, "otherlocs.txt");
    let vehicles_path = with_suffix(base, "vehicles.txt");
    let matrix_path = with_suffix(base, "dmatrix-time.txt");

    let containers = parse_containers(&read(&containers_path)?, &containers_path)?;
    let other_locs = parse_other_locs(&read(&other_locs_path)?, &other_locs_path)?;
    let vehicles = parse_vehicles(&read(&vehicles_path)?, &vehicles_path)?;

    let matrix = if Path::new(&matrix_path).exists() {
        Some(parse_matrix(&read(&matrix_path)?, &matrix_path)?)
    } else {
        None
    };

    Ok(InstanceData {
        containers,
        other_locs,
        vehicles,
        matrix,
    })
}

/// Convenience entry point for the file-matrix case.
pub fn load_problem(base: &Path) -> Result<Problem, InputError> {
    let data = load_instance(base)?;

    let Some(matrix_records) = &data.matrix else {
        return Err(InputError::Inconsistency(format!(
            "missing travel time matrix {} and no routing backend configured",
            with_suffix(base, "dmatrix-time.txt")
        )));
    };

    let (catalog, vehicles) = assemble(&data)?;
    let matrix = matrix_from_records(&catalog, matrix_records);

    Problem::new(catalog, vehicles, Arc::new(matrix), CostWeights::default())
}

pub fn parse_containers(text: &str, file: &str) -> Result<Vec<ContainerRecord>, InputError> {
    parse_records(text, file, 7, |fields, line| {
        Ok(ContainerRecord {
            id: parse_field(fields[0], file, line, "id")?,
            x: parse_field(fields[1], file, line, "x")?,
            y: parse_field(fields[2], file, line, "y")?,
            opens: parse_field(fields[3], file, line, "opens")?,
            closes: parse_field(fields[4], file, line, "closes")?,
            service: parse_field(fields[5], file, line, "service")?,
            demand: parse_field(fields[6], file, line, "demand")?,
            street_id: match fields.get(7) {
                Some(field) => parse_field(field, file, line, "street_id")?,
                None => -1,
            },
        })
    })
}

pub fn parse_other_locs(text: &str, file: &str) -> Result<Vec<OtherLocRecord>, InputError> {
    parse_records(text, file, 3, |fields, line| {
        Ok(OtherLocRecord {
            id: parse_field(fields[0], file, line, "id")?,
            x: parse_field(fields[1], file, line, "x")?,
            y: parse_field(fields[2], file, line, "y")?,
            opens: match fields.get(3) {
                Some(field) => parse_field(field, file, line, "opens")?,
                None => 0.0,
            },
            closes: match fields.get(4) {
                Some(field) => parse_field(field, file, line, "closes")?,
                None => f64::INFINITY,
            },
        })
    })
}

pub fn parse_vehicles(text: &str, file: &str) -> Result<Vec<VehicleRecord>, InputError> {
    parse_records(text, file, 5, |fields, line| {
        Ok(VehicleRecord {
            vid: parse_field(fields[0], file, line, "vid")?,
            start_id: parse_field(fields[1], file, line, "start_id")?,
            dump_id: parse_field(fields[2], file, line, "dump_id")?,
            end_id: parse_field(fields[3], file, line, "end_id")?,
            capacity: parse_field(fields[4], file, line, "capacity")?,
            max_trips: match fields.get(5) {
                Some(field) => parse_field(field, file, line, "max_trips")?,
                None => 1,
            },
            shift_start: match fields.get(6) {
                Some(field) => parse_field(field, file, line, "shift_start")?,
                None => 0.0,
            },
            shift_end: match fields.get(7) {
                Some(field) => parse_field(field, file, line, "shift_end")?,
                None => f64::INFINITY,
            },
        })
    })
}

pub fn parse_matrix(text: &str, file: &str) -> Result<Vec<MatrixRecord>, InputError> {
    parse_records(text, file, 3, |fields, line| {
        Ok(MatrixRecord {
            from: parse_field(fields[0], file, line, "from_id")?,
            to: parse_field(fields[1], file, line, "to_id")?,
            minutes: parse_field(fields[2], file, line, "cost")?,
        })
    })
}

/// Builds the node catalog and fleet from the raw records. Vehicle
/// references decide node roles: an id used as `dump_id` becomes a dump,
/// an id used as `start_id`/`end_id` becomes a depot, and an id used as
/// both yields one record per role.
pub fn assemble(data: &InstanceData) -> Result<(NodeCatalog, Vec<Vehicle>), InputError> {
    let mut dump_ids = FxHashSet::default();
    let mut depot_ids = FxHashSet::default();
    for vehicle in &data.vehicles {
        dump_ids.insert(vehicle.dump_id);
        depot_ids.insert(vehicle.start_id);
        depot_ids.insert(vehicle.end_id);
    }

    let mut nodes = Vec::new();
    let mut seen = FxHashSet::default();

    for record in &data.containers {
        if !seen.insert(record.id) {
            return Err(InputError::Inconsistency(format!(
                "duplicate node id {}",
                record.id
            )));
        }
        nodes.push(Node::new(
            record.id,
            record.x,
            record.y,
            record.opens,
            record.closes,
            record.service,
            record.demand,
            record.street_id,
            NodeKind::Container,
        ));
    }

    for record in &data.other_locs {
        if !seen.insert(record.id) {
            return Err(InputError::Inconsistency(format!(
                "duplicate node id {}",
                record.id
            )));
        }

        let mut referenced = false;
        for kind in [NodeKind::Depot, NodeKind::Dump] {
            let wanted = match kind {
                NodeKind::Depot => depot_ids.contains(&record.id),
                NodeKind::Dump => dump_ids.contains(&record.id),
                NodeKind::Container => false,
            };
            if wanted {
                referenced = true;
                nodes.push(Node::new(
                    record.id,
                    record.x,
                    record.y,
                    record.opens,
                    record.closes,
                    0.0,
                    0.0,
                    -1,
                    kind,
                ));
            }
        }

        if !referenced {
            warn!(id = record.id, "location not referenced by any vehicle, ignoring");
        }
    }

    let catalog = NodeCatalog::new(nodes);
    let index = catalog.external_index();

    let mut vehicles = Vec::with_capacity(data.vehicles.len());
    for record in &data.vehicles {
        let resolve = |id: i64, kind: NodeKind, role: &str| -> Result<NodeIdx, InputError> {
            index
                .get(&(id, kind))
                .copied()
                .ok_or_else(|| InputError::reference(id, format!("vehicle {} {role}", record.vid)))
        };

        vehicles.push(Vehicle::new(
            record.vid,
            resolve(record.start_id, NodeKind::Depot, "start depot")?,
            resolve(record.dump_id, NodeKind::Dump, "dump")?,
            resolve(record.end_id, NodeKind::Depot, "end depot")?,
            record.capacity,
            record.max_trips,
            record.shift_start,
            record.shift_end,
        ));
    }

    Ok((catalog, vehicles))
}

/// Expands the external-id matrix records over the catalog. Ids serving
/// two roles feed both of their catalog records; pairs the file does not
/// mention stay unreachable.
pub fn matrix_from_records(catalog: &NodeCatalog, records: &[MatrixRecord]) -> TravelTimeMatrix {
    let mut by_external: FxHashMap<i64, Vec<NodeIdx>> = FxHashMap::default();
    for (index, node) in catalog.nodes().iter().enumerate() {
        by_external
            .entry(node.external_id())
            .or_default()
            .push(NodeIdx::new(index));
    }

    let mut matrix = TravelTimeMatrix::new(catalog.len());
    for i in 0..catalog.len() {
        matrix.set(NodeIdx::new(i), NodeIdx::new(i), 0.0);
    }

    for record in records {
        let (Some(from), Some(to)) = (by_external.get(&record.from), by_external.get(&record.to))
        else {
            warn!(from = record.from, to = record.to, "matrix entry references unknown id");
            continue;
        };

        for &f in from {
            for &t in to {
                matrix.set(f, t, record.minutes);
            }
        }
    }

    matrix
}

fn with_suffix(base: &Path, suffix: &str) -> String {
    format!("{}.{suffix}", base.display())
}

fn read(file: &str) -> Result<String, InputError> {
    std::fs::read_to_string(file).map_err(|source| InputError::Io {
        file: file.to_string(),
        source,
    })
}

fn parse_records<T>(
    text: &str,
    file: &str,
    min_fields: usize,
    mut build: impl FnMut(&[&str], usize) -> Result<T, InputError>,
) -> Result<Vec<T>, InputError> {
    let mut records = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < min_fields {
            return Err(InputError::format(
                file,
                number + 1,
                format!("expected at least {min_fields} fields, found {}", fields.len()),
            ));
        }

        records.push(build(&fields, number + 1)?);
    }

    Ok(records)
}

fn parse_field<T: FromStr>(
    field: &str,
    file: &str,
    line: usize,
    name: &str,
) -> Result<T, InputError> {
    field
        .parse()
        .map_err(|_| InputError::format(file, line, format!("invalid {name}: {field}")))
}
