mod client;

pub use client::{OSRM_TABLE_API_PATH, OsrmError, OsrmMatrixClient, OsrmMatrixClientParams};
