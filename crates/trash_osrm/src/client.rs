use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsrmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OSRM returned status {0}")]
    RemoteStatus(String),

    #[error("Incomplete response")]
    IncompleteResponse,
}

#[derive(Deserialize)]
struct TableResponse {
    code: String,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

pub struct OsrmMatrixClientParams {
    pub osrm_url: String,
}

pub const OSRM_TABLE_API_PATH: &str = "/table/v1/driving/";

/// Thin client for the OSRM `/table` service. Returns the full duration
/// matrix in seconds; entries OSRM could not route are `None`.
pub struct OsrmMatrixClient {
    params: OsrmMatrixClientParams,
    client: reqwest::Client,
}

impl OsrmMatrixClient {
    pub fn new(params: OsrmMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_durations<P>(&self, points: &[P]) -> Result<Vec<Vec<Option<f64>>>, OsrmError>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let mut url = self.params.osrm_url.trim_end_matches('/').to_owned();
        url.push_str(OSRM_TABLE_API_PATH);

        for (i, point) in points.iter().enumerate() {
            let point: geo_types::Point = point.into();
            url.push_str(&format!("{},{}", point.x(), point.y()));

            if i < points.len() - 1 {
                url.push(';');
            }
        }

        let response = self
            .client
            .get(url)
            .query(&[("annotations", "duration"), ("skip_waypoints", "true")])
            .send()
            .await?;

        let table: TableResponse = response.json().await?;
        if table.code != "Ok" {
            return Err(OsrmError::RemoteStatus(table.code));
        }

        table.durations.ok_or(OsrmError::IncompleteResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserialization() {
        let body = r#"{
            "code": "Ok",
            "durations": [[0.0, 12.5], [null, 0.0]]
        }"#;

        let table: TableResponse = serde_json::from_str(body).unwrap();
        assert_eq!(table.code, "Ok");

        let durations = table.durations.unwrap();
        assert_eq!(durations[0][1], Some(12.5));
        assert_eq!(durations[1][0], None);
    }
}
