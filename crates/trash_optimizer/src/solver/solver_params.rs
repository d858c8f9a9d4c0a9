use jiff::SignedDuration;

#[derive(Clone, Debug)]
pub struct SolverParams {
    pub seed: u64,

    /// Tabu iteration ceiling; `None` means `10 * N_containers`.
    pub max_iterations: Option<u64>,

    /// Iterations without improvement before giving up; `None` means
    /// `2 * N_containers`.
    pub patience: Option<u64>,

    /// Candidate ceiling per tabu iteration; the generator samples
    /// proportionally across move families beyond it.
    pub neighborhood_cap: usize,

    pub time_budget: Option<SignedDuration>,

    pub diversification: bool,

    /// Tolerated relative cost increase for the fleet reduction pass.
    pub fleet_reduction_slack: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            seed: 0,
            max_iterations: None,
            patience: None,
            neighborhood_cap: 5000,
            time_budget: None,
            diversification: true,
            fleet_reduction_slack: 0.02,
        }
    }
}

impl SolverParams {
    pub fn max_iterations_for(&self, num_containers: usize) -> u64 {
        self.max_iterations.unwrap_or(10 * num_containers as u64)
    }

    pub fn patience_for(&self, num_containers: usize) -> u64 {
        self.patience.unwrap_or(2 * num_containers as u64)
    }

    pub fn tabu_tenure_for(num_containers: usize) -> u64 {
        (num_containers as f64).sqrt().clamp(7.0, 30.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenure_clamp() {
        assert_eq!(SolverParams::tabu_tenure_for(4), 7);
        assert_eq!(SolverParams::tabu_tenure_for(100), 10);
        assert_eq!(SolverParams::tabu_tenure_for(100_000), 30);
    }

    #[test]
    fn test_iteration_defaults() {
        let params = SolverParams::default();
        assert_eq!(params.max_iterations_for(50), 500);
        assert_eq!(params.patience_for(50), 100);

        let params = SolverParams {
            max_iterations: Some(42),
            ..SolverParams::default()
        };
        assert_eq!(params.max_iterations_for(50), 42);
    }
}
