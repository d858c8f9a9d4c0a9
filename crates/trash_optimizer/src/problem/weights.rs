/// Scalarization weights for the route cost function. The time window and
/// capacity weights must stay large enough that any violation dominates
/// any achievable travel improvement.
#[derive(Debug, Clone, Copy)]
pub struct CostWeights {
    pub distance: f64,
    pub time_window: f64,
    pub capacity: f64,
    pub waiting: f64,
    pub trips: f64,
    pub unassigned: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            distance: 1.0,
            time_window: 1e4,
            capacity: 1e4,
            waiting: 0.1,
            trips: 1.0,
            unassigned: 1e6,
        }
    }
}
