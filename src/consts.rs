pub const LOCAL_ENGINE_URL: &str = "http://localhost:5000";

/// Trial count used when a scenario file or config omits one.
pub const DEFAULT_NUM_SIMULATIONS: u32 = 10_000;

/// Number of draws returned by the distribution preview endpoint.
pub const PREVIEW_SAMPLE_COUNT: usize = 1000;

/// Histogram bin count for engine outputs and preview plots.
pub const HISTOGRAM_BINS: usize = 20;

/// Upper bound on trial-aligned samples returned for scatter plots.
pub const MAX_SCATTER_SAMPLES: usize = 1000;

/// Storage namespace holding every saved scenario.
pub const SCENARIO_NAMESPACE: &str = "monte-carlo-scenarios";

/// Percentile labels shown in the stats table, in display order.
pub const TABLE_PERCENTILES: [&str; 8] = ["1%", "5%", "10%", "25%", "75%", "90%", "95%", "99%"];

/// Percentiles computed by the reference engine, as (label, percent).
pub const ENGINE_PERCENTILES: [(&str, f64); 9] = [
    ("1%", 1.0),
    ("5%", 5.0),
    ("10%", 10.0),
    ("25%", 25.0),
    ("50%", 50.0),
    ("75%", 75.0),
    ("90%", 90.0),
    ("95%", 95.0),
    ("99%", 99.0),
];
