//! Engine output: per-output statistics plus sensitivity and samples.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Reply keys that never name an output.
pub const ERROR_KEY: &str = "error";
pub const SENSITIVITY_KEY: &str = "sensitivity";
pub const SAMPLES_KEY: &str = "samples";
pub const PRIMARY_OUTPUT_KEY: &str = "primary_output";
pub const RESERVED_KEYS: [&str; 4] = [ERROR_KEY, SENSITIVITY_KEY, SAMPLES_KEY, PRIMARY_OUTPUT_KEY];

/// Summary statistics and histogram for one output.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct OutputStats {
    /// Counts per bin
    pub histogram: Vec<u64>,
    /// `histogram.len() + 1` edges, ascending
    pub bin_edges: Vec<f64>,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Keyed by label, e.g. "5%"
    #[serde(default)]
    pub percentiles: IndexMap<String, f64>,
}

impl OutputStats {
    /// Sum of bin counts, `None` if it does not fit in a u64.
    pub fn total_count(&self) -> Option<u64> {
        self.histogram
            .iter()
            .try_fold(0u64, |acc, &count| acc.checked_add(count))
    }
}

/// Result of one simulation run. Read-only once received.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationResult {
    /// Output name (variable or formula output) to statistics, in reply order
    pub outputs: IndexMap<String, OutputStats>,
    /// Output the sensitivity map was computed against
    pub primary_output: Option<String>,
    /// Variable name to correlation with the primary output
    pub sensitivity: Option<IndexMap<String, f64>>,
    /// Trial-aligned raw values per output
    pub samples: Option<IndexMap<String, Vec<f64>>>,
}

impl SimulationResult {
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn output(&self, name: &str) -> Option<&OutputStats> {
        self.outputs.get(name)
    }

    /// The output sensitivity is shown for.
    ///
    /// Uses the explicit `primary_output` when the engine sent one. Engines
    /// that omit it fall back to the first output in reply order.
    pub fn primary_output(&self) -> Option<&str> {
        match &self.primary_output {
            Some(name) => Some(name.as_str()),
            None => self.output_names().next(),
        }
    }

    pub fn is_primary(&self, output: &str) -> bool {
        self.primary_output() == Some(output)
    }

    pub fn samples_for(&self, output: &str) -> Option<&[f64]> {
        self.samples
            .as_ref()
            .and_then(|s| s.get(output))
            .map(Vec::as_slice)
    }
}

/// Flat wire shape: output names as keys next to the reserved keys.
impl Serialize for SimulationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (name, stats) in &self.outputs {
            map.serialize_entry(name, stats)?;
        }
        if let Some(primary) = &self.primary_output {
            map.serialize_entry(PRIMARY_OUTPUT_KEY, primary)?;
        }
        if let Some(sensitivity) = &self.sensitivity {
            map.serialize_entry(SENSITIVITY_KEY, sensitivity)?;
        }
        if let Some(samples) = &self.samples {
            map.serialize_entry(SAMPLES_KEY, samples)?;
        }
        map.end()
    }
}
