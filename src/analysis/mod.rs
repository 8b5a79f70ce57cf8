//! Results derivation: turns engine output into chartable views.
//!
//! Provides:
//! - **Series**: histogram bars, normalized CDF, scatter pairs, preview bins
//! - **Table**: the fixed 13-row statistics table
//! - **Sensitivity**: ranking shown for the primary output only
//!
//! All functions are pure over a [`SimulationResult`]. A [`ContractBreach`]
//! fails the one view it affects; [`output_view`] keeps the others.

pub mod sensitivity;
pub mod series;
pub mod table;

pub use sensitivity::{rank_sensitivity, sensitivity_view, SensitivityBar, SensitivityView};
pub use series::{
    cdf_series, check_bin_edges, histogram_series, preview_histogram, scatter_series, CdfSeries,
    HistogramSeries, ScatterSeries,
};
pub use table::{stats_table, StatsRow, StatsTable};

use crate::errors::ContractBreach;
use crate::types::SimulationResult;

/// Everything shown for one selected output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputView {
    pub output: String,
    pub histogram: Result<HistogramSeries, ContractBreach>,
    pub cdf: Result<CdfSeries, ContractBreach>,
    pub stats: StatsTable,
    pub sensitivity: SensitivityView,
}

impl OutputView {
    /// Breaches across all parts of this view.
    pub fn breaches(&self) -> Vec<&ContractBreach> {
        let mut out = Vec::new();
        if let Err(e) = &self.histogram {
            out.push(e);
        }
        if let Err(e) = &self.cdf {
            out.push(e);
        }
        out.extend(self.stats.rows.iter().filter_map(|r| r.value.as_ref().err()));
        out
    }
}

/// Derive every view for `output`. `None` if the result has no such output.
pub fn output_view(result: &SimulationResult, output: &str) -> Option<OutputView> {
    let stats = result.output(output)?;
    Some(OutputView {
        output: output.to_string(),
        histogram: histogram_series(output, stats),
        cdf: cdf_series(output, stats),
        stats: stats_table(output, stats),
        sensitivity: sensitivity_view(result, output),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputStats;

    #[test]
    fn test_breach_in_histogram_keeps_table() {
        let mut result = SimulationResult::default();
        result.outputs.insert(
            "X".to_string(),
            OutputStats {
                histogram: vec![1, 2, 3],
                bin_edges: vec![0.0, 1.0],
                mean: 4.0,
                ..OutputStats::default()
            },
        );

        let view = output_view(&result, "X").unwrap();
        assert!(view.histogram.is_err());
        assert!(view.cdf.is_err());
        assert_eq!(view.stats.rows[0].value, Ok("4.0000".to_string()));
        // no percentiles at all: 8 failed rows, plus the two series
        assert_eq!(view.breaches().len(), 10);
        assert!(view.sensitivity == SensitivityView::NotAvailable);
    }

    #[test]
    fn test_unknown_output() {
        assert!(output_view(&SimulationResult::default(), "Nope").is_none());
    }
}
