//! Chart series derived from one output's histogram and from raw samples.

use crate::errors::ContractBreach;
use crate::stats;
use crate::types::{OutputStats, SimulationResult};

/// Bar chart series: one bar per bin, positioned at the bin midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub centers: Vec<f64>,
    pub counts: Vec<u64>,
}

/// Cumulative distribution line from the first to the last bin edge.
#[derive(Debug, Clone, PartialEq)]
pub struct CdfSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Histogram held no observations; `y` is flat at zero.
    pub degenerate: bool,
}

/// Trial-aligned (x, y) pairs for two outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub x_name: String,
    pub y_name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ScatterSeries {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Verify `len(bin_edges) == len(histogram) + 1`.
pub fn check_bin_edges(output: &str, stats: &OutputStats) -> Result<(), ContractBreach> {
    if stats.bin_edges.len() != stats.histogram.len() + 1 {
        return Err(ContractBreach::BinEdgeMismatch {
            output: output.to_string(),
            histogram: stats.histogram.len(),
            bin_edges: stats.bin_edges.len(),
        });
    }
    Ok(())
}

fn bin_centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}

/// Bin midpoints paired with counts.
pub fn histogram_series(output: &str, stats: &OutputStats) -> Result<HistogramSeries, ContractBreach> {
    check_bin_edges(output, stats)?;
    Ok(HistogramSeries {
        centers: bin_centers(&stats.bin_edges),
        counts: stats.histogram.clone(),
    })
}

/// Normalized running sum of bin counts.
///
/// Points are `(bin_edges[0], 0)`, then `(center_i, cum_i / total)` per bin,
/// then `(bin_edges[last], 1)`. With a zero total every `y` is 0 and the
/// series is marked degenerate instead of dividing by zero.
pub fn cdf_series(output: &str, stats: &OutputStats) -> Result<CdfSeries, ContractBreach> {
    check_bin_edges(output, stats)?;

    let edges = &stats.bin_edges;
    let first = edges[0];
    let last = edges[edges.len() - 1];

    let mut x = Vec::with_capacity(stats.histogram.len() + 2);
    x.push(first);
    x.extend(bin_centers(edges));
    x.push(last);

    // the running sums below cannot overflow once the total fits
    let total = stats
        .total_count()
        .ok_or_else(|| ContractBreach::CountOverflow {
            output: output.to_string(),
        })?;
    if total == 0 {
        let y = vec![0.0; x.len()];
        return Ok(CdfSeries {
            x,
            y,
            degenerate: true,
        });
    }

    let total = total as f64;
    let mut y = Vec::with_capacity(x.len());
    y.push(0.0);
    let mut running = 0u64;
    for &count in &stats.histogram {
        running += count;
        y.push(running as f64 / total);
    }
    y.push(1.0);

    Ok(CdfSeries {
        x,
        y,
        degenerate: false,
    })
}

/// Pair the raw samples of two outputs by trial index.
///
/// `Ok(None)` when the result has no samples or either name is absent; that
/// view simply renders nothing. Unequal lengths break trial alignment.
pub fn scatter_series(
    result: &SimulationResult,
    x_name: &str,
    y_name: &str,
) -> Result<Option<ScatterSeries>, ContractBreach> {
    let (Some(x), Some(y)) = (result.samples_for(x_name), result.samples_for(y_name)) else {
        return Ok(None);
    };

    if x.len() != y.len() {
        return Err(ContractBreach::SampleLengthMismatch {
            x: x_name.to_string(),
            y: y_name.to_string(),
            x_len: x.len(),
            y_len: y.len(),
        });
    }

    Ok(Some(ScatterSeries {
        x_name: x_name.to_string(),
        y_name: y_name.to_string(),
        x: x.to_vec(),
        y: y.to_vec(),
    }))
}

/// Histogram of preview draws, binned the same way engine outputs are.
pub fn preview_histogram(samples: &[f64], bins: usize) -> HistogramSeries {
    let (counts, edges) = stats::histogram(samples, bins);
    HistogramSeries {
        centers: bin_centers(&edges),
        counts,
    }
}
