//! Variable ranking by correlation with the primary output.

use indexmap::IndexMap;

use crate::types::SimulationResult;

#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityBar {
    pub variable: String,
    /// Signed Pearson correlation in [-1, 1]
    pub correlation: f64,
}

impl SensitivityBar {
    pub fn is_negative(&self) -> bool {
        self.correlation < 0.0
    }
}

/// What the sensitivity panel shows for the selected output.
#[derive(Debug, Clone, PartialEq)]
pub enum SensitivityView {
    Ranked(Vec<SensitivityBar>),
    /// Selected output is not the primary output, or the engine sent no map.
    NotAvailable,
}

impl SensitivityView {
    pub fn is_available(&self) -> bool {
        matches!(self, SensitivityView::Ranked(_))
    }
}

/// Sort variables by descending |correlation|. Ties keep map order.
pub fn rank_sensitivity(sensitivity: &IndexMap<String, f64>) -> Vec<SensitivityBar> {
    let mut bars: Vec<SensitivityBar> = sensitivity
        .iter()
        .map(|(variable, &correlation)| SensitivityBar {
            variable: variable.clone(),
            correlation,
        })
        .collect();
    // sort_by is stable
    bars.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    bars
}

/// Ranking for `output`, or `NotAvailable` unless it is the primary output.
pub fn sensitivity_view(result: &SimulationResult, output: &str) -> SensitivityView {
    match &result.sensitivity {
        Some(sensitivity) if result.is_primary(output) => {
            SensitivityView::Ranked(rank_sensitivity(sensitivity))
        }
        _ => SensitivityView::NotAvailable,
    }
}
