//! In-process reference engine.
//!
//! Implements the same contract as a remote engine: samples every variable,
//! evaluates formulas in declaration order, then summarizes each output.
//! Sensitivity is computed against the first formula output, which is
//! reported explicitly as `primary_output`.

pub mod expr;
pub mod sampler;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::consts::{ENGINE_PERCENTILES, HISTOGRAM_BINS, MAX_SCATTER_SAMPLES, PREVIEW_SAMPLE_COUNT};
use crate::engine::SimulationEngine;
use crate::prelude::Result;
use crate::stats;
use crate::types::{
    Distribution, OutputStats, PreviewReply, SimulateReply, SimulationRequest, SimulationResult,
};

use expr::Expr;

/// Tuning for [`LocalEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEngineConfig {
    pub histogram_bins: usize,
    pub preview_samples: usize,
    pub max_scatter_samples: usize,
    /// Fixed seed for reproducible runs; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            histogram_bins: HISTOGRAM_BINS,
            preview_samples: PREVIEW_SAMPLE_COUNT,
            max_scatter_samples: MAX_SCATTER_SAMPLES,
            seed: None,
        }
    }
}

pub struct LocalEngine {
    config: LocalEngineConfig,
    rng: Mutex<SmallRng>,
}

impl LocalEngine {
    pub fn new(config: LocalEngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &LocalEngineConfig {
        &self.config
    }

    /// Run a full simulation synchronously.
    pub fn run(&self, request: &SimulationRequest) -> SimulateReply {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        match run_simulation(request, &self.config, &mut *rng) {
            Ok(result) => {
                info!(
                    outputs = result.outputs.len(),
                    trials = request.num_simulations,
                    primary = result.primary_output.as_deref().unwrap_or("-"),
                    "Simulation complete"
                );
                SimulateReply::Result(result)
            }
            Err(message) => {
                warn!(error = %message, "Simulation rejected");
                SimulateReply::Error(message)
            }
        }
    }

    /// Draw preview samples for a single distribution.
    pub fn draw_preview(&self, distribution: &Distribution) -> PreviewReply {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        match sampler::sample(distribution, self.config.preview_samples, &mut *rng) {
            Ok(samples) => PreviewReply::Samples { samples },
            Err(e) => PreviewReply::Error {
                error: format!("Invalid {} distribution: {e}", distribution.kind()),
            },
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(LocalEngineConfig::default())
    }
}

#[async_trait]
impl SimulationEngine for LocalEngine {
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulateReply> {
        Ok(self.run(request))
    }

    async fn preview(&self, distribution: &Distribution) -> Result<PreviewReply> {
        Ok(self.draw_preview(distribution))
    }

    fn label(&self) -> &'static str {
        "local"
    }
}

/// Summary statistics, histogram and percentiles of one column.
pub fn summarize(values: &[f64], bins: usize) -> OutputStats {
    let sorted = stats::sorted_copy(values);
    let (histogram, bin_edges) = stats::histogram(values, bins);
    let percentiles = ENGINE_PERCENTILES
        .iter()
        .map(|&(label, p)| (label.to_string(), stats::percentile_sorted(&sorted, p)))
        .collect();

    OutputStats {
        histogram,
        bin_edges,
        mean: stats::mean(values),
        median: stats::median_sorted(&sorted),
        std: stats::std_dev(values),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        max: sorted.last().copied().unwrap_or(f64::NAN),
        percentiles,
    }
}

fn run_simulation(
    request: &SimulationRequest,
    config: &LocalEngineConfig,
    rng: &mut SmallRng,
) -> std::result::Result<SimulationResult, String> {
    let trials = request.num_simulations as usize;
    if trials == 0 {
        return Err("num_simulations must be a positive integer".to_string());
    }

    let mut columns: IndexMap<String, Vec<f64>> = IndexMap::new();

    for var in &request.variables {
        if columns.contains_key(&var.name) {
            return Err(format!("Duplicate name: {}", var.name));
        }
        let values = sampler::sample(&var.distribution, trials, rng)
            .map_err(|e| format!("Invalid distribution for variable {}: {e}", var.name))?;
        columns.insert(var.name.clone(), values);
    }

    for formula in &request.formulas {
        let fail = |reason: String| format!("Error evaluating formula {}: {reason}", formula.output);
        if columns.contains_key(&formula.output) {
            return Err(fail(format!("name '{}' is already defined", formula.output)));
        }

        let expr = Expr::compile(&formula.expression, &columns).map_err(|e| fail(e.to_string()))?;
        let data: Vec<&[f64]> = columns.values().map(Vec::as_slice).collect();
        let values = expr.eval_columns(&data, trials);

        if values.iter().any(|v| !v.is_finite()) {
            return Err(fail("produced non-finite values".to_string()));
        }
        debug!(output = %formula.output, "Formula evaluated");
        columns.insert(formula.output.clone(), values);
    }

    let outputs: IndexMap<String, OutputStats> = columns
        .iter()
        .map(|(name, values)| (name.clone(), summarize(values, config.histogram_bins)))
        .collect();

    let mut primary_output = None;
    let mut sensitivity = None;
    if let Some(primary) = request.formulas.first() {
        if !request.variables.is_empty() {
            let target = &columns[&primary.output];
            let map: IndexMap<String, f64> = request
                .variables
                .iter()
                .map(|v| (v.name.clone(), stats::pearson(&columns[&v.name], target)))
                .collect();
            primary_output = Some(primary.output.clone());
            sensitivity = Some(map);
        }
    }

    let amount = config.max_scatter_samples.min(trials);
    let indices = rand::seq::index::sample(rng, trials, amount).into_vec();
    let samples: IndexMap<String, Vec<f64>> = columns
        .iter()
        .map(|(name, values)| (name.clone(), indices.iter().map(|&i| values[i]).collect()))
        .collect();

    Ok(SimulationResult {
        outputs,
        primary_output,
        sensitivity,
        samples: Some(samples),
    })
}
