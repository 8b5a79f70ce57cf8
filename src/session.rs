//! Results session: the current result plus view selection.
//!
//! # Concurrency
//!
//! Runs are not serialized. Each run takes a [`RunTicket`] under the lock,
//! the lock is released for the engine call, and the reply is stored under
//! the lock again. Whichever run *completes* last owns the stored result
//! (last-writer-wins by completion); an earlier call is never aborted.
//! Error replies never replace a stored result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::analysis::{output_view, preview_histogram, scatter_series, HistogramSeries, OutputView, ScatterSeries};
use crate::engine::SimulationEngine;
use crate::errors::ContractBreach;
use crate::prelude::Result;
use crate::types::{Distribution, Scenario, SimulateReply, SimulationResult};

/// Handle for one in-flight run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunTicket(u64);

impl RunTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ResultsSession {
    current: Option<Arc<SimulationResult>>,
    current_ticket: Option<RunTicket>,
    selected_output: Option<String>,
    scatter: Option<(String, String)>,
    in_flight: usize,
    next_ticket: u64,
}

pub type SharedSession = Arc<Mutex<ResultsSession>>;

impl ResultsSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn begin_run(&mut self) -> RunTicket {
        let ticket = RunTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;
        ticket
    }

    /// Record the outcome of `ticket`.
    ///
    /// A successful result replaces the current one and resets selection.
    /// Failures are returned and leave the stored result untouched.
    pub fn complete_run(
        &mut self,
        ticket: RunTicket,
        outcome: Result<SimulationResult>,
    ) -> Result<Arc<SimulationResult>> {
        self.in_flight = self.in_flight.saturating_sub(1);

        let result = match outcome {
            Ok(result) => Arc::new(result),
            Err(e) => {
                warn!(ticket = ticket.id(), error = %e, "Run failed, keeping previous result");
                return Err(e);
            }
        };

        if self.current_ticket.is_some_and(|t| t > ticket) {
            debug!(
                ticket = ticket.id(),
                "Older run completed after a newer one; storing it anyway"
            );
        }

        let (first, second) = {
            let mut names = result.output_names();
            (names.next().map(str::to_string), names.next().map(str::to_string))
        };
        self.scatter = first
            .clone()
            .map(|x| (x.clone(), second.unwrap_or(x)));
        self.selected_output = first;
        self.current = Some(Arc::clone(&result));
        self.current_ticket = Some(ticket);

        info!(
            ticket = ticket.id(),
            outputs = result.outputs.len(),
            "Stored simulation result"
        );
        Ok(result)
    }

    pub fn is_running(&self) -> bool {
        self.in_flight > 0
    }

    pub fn current(&self) -> Option<Arc<SimulationResult>> {
        self.current.clone()
    }

    pub fn selected_output(&self) -> Option<&str> {
        self.selected_output.as_deref()
    }

    pub fn scatter_selection(&self) -> Option<(&str, &str)> {
        self.scatter.as_ref().map(|(x, y)| (x.as_str(), y.as_str()))
    }

    /// Switch the displayed output. Unknown names leave the selection as is.
    pub fn select_output(&mut self, output: &str) -> Option<OutputView> {
        let view = output_view(self.current.as_deref()?, output)?;
        self.selected_output = Some(output.to_string());
        Some(view)
    }

    /// Views for the selected output, re-derived from the stored result.
    pub fn current_view(&self) -> Option<OutputView> {
        output_view(self.current.as_deref()?, self.selected_output.as_deref()?)
    }

    pub fn select_scatter(&mut self, x: &str, y: &str) -> std::result::Result<Option<ScatterSeries>, ContractBreach> {
        self.scatter = Some((x.to_string(), y.to_string()));
        self.scatter_view()
    }

    /// Scatter pairs for the selected X/Y. `Ok(None)` when nothing to plot.
    pub fn scatter_view(&self) -> std::result::Result<Option<ScatterSeries>, ContractBreach> {
        match (self.current.as_deref(), &self.scatter) {
            (Some(result), Some((x, y))) => scatter_series(result, x, y),
            _ => Ok(None),
        }
    }
}

fn lock(session: &Mutex<ResultsSession>) -> MutexGuard<'_, ResultsSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Validate, send and store one scenario run.
///
/// Invalid scenarios never reach the engine. The session lock is not held
/// while the engine is working.
pub async fn run_scenario<E: SimulationEngine + ?Sized>(
    engine: &E,
    session: &Mutex<ResultsSession>,
    scenario: &Scenario,
) -> Result<Arc<SimulationResult>> {
    scenario.validate()?;
    let request = scenario.to_request();

    let ticket = lock(session).begin_run();
    info!(
        scenario = %scenario.name,
        ticket = ticket.id(),
        engine = engine.label(),
        trials = request.num_simulations,
        "Running simulation"
    );

    let outcome = engine
        .simulate(&request)
        .await
        .and_then(SimulateReply::into_result);

    lock(session).complete_run(ticket, outcome)
}

/// Fetch preview draws for one distribution and bin them.
pub async fn preview_distribution<E: SimulationEngine + ?Sized>(
    engine: &E,
    distribution: &Distribution,
    bins: usize,
) -> Result<HistogramSeries> {
    let samples = engine.preview(distribution).await?.into_samples()?;
    debug!(kind = %distribution.kind(), samples = samples.len(), "Preview received");
    Ok(preview_histogram(&samples, bins))
}
