//! HTTP front for any [`SimulationEngine`].
//!
//! Routes: `POST /simulate` and `POST /distribution_preview`. An engine that
//! refuses a request still answers 200 with an `{error}` body; malformed
//! requests get 400 and transport-level engine failures 500.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::engine::SimulationEngine;
use crate::prelude::Result;
use crate::types::{Distribution, SimulationRequest};
use crate::Error;

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn simulate<E: SimulationEngine + 'static>(
    State(engine): State<Arc<E>>,
    body: Bytes,
) -> Response {
    let request: SimulationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid request: {e}")),
    };
    debug!(
        variables = request.variables.len(),
        formulas = request.formulas.len(),
        trials = request.num_simulations,
        "simulate"
    );

    match engine.simulate(&request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            warn!(engine = engine.label(), error = %e, "Engine failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn parse_distribution(body: &[u8]) -> std::result::Result<Distribution, String> {
    let value: Value = serde_json::from_slice(body).map_err(|e| format!("Invalid request: {e}"))?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "Missing distribution type".to_string())?;
    let empty = Map::new();
    let params = value.get("params").and_then(Value::as_object).unwrap_or(&empty);
    Distribution::from_raw(tag, params).map_err(|e| e.to_string())
}

async fn preview<E: SimulationEngine + 'static>(
    State(engine): State<Arc<E>>,
    body: Bytes,
) -> Response {
    let distribution = match parse_distribution(&body) {
        Ok(distribution) => distribution,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match engine.preview(&distribution).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Routes for an engine.
pub fn router<E: SimulationEngine + 'static>(engine: Arc<E>) -> Router {
    Router::new()
        .route("/simulate", post(simulate::<E>))
        .route("/distribution_preview", post(preview::<E>))
        .with_state(engine)
}

/// Serve `engine` on an already bound listener until the task is dropped.
pub async fn serve<E: SimulationEngine + 'static>(listener: TcpListener, engine: Arc<E>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, engine = engine.label(), "Engine server listening");
    }
    axum::serve(listener, router(engine))
        .await
        .map_err(|e| Error::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LocalEngine, LocalEngineConfig};
    use crate::types::{PreviewReply, SimulateReply};

    fn engine() -> Arc<LocalEngine> {
        Arc::new(LocalEngine::new(LocalEngineConfig {
            seed: Some(3),
            preview_samples: 50,
            ..LocalEngineConfig::default()
        }))
    }

    async fn raw_body(response: Response) -> (StatusCode, Bytes) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn body_of(response: Response) -> (StatusCode, Value) {
        let (status, bytes) = raw_body(response).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_simulate_route() {
        let body = json!({
            "variables": [
                {"name": "Units", "distribution": {"type": "uniform", "params": {"min": 10, "max": 20}}},
                {"name": "Price", "distribution": {"type": "constant", "params": {"value": 3}}}
            ],
            "formulas": [{"output": "Revenue", "expression": "Units * Price"}],
            "num_simulations": 200
        });
        let response = simulate(State(engine()), Bytes::from(body.to_string())).await;
        let (status, bytes) = raw_body(response).await;
        assert_eq!(status, StatusCode::OK);

        // parse the raw text: a Value would reorder the output keys
        let reply: SimulateReply = serde_json::from_slice(&bytes).unwrap();
        let result = reply.into_result().unwrap();
        let names: Vec<_> = result.output_names().collect();
        assert_eq!(names, vec!["Units", "Price", "Revenue"]);
        assert_eq!(result.primary_output(), Some("Revenue"));
    }

    #[tokio::test]
    async fn test_engine_refusal_is_200_with_error() {
        let body = json!({
            "variables": [],
            "formulas": [{"output": "Y", "expression": "X + 1"}],
            "num_simulations": 10
        });
        let (status, value) = body_of(simulate(State(engine()), Bytes::from(body.to_string())).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["error"], "Error evaluating formula Y: name 'X' is not defined");
    }

    #[tokio::test]
    async fn test_malformed_request_is_400() {
        let (status, value) = body_of(simulate(State(engine()), Bytes::from_static(b"{not json")).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].as_str().unwrap().starts_with("Invalid request"));
    }

    #[tokio::test]
    async fn test_preview_route() {
        let body = json!({"type": "normal", "params": {"mean": 5, "std": "1.5"}});
        let (status, value) = body_of(preview(State(engine()), Bytes::from(body.to_string())).await).await;
        assert_eq!(status, StatusCode::OK);
        let reply: PreviewReply = serde_json::from_value(value).unwrap();
        assert_eq!(reply.into_samples().unwrap().len(), 50);

        let bad = json!({"type": "poisson", "params": {}});
        let (status, value) = body_of(preview(State(engine()), Bytes::from(bad.to_string())).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].as_str().unwrap().contains("poisson"));
    }
}
