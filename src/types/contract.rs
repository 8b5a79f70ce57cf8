//! Request and reply shapes exchanged with the simulation engine.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{
    Formula, OutputStats, SimulationResult, Variable, ERROR_KEY, PRIMARY_OUTPUT_KEY, SAMPLES_KEY,
    SENSITIVITY_KEY,
};
use crate::Error;

fn default_num_simulations() -> u32 {
    1000
}

/// Body of `POST /simulate`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub formulas: Vec<Formula>,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
}

/// Reply to `POST /simulate`: a full result or an explicit engine error.
///
/// The two are exclusive. An error reply carries no usable partial result.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulateReply {
    Result(SimulationResult),
    Error(String),
}

impl SimulateReply {
    /// Map the error variant to [`Error::Engine`], verbatim.
    pub fn into_result(self) -> Result<SimulationResult, Error> {
        match self {
            SimulateReply::Result(result) => Ok(result),
            SimulateReply::Error(message) => Err(Error::Engine(message)),
        }
    }
}

impl From<SimulationResult> for SimulateReply {
    fn from(result: SimulationResult) -> Self {
        SimulateReply::Result(result)
    }
}

impl Serialize for SimulateReply {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SimulateReply::Result(result) => result.serialize(serializer),
            SimulateReply::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(ERROR_KEY, message)?;
                map.end()
            }
        }
    }
}

struct ReplyVisitor;

impl<'de> Visitor<'de> for ReplyVisitor {
    type Value = SimulateReply;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a simulation result object or an {\"error\": ...} object")
    }

    // Walks keys in document order so output order survives parsing.
    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut result = SimulationResult::default();
        let mut error: Option<String> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                ERROR_KEY => error = Some(map.next_value()?),
                SENSITIVITY_KEY => result.sensitivity = map.next_value()?,
                SAMPLES_KEY => result.samples = map.next_value()?,
                PRIMARY_OUTPUT_KEY => result.primary_output = map.next_value()?,
                _ => {
                    let stats: OutputStats = map.next_value()?;
                    result.outputs.insert(key, stats);
                }
            }
        }

        Ok(match error {
            Some(message) => SimulateReply::Error(message),
            None => SimulateReply::Result(result),
        })
    }
}

impl<'de> Deserialize<'de> for SimulateReply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ReplyVisitor)
    }
}

/// Reply to `POST /distribution_preview`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PreviewReply {
    Samples { samples: Vec<f64> },
    Error { error: String },
}

impl PreviewReply {
    pub fn into_samples(self) -> Result<Vec<f64>, Error> {
        match self {
            PreviewReply::Samples { samples } => Ok(samples),
            PreviewReply::Error { error } => Err(Error::Engine(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats_json(mean: f64) -> serde_json::Value {
        json!({
            "histogram": [1, 2, 1],
            "bin_edges": [0.0, 1.0, 2.0, 3.0],
            "mean": mean, "median": mean, "std": 1.0, "min": 0.0, "max": 3.0,
            "percentiles": {"1%": 0.1, "50%": 1.5}
        })
    }

    #[test]
    fn test_reply_keeps_output_order_and_splits_reserved_keys() {
        let text = format!(
            r#"{{"Profit": {}, "Cost": {}, "sensitivity": {{"Cost": -0.9}}, "samples": {{"Profit": [1.0], "Cost": [2.0]}}}}"#,
            stats_json(5.0),
            stats_json(3.0)
        );
        let reply: SimulateReply = serde_json::from_str(&text).unwrap();
        let result = reply.into_result().unwrap();

        let names: Vec<_> = result.output_names().collect();
        assert_eq!(names, vec!["Profit", "Cost"]);
        assert_eq!(result.output("Cost").unwrap().mean, 3.0);
        assert_eq!(result.sensitivity.as_ref().unwrap()["Cost"], -0.9);
        assert_eq!(result.samples_for("Cost"), Some(&[2.0][..]));
        // no explicit primary: first output in reply order
        assert!(result.is_primary("Profit"));
        assert!(!result.is_primary("Cost"));
    }

    #[test]
    fn test_reply_order_does_not_follow_alphabet() {
        let text = format!(r#"{{"Zeta": {}, "Alpha": {}}}"#, stats_json(1.0), stats_json(2.0));
        let reply: SimulateReply = serde_json::from_str(&text).unwrap();
        let result = reply.into_result().unwrap();
        assert_eq!(result.output_names().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_explicit_primary_output_wins() {
        let text = format!(
            r#"{{"Revenue": {}, "Profit": {}, "primary_output": "Profit"}}"#,
            stats_json(1.0),
            stats_json(2.0)
        );
        let result = serde_json::from_str::<SimulateReply>(&text)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result.primary_output(), Some("Profit"));
        assert!(!result.is_primary("Revenue"));
    }

    #[test]
    fn test_error_reply() {
        let reply: SimulateReply =
            serde_json::from_str(r#"{"error": "Error evaluating formula Y: bad"}"#).unwrap();
        assert_eq!(reply, SimulateReply::Error("Error evaluating formula Y: bad".into()));
        let err = reply.into_result().unwrap_err();
        assert!(matches!(err, Error::Engine(ref m) if m == "Error evaluating formula Y: bad"));
    }

    #[test]
    fn test_reply_serializes_flat() {
        let text = format!(r#"{{"X": {}, "primary_output": "X"}}"#, stats_json(1.0));
        let reply: SimulateReply = serde_json::from_str(&text).unwrap();
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["primary_output"], json!("X"));
        assert_eq!(value["X"]["histogram"], json!([1, 2, 1]));
        assert!(value.get("sensitivity").is_none());
    }

    #[test]
    fn test_preview_reply_variants() {
        let ok: PreviewReply = serde_json::from_str(r#"{"samples": [1.0, 2.5]}"#).unwrap();
        assert_eq!(ok.into_samples().unwrap(), vec![1.0, 2.5]);

        let err: PreviewReply = serde_json::from_str(r#"{"error": "beta must be > 0"}"#).unwrap();
        assert!(matches!(err.into_samples(), Err(Error::Engine(_))));
    }

    #[test]
    fn test_request_defaults() {
        let req: SimulationRequest = serde_json::from_str(r#"{"variables": []}"#).unwrap();
        assert_eq!(req.num_simulations, 1000);
        assert!(req.formulas.is_empty());
    }
}
