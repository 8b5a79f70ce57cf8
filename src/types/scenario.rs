//! Scenario model: variables, formulas and a trial count.

use std::collections::HashSet;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::DEFAULT_NUM_SIMULATIONS;
use crate::errors::ValidationError;
use crate::types::{Distribution, SimulationRequest, RESERVED_KEYS};

/// A named random input.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub distribution: Distribution,
}

impl Variable {
    /// Create a variable, trimming surrounding whitespace from the name.
    ///
    /// Parameters must be finite so the variable can be stored and sent.
    pub fn new(name: &str, distribution: Distribution) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        distribution.check_finite()?;
        Ok(Self {
            name: name.to_string(),
            distribution,
        })
    }
}

/// A derived output computed by the engine from `expression`.
///
/// The expression is passed through untouched; only emptiness is checked here.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Formula {
    pub output: String,
    pub expression: String,
}

impl Formula {
    pub fn new(output: &str, expression: &str) -> Result<Self, ValidationError> {
        let output = output.trim();
        if output.is_empty() {
            return Err(ValidationError::EmptyOutput);
        }
        if expression.trim().is_empty() {
            return Err(ValidationError::EmptyExpression);
        }
        Ok(Self {
            output: output.to_string(),
            expression: expression.to_string(),
        })
    }
}

fn default_trial_count() -> NonZeroU32 {
    NonZeroU32::new(DEFAULT_NUM_SIMULATIONS).unwrap_or(NonZeroU32::MIN)
}

/// One simulation specification.
///
/// Stored as `{name, variables, formulas, numSimulations}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub formulas: Vec<Formula>,
    #[serde(rename = "numSimulations", default = "default_trial_count")]
    pub trial_count: NonZeroU32,
}

impl Scenario {
    pub fn new(name: impl Into<String>, trial_count: u32) -> Result<Self, ValidationError> {
        let trial_count = NonZeroU32::new(trial_count).ok_or(ValidationError::ZeroTrials)?;
        Ok(Self {
            name: name.into(),
            variables: Vec::new(),
            formulas: Vec::new(),
            trial_count,
        })
    }

    /// Append a variable. Uniqueness is checked by [`Scenario::validate`], not here.
    pub fn add_variable(
        &mut self,
        name: &str,
        distribution: Distribution,
    ) -> Result<&Variable, ValidationError> {
        self.variables.push(Variable::new(name, distribution)?);
        Ok(&self.variables[self.variables.len() - 1])
    }

    /// Append a formula. Uniqueness is checked by [`Scenario::validate`], not here.
    pub fn add_formula(&mut self, output: &str, expression: &str) -> Result<&Formula, ValidationError> {
        self.formulas.push(Formula::new(output, expression)?);
        Ok(&self.formulas[self.formulas.len() - 1])
    }

    /// Variable names followed by formula outputs, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .map(|v| v.name.as_str())
            .chain(self.formulas.iter().map(|f| f.output.as_str()))
    }

    /// Check that no name is shared between variables and formula outputs.
    ///
    /// Comparison is exact and case-sensitive. The first repeated name in
    /// insertion order is reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for name in self.names() {
            if !seen.insert(name) {
                return Err(ValidationError::DuplicateName(name.to_string()));
            }
        }

        for var in &self.variables {
            if let Err(e) = var.distribution.check_bounds() {
                warn!(variable = %var.name, error = %e, "Distribution parameters out of range");
            }
        }
        for name in self.names().filter(|n| RESERVED_KEYS.contains(n)) {
            warn!(name, "Name collides with a reserved reply key and will be shadowed");
        }

        Ok(())
    }

    /// Project into the engine request. Callers validate first.
    pub fn to_request(&self) -> SimulationRequest {
        SimulationRequest {
            variables: self.variables.clone(),
            formulas: self.formulas.clone(),
            num_simulations: self.trial_count.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normal() -> Distribution {
        Distribution::Normal {
            mean: 10.0,
            std: 2.0,
        }
    }

    #[test]
    fn test_add_variable_trims_and_rejects_empty() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        let var = scenario.add_variable("  Revenue ", normal()).unwrap();
        assert_eq!(var.name, "Revenue");
        assert_eq!(scenario.add_variable("   ", normal()), Err(ValidationError::EmptyName));
        assert_eq!(scenario.variables.len(), 1);
    }

    #[test]
    fn test_add_formula_errors() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        assert_eq!(
            scenario.add_formula("", "a + b").unwrap_err(),
            ValidationError::EmptyOutput
        );
        assert_eq!(
            scenario.add_formula("Profit", " \t").unwrap_err(),
            ValidationError::EmptyExpression
        );
        assert!(scenario.formulas.is_empty());
    }

    #[test]
    fn test_add_formula_keeps_expression_text() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        let formula = scenario.add_formula(" Profit ", "  Revenue - Cost\n").unwrap();
        assert_eq!(formula.output, "Profit");
        assert_eq!(formula.expression, "  Revenue - Cost\n");
    }

    #[test]
    fn test_add_variable_rejects_non_finite_params() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        let err = scenario
            .add_variable("X", Distribution::Constant { value: f64::INFINITY })
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "value", .. }));
        let err = scenario
            .add_variable("Y", Distribution::Normal { mean: f64::NAN, std: 1.0 })
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "mean", .. }));
        assert!(scenario.variables.is_empty());
    }

    #[test]
    fn test_zero_trials_rejected() {
        assert_eq!(Scenario::new("S", 0).unwrap_err(), ValidationError::ZeroTrials);
    }

    #[test]
    fn test_validate_unique_names() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        scenario.add_variable("Revenue", normal()).unwrap();
        scenario.add_variable("Cost", normal()).unwrap();
        scenario.add_formula("Profit", "Revenue - Cost").unwrap();
        assert_eq!(scenario.validate(), Ok(()));
    }

    #[test]
    fn test_validate_is_case_sensitive() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        scenario.add_variable("cost", normal()).unwrap();
        scenario.add_variable("Cost", normal()).unwrap();
        assert_eq!(scenario.validate(), Ok(()));
    }

    #[test]
    fn test_validate_duplicate_across_variables_and_formulas() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        scenario.add_variable("Revenue", normal()).unwrap();
        scenario.add_formula("Revenue", "1 + 1").unwrap();
        assert_eq!(
            scenario.validate(),
            Err(ValidationError::DuplicateName("Revenue".to_string()))
        );
    }

    #[test]
    fn test_validate_duplicate_formula_outputs() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        scenario.add_formula("A", "1").unwrap();
        scenario.add_formula("B", "2").unwrap();
        scenario.add_formula("A", "3").unwrap();
        assert!(matches!(
            scenario.validate(),
            Err(ValidationError::DuplicateName(ref n)) if n == "A"
        ));
    }

    #[test]
    fn test_validate_does_not_enforce_bounds() {
        let mut scenario = Scenario::new("S", 100).unwrap();
        scenario
            .add_variable("X", Distribution::Normal { mean: 0.0, std: -1.0 })
            .unwrap();
        assert_eq!(scenario.validate(), Ok(()));
    }

    #[test]
    fn test_to_request_wire_shape() {
        let mut scenario = Scenario::new("S", 5000).unwrap();
        scenario.add_variable("X", normal()).unwrap();

        let value = serde_json::to_value(scenario.to_request()).unwrap();
        assert_eq!(
            value,
            json!({
                "variables": [
                    {"name": "X", "distribution": {"type": "normal", "params": {"mean": 10.0, "std": 2.0}}}
                ],
                "formulas": [],
                "num_simulations": 5000
            })
        );
    }

    #[test]
    fn test_storage_shape_defaults_trial_count() {
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "Legacy",
            "variables": [],
            "formulas": [{"output": "Y", "expression": "2 * 3"}]
        }))
        .unwrap();
        assert_eq!(scenario.trial_count.get(), DEFAULT_NUM_SIMULATIONS);

        let value = serde_json::to_value(&scenario).unwrap();
        assert_eq!(value["numSimulations"], json!(DEFAULT_NUM_SIMULATIONS));
    }

    #[test]
    fn test_zero_trial_count_fails_to_parse() {
        let parsed = serde_json::from_value::<Scenario>(json!({
            "name": "Bad",
            "numSimulations": 0
        }));
        assert!(parsed.is_err());
    }
}
