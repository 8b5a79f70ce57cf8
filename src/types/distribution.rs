//! Parametric distributions a variable can be drawn from.
//!
//! Each kind carries a fixed parameter record. The wire shape is
//! `{"type": "normal", "params": {"mean": 0.0, "std": 1.0}}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;

/// Distribution tag without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    Normal,
    Uniform,
    Triangular,
    Lognormal,
    Beta,
    Constant,
}

impl DistributionKind {
    pub const ALL: [DistributionKind; 6] = [
        DistributionKind::Normal,
        DistributionKind::Uniform,
        DistributionKind::Triangular,
        DistributionKind::Lognormal,
        DistributionKind::Beta,
        DistributionKind::Constant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Uniform => "uniform",
            Self::Triangular => "triangular",
            Self::Lognormal => "lognormal",
            Self::Beta => "beta",
            Self::Constant => "constant",
        }
    }

    /// Required parameter keys, in form order.
    pub fn param_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Normal => &["mean", "std"],
            Self::Uniform => &["min", "max"],
            Self::Triangular => &["min", "mode", "max"],
            Self::Lognormal => &["mean", "sigma"],
            Self::Beta => &["alpha", "beta"],
            Self::Constant => &["value"],
        }
    }

    /// Parameters a freshly added variable of this kind starts with.
    pub fn default_distribution(&self) -> Distribution {
        match self {
            Self::Normal => Distribution::Normal {
                mean: 0.0,
                std: 1.0,
            },
            Self::Uniform => Distribution::Uniform { min: 0.0, max: 1.0 },
            Self::Triangular => Distribution::Triangular {
                min: 0.0,
                mode: 0.5,
                max: 1.0,
            },
            Self::Lognormal => Distribution::Lognormal {
                mean: 0.0,
                sigma: 1.0,
            },
            Self::Beta => Distribution::Beta {
                alpha: 1.0,
                beta: 1.0,
            },
            Self::Constant => Distribution::Constant { value: 0.0 },
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ValidationError::UnknownDistribution(s.to_string()))
    }
}

/// A distribution with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "lowercase")]
pub enum Distribution {
    Normal { mean: f64, std: f64 },
    Uniform { min: f64, max: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    /// `mean` and `sigma` are of the underlying normal.
    Lognormal { mean: f64, sigma: f64 },
    Beta { alpha: f64, beta: f64 },
    Constant { value: f64 },
}

impl Distribution {
    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Normal { .. } => DistributionKind::Normal,
            Self::Uniform { .. } => DistributionKind::Uniform,
            Self::Triangular { .. } => DistributionKind::Triangular,
            Self::Lognormal { .. } => DistributionKind::Lognormal,
            Self::Beta { .. } => DistributionKind::Beta,
            Self::Constant { .. } => DistributionKind::Constant,
        }
    }

    /// Parameter values paired with their keys, in `param_keys` order.
    pub fn params(&self) -> Vec<(&'static str, f64)> {
        let values = match *self {
            Self::Normal { mean, std } => vec![mean, std],
            Self::Uniform { min, max } => vec![min, max],
            Self::Triangular { min, mode, max } => vec![min, mode, max],
            Self::Lognormal { mean, sigma } => vec![mean, sigma],
            Self::Beta { alpha, beta } => vec![alpha, beta],
            Self::Constant { value } => vec![value],
        };
        self.kind().param_keys().iter().copied().zip(values).collect()
    }

    /// Build a distribution from a tag string and a raw parameter record.
    pub fn from_raw(tag: &str, params: &Map<String, Value>) -> Result<Self, ValidationError> {
        let kind: DistributionKind = tag.parse()?;
        Self::from_params(kind, params)
    }

    /// Build a distribution of `kind` from a raw parameter record.
    ///
    /// Every key in `kind.param_keys()` must be present and hold a finite
    /// number, either as a JSON number or as numeric text (form input).
    /// Extra keys are ignored.
    pub fn from_params(
        kind: DistributionKind,
        params: &Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        let mut values = Vec::with_capacity(kind.param_keys().len());
        for &field in kind.param_keys() {
            let raw = params
                .get(field)
                .ok_or(ValidationError::MissingParam { kind, field })?;
            values.push(param_value(field, raw)?);
        }

        let dist = match (kind, values.as_slice()) {
            (DistributionKind::Normal, &[mean, std]) => Self::Normal { mean, std },
            (DistributionKind::Uniform, &[min, max]) => Self::Uniform { min, max },
            (DistributionKind::Triangular, &[min, mode, max]) => Self::Triangular { min, mode, max },
            (DistributionKind::Lognormal, &[mean, sigma]) => Self::Lognormal { mean, sigma },
            (DistributionKind::Beta, &[alpha, beta]) => Self::Beta { alpha, beta },
            (DistributionKind::Constant, &[value]) => Self::Constant { value },
            // param_keys and the arms above list the same arities
            _ => unreachable!("parameter count mismatch for {kind}"),
        };
        Ok(dist)
    }

    /// Every parameter must be a finite number; JSON has no NaN or infinity.
    pub fn check_finite(&self) -> Result<(), ValidationError> {
        for (field, value) in self.params() {
            if !value.is_finite() {
                return Err(ValidationError::OutOfRange {
                    field,
                    reason: format!("{value} is not a finite number"),
                });
            }
        }
        Ok(())
    }

    /// Check the numeric bounds each kind documents (std ≥ 0, min ≤ max, ...).
    ///
    /// Not part of scenario validation; the reference engine rejects
    /// distributions that fail this.
    pub fn check_bounds(&self) -> Result<(), ValidationError> {
        self.check_finite()?;

        match *self {
            Self::Normal { std, .. } if std < 0.0 => Err(ValidationError::OutOfRange {
                field: "std",
                reason: format!("std must be >= 0, got {std}"),
            }),
            Self::Uniform { min, max } if min > max => Err(ValidationError::OutOfRange {
                field: "max",
                reason: format!("min ({min}) must be <= max ({max})"),
            }),
            Self::Triangular { min, mode, max } if !(min <= mode && mode <= max) => {
                Err(ValidationError::OutOfRange {
                    field: "mode",
                    reason: format!("expected min <= mode <= max, got {min}, {mode}, {max}"),
                })
            }
            Self::Lognormal { sigma, .. } if sigma < 0.0 => Err(ValidationError::OutOfRange {
                field: "sigma",
                reason: format!("sigma must be >= 0, got {sigma}"),
            }),
            Self::Beta { alpha, .. } if alpha <= 0.0 => Err(ValidationError::OutOfRange {
                field: "alpha",
                reason: format!("alpha must be > 0, got {alpha}"),
            }),
            Self::Beta { beta, .. } if beta <= 0.0 => Err(ValidationError::OutOfRange {
                field: "beta",
                reason: format!("beta must be > 0, got {beta}"),
            }),
            _ => Ok(()),
        }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        DistributionKind::Normal.default_distribution()
    }
}

fn param_value(field: &str, raw: &Value) -> Result<f64, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidParam {
        field: field.to_string(),
        reason,
    };

    let value = match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{n} is not representable as a float")))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("'{s}' is not a number")))?,
        other => return Err(invalid(format!("expected a number, got {other}"))),
    };

    if !value.is_finite() {
        return Err(invalid(format!("{value} is not a finite number")));
    }
    Ok(value)
}
