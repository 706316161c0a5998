//! Training parameter sets and the engine's parameter schema
//!
//! Parameters are a flat name → value map sent verbatim to the engine. The
//! only parameter the controller itself reads is `num_episodes`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LabError, Result};

/// Name of the parameter holding the configured episode count
pub const NUM_EPISODES: &str = "num_episodes";

/// Single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value (e.g. an initialization strategy)
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value, if it is numeric
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Integer view of the value; integral floats are accepted
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Parse a command-line style value (`"0.1"`, `"500"`, `"fixed"`)
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            Self::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            Self::Float(v)
        } else {
            Self::Text(raw.to_string())
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ============================================================================
// Parameter Set
// ============================================================================

/// Mapping of parameter name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParameterValue>);

impl ParameterSet {
    /// Create an empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a value
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Configured episode count, if present and a positive integer
    #[must_use]
    pub fn num_episodes(&self) -> Option<u64> {
        self.get(NUM_EPISODES)
            .and_then(ParameterValue::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .filter(|n| *n > 0)
    }

    /// Schema-independent checks: numbers finite, `num_episodes` a positive integer
    ///
    /// # Errors
    /// Returns `LabError::Validation` naming the first offending parameter
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.0 {
            if let ParameterValue::Float(v) = value
                && !v.is_finite()
            {
                return Err(LabError::validation(name, "must be a finite number"));
            }
        }

        if let Some(value) = self.get(NUM_EPISODES) {
            match value.as_i64() {
                Some(n) if n > 0 => {}
                _ => {
                    return Err(LabError::validation(
                        NUM_EPISODES,
                        "must be a positive integer",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validate against an engine-provided schema, after [`validate`](Self::validate)
    ///
    /// Parameters the schema does not describe are passed through unchecked.
    ///
    /// # Errors
    /// Returns `LabError::Validation` naming the first offending parameter
    pub fn validate_against(&self, schema: &ParameterSchema) -> Result<()> {
        self.validate()?;

        for (name, value) in &self.0 {
            if let Some(spec) = schema.get(name) {
                spec.check(name, value)?;
            }
        }

        Ok(())
    }
}

impl FromIterator<(String, ParameterValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Parameter Schema
// ============================================================================

/// Declared parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Integer
    Int,
    /// Floating point
    Float,
    /// String
    String,
}

/// Engine description of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Declared type
    #[serde(rename = "type")]
    pub kind: ParameterType,
    /// Default value
    pub default: ParameterValue,
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for string parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    fn check(&self, name: &str, value: &ParameterValue) -> Result<()> {
        match self.kind {
            ParameterType::Int => {
                if value.as_i64().is_none() {
                    return Err(LabError::validation(name, "must be an integer"));
                }
            }
            ParameterType::Float => {
                if value.as_f64().is_none() {
                    return Err(LabError::validation(name, "must be a number"));
                }
            }
            ParameterType::String => {
                let ParameterValue::Text(text) = value else {
                    return Err(LabError::validation(name, "must be a string"));
                };
                if let Some(ref options) = self.options
                    && !options.iter().any(|o| o == text)
                {
                    return Err(LabError::validation(
                        name,
                        format!("must be one of: {}", options.join(", ")),
                    ));
                }
                return Ok(());
            }
        }

        if let Some(v) = value.as_f64() {
            if let Some(min) = self.min
                && v < min
            {
                return Err(LabError::validation(name, format!("must be >= {min}")));
            }
            if let Some(max) = self.max
                && v > max
            {
                return Err(LabError::validation(name, format!("must be <= {max}")));
            }
        }

        Ok(())
    }
}

/// Parameter schema for one algorithm/environment pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema(BTreeMap<String, ParameterSpec>);

impl ParameterSchema {
    /// Look up one parameter's spec
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.0.get(name)
    }

    /// Iterate specs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterSpec)> {
        self.0.iter()
    }

    /// Parameter set populated with every default
    #[must_use]
    pub fn defaults(&self) -> ParameterSet {
        self.0
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default.clone()))
            .collect()
    }
}

impl FromIterator<(String, ParameterSpec)> for ParameterSchema {
    fn from_iter<I: IntoIterator<Item = (String, ParameterSpec)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
