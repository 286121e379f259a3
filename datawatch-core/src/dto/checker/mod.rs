//! Checker definition exchange format
//!
//! The persisted, serialization-agnostic description of a data checker:
//!
//! ```json
//! {
//!   "type": "DataChecker",
//!   "checkerId": "hdfsDataChecker",
//!   "pathPatterns": ["/data/${YEAR}/${MONTH}/${DAY}"],
//!   "principal": "etl",
//!   "variables": { "DAY": [13, 1] }
//! }
//! ```
//!
//! `dataPathPatterns` and `hdfsUser` are accepted as aliases on input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::pattern::PathPattern;
use crate::domain::variable::VariableSet;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("malformed checker definition: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("cannot create checker of type '{expected}' from definition of type '{found}'")]
    WrongType { expected: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerDefinition {
    #[serde(rename = "type")]
    pub checker_type: String,
    pub checker_id: String,
    #[serde(alias = "dataPathPatterns")]
    pub path_patterns: Vec<PathPattern>,
    #[serde(alias = "hdfsUser")]
    pub principal: String,
    #[serde(default)]
    pub variables: VariableSet,
}

impl CheckerDefinition {
    pub fn to_json(&self) -> Result<serde_json::Value, DefinitionError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses a definition, requiring its `type` to be `expected_type`
    pub fn from_json(
        value: serde_json::Value,
        expected_type: &str,
    ) -> Result<Self, DefinitionError> {
        let def: Self = serde_json::from_value(value)?;
        def.ensure_type(expected_type)?;
        Ok(def)
    }

    pub fn ensure_type(&self, expected_type: &str) -> Result<(), DefinitionError> {
        if self.checker_type != expected_type {
            return Err(DefinitionError::WrongType {
                expected: expected_type.to_string(),
                found: self.checker_type.clone(),
            });
        }
        Ok(())
    }
}
