//! Persisted session state
//!
//! `{ documentTree, positionedVariables, lastSavedAt }` as stored on disk.
//! Reading is lenient: the parts that can be recovered are kept and the rest
//! falls back to defaults with a warning.

use crate::error::{Error, Result};
use crate::variables::CanvasCapsule;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    /// Last serialized document, in portable form
    pub document_tree: Option<Value>,
    /// Canonical variable list, one entry per id
    pub positioned_variables: Vec<CanvasCapsule>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl PersistedState {
    /// Parse a state file.
    ///
    /// Only invalid JSON or a non-object root is an error. A malformed
    /// capsule is skipped, a non-array variable list becomes empty and an
    /// unreadable timestamp becomes `None`.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(mut map) = root else {
            return Err(Error::StateParse {
                message: "state root is not an object".to_string(),
                source: None,
            });
        };

        let document_tree = match map.remove("documentTree") {
            None | Some(Value::Null) => None,
            Some(tree) => Some(tree),
        };

        let positioned_variables = match map.remove("positionedVariables") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => parse_capsules(items),
            Some(other) => {
                warn!(
                    "Ignoring positionedVariables: expected an array, found {}",
                    json_kind(&other)
                );
                Vec::new()
            }
        };

        let last_saved_at = match map.remove("lastSavedAt") {
            Some(Value::String(s)) => match DateTime::parse_from_rfc3339(&s) {
                Ok(t) => Some(t.with_timezone(&Utc)),
                Err(e) => {
                    warn!("Ignoring unreadable lastSavedAt '{}': {}", s, e);
                    None
                }
            },
            _ => None,
        };

        Ok(Self {
            document_tree,
            positioned_variables,
            last_saved_at,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The canonical variables without positions.
    pub fn available_variables(&self) -> Vec<crate::variables::Variable> {
        self.positioned_variables
            .iter()
            .map(CanvasCapsule::to_variable)
            .collect()
    }
}

fn parse_capsules(items: Vec<Value>) -> Vec<CanvasCapsule> {
    let mut seen = HashSet::new();
    let mut capsules = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<CanvasCapsule>(item) {
            Ok(capsule) if capsule.id().is_empty() => {
                warn!("Skipping positioned variable {}: missing id", i);
            }
            Ok(capsule) if !has_valid_geometry(&capsule) => {
                warn!(
                    "Skipping positioned variable {}: invalid geometry {}x{} at ({}, {})",
                    i, capsule.width, capsule.height, capsule.x, capsule.y
                );
            }
            Ok(capsule) if !seen.insert(capsule.id().to_string()) => {
                warn!("Skipping positioned variable {}: duplicate id {}", i, capsule.id());
            }
            Ok(capsule) => capsules.push(capsule),
            Err(e) => warn!("Skipping positioned variable {}: {}", i, e),
        }
    }
    capsules
}

/// Finite position and a positive, finite size.
fn has_valid_geometry(capsule: &CanvasCapsule) -> bool {
    capsule.x.is_finite()
        && capsule.y.is_finite()
        && capsule.width.is_finite()
        && capsule.height.is_finite()
        && capsule.width > 0.0
        && capsule.height > 0.0
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableType;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_default_is_empty() {
        let state = PersistedState::default();
        assert!(state.document_tree.is_none());
        assert!(state.positioned_variables.is_empty());
        assert!(state.last_saved_at.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let state = PersistedState {
            document_tree: Some(json!({ "type": "doc", "content": [] })),
            positioned_variables: Vec::new(),
            last_saved_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        };
        let value: Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(value["documentTree"]["type"], "doc");
        assert!(value["positionedVariables"].is_array());
        assert_eq!(value["lastSavedAt"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_parse_full_state() {
        let json = r#"{
            "documentTree": { "type": "doc", "content": [] },
            "positionedVariables": [
                { "id": "a", "type": "date", "label": "Due", "helpText": "", "value": "2024-01-01",
                  "x": 20, "y": 20, "width": 200, "height": 32 }
            ],
            "lastSavedAt": "2024-05-01T12:00:00.000Z"
        }"#;
        let state = PersistedState::from_json(json).unwrap();
        assert!(state.document_tree.is_some());
        assert_eq!(state.positioned_variables.len(), 1);
        assert_eq!(state.positioned_variables[0].variable.kind, VariableType::Date);
        assert!(state.last_saved_at.is_some());
    }

    #[test]
    fn test_malformed_capsules_are_skipped() {
        let json = r#"{
            "positionedVariables": [
                { "id": "ok", "type": "text", "x": 1, "y": 2 },
                { "id": "no-position", "type": "text" },
                "not an object",
                { "type": "text", "x": 0, "y": 0 },
                { "id": "ok", "type": "text", "x": 5, "y": 5 }
            ]
        }"#;
        let state = PersistedState::from_json(json).unwrap();
        assert_eq!(state.positioned_variables.len(), 1);
        let capsule = &state.positioned_variables[0];
        assert_eq!(capsule.id(), "ok");
        assert_eq!((capsule.width, capsule.height), (200.0, 32.0));
    }

    #[test]
    fn test_capsules_without_positive_size_are_skipped() {
        let json = r#"{
            "positionedVariables": [
                { "id": "neg", "type": "text", "x": 20, "y": 20, "width": -50, "height": -10 },
                { "id": "flat", "type": "text", "x": 20, "y": 60, "height": 0 },
                { "id": "wide", "type": "text", "x": 20, "y": 100, "width": 5000 }
            ]
        }"#;
        let state = PersistedState::from_json(json).unwrap();
        let ids: Vec<&str> = state.positioned_variables.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["wide"]);
    }

    #[test]
    fn test_non_array_variables_become_empty() {
        let state = PersistedState::from_json(r#"{ "positionedVariables": { "a": 1 } }"#).unwrap();
        assert!(state.positioned_variables.is_empty());
    }

    #[test]
    fn test_bad_timestamp_is_ignored() {
        let state = PersistedState::from_json(r#"{ "lastSavedAt": "yesterday" }"#).unwrap();
        assert!(state.last_saved_at.is_none());
    }

    #[test]
    fn test_unknown_variable_type_degrades_to_text() {
        let json = r#"{ "positionedVariables": [{ "id": "a", "type": "number", "x": 0, "y": 0 }] }"#;
        let state = PersistedState::from_json(json).unwrap();
        assert_eq!(state.positioned_variables[0].variable.kind, VariableType::Text);
    }

    #[test]
    fn test_invalid_json_and_non_object_fail() {
        assert!(matches!(
            PersistedState::from_json("{ nope"),
            Err(Error::StateParse { .. })
        ));
        assert!(matches!(
            PersistedState::from_json("[1, 2]"),
            Err(Error::StateParse { .. })
        ));
    }

    #[test]
    fn test_available_variables_strip_positions() {
        let json = r#"{ "positionedVariables": [{ "id": "a", "label": "Name", "x": 3, "y": 4 }] }"#;
        let state = PersistedState::from_json(json).unwrap();
        let vars = state.available_variables();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].label, "Name");
    }
}
