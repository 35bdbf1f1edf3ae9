//! # Command Payload Merger
//!
//! Builds the outbound command payload from three tiers of parameters,
//! lowest precedence first: built-in defaults, the stored configuration
//! group, and caller overrides. The merged map is then clamped, renamed to
//! the worker's schema, and stamped with forced fields.
//!
//! Every call constructs a fresh payload; inputs are never mutated, so a
//! stored configuration can be shared across concurrent dispatches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::config::{FieldClamp, PayloadConfig, PayloadPolicy};
use crate::error::{DispatchError, Result};

/// Named parameters as exchanged with callers and the config store
pub type ParameterMap = Map<String, Value>;

/// Parameters sent to the worker with a command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandPayload(ParameterMap);

impl CommandPayload {
    pub fn new(parameters: ParameterMap) -> Self {
        Self(parameters)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &ParameterMap {
        &self.0
    }

    pub fn into_map(self) -> ParameterMap {
        self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<ParameterMap> for CommandPayload {
    fn from(parameters: ParameterMap) -> Self {
        Self(parameters)
    }
}

impl PayloadPolicy {
    /// Whether caller-supplied `field` may override stored values
    pub fn accepts_override(&self, field: &str) -> bool {
        self.override_fields.is_empty() || self.override_fields.iter().any(|f| f == field)
    }
}

impl PayloadConfig {
    /// Build a payload from this configuration's defaults and policy
    pub fn build(
        &self,
        stored: Option<&ParameterMap>,
        overrides: &ParameterMap,
    ) -> Result<CommandPayload> {
        build_payload(&self.defaults, stored, overrides, &self.policy)
    }
}

/// Merge `defaults < stored < overrides`, then clamp, rename and force fields
///
/// `null` values in `stored` or `overrides` count as absent. Overrides for
/// fields outside the policy's whitelist are dropped. A clamped field that is
/// neither a number nor a numeric string is rejected with `InvalidParameter`.
pub fn build_payload(
    defaults: &ParameterMap,
    stored: Option<&ParameterMap>,
    overrides: &ParameterMap,
    policy: &PayloadPolicy,
) -> Result<CommandPayload> {
    let mut merged = defaults.clone();

    if let Some(stored) = stored {
        overlay(&mut merged, stored, |_| true);
    }
    overlay(&mut merged, overrides, |field| {
        let accepted = policy.accepts_override(field);
        if !accepted {
            debug!(field = %field, "Ignoring caller parameter outside override whitelist");
        }
        accepted
    });

    for clamp in &policy.clamps {
        apply_clamp(&mut merged, clamp)?;
    }

    for rename in &policy.renames {
        if let Some(value) = merged.remove(&rename.from) {
            merged.insert(rename.to.clone(), value);
        }
    }

    for (field, value) in &policy.forced {
        merged.insert(field.clone(), value.clone());
    }

    Ok(CommandPayload(merged))
}

fn overlay(base: &mut ParameterMap, tier: &ParameterMap, accept: impl Fn(&str) -> bool) {
    for (field, value) in tier {
        if value.is_null() || !accept(field) {
            continue;
        }
        base.insert(field.clone(), value.clone());
    }
}

fn apply_clamp(parameters: &mut ParameterMap, clamp: &FieldClamp) -> Result<()> {
    let Some(value) = parameters.get(&clamp.field) else {
        return Ok(());
    };

    let (current, normalized) = numeric_value(value).ok_or_else(|| {
        DispatchError::invalid_parameter(&clamp.field, format!("expected a number, got {value}"))
    })?;

    if current > clamp.max {
        parameters.insert(clamp.field.clone(), number_value(clamp.max));
    } else if let Some(normalized) = normalized {
        parameters.insert(clamp.field.clone(), normalized);
    }
    Ok(())
}

/// Numeric reading of `value`, plus a replacement when it was a numeric string
fn numeric_value(value: &Value) -> Option<(f64, Option<Value>)> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| (f, None)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                Some((int as f64, Some(Value::from(int))))
            } else {
                let float = trimmed.parse::<f64>().ok().filter(|f| f.is_finite())?;
                Some((float, Some(number_value(float))))
            }
        }
        _ => None,
    }
}

/// Integral values stay integers so workers see `30`, not `30.0`
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
