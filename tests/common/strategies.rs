use proptest::prelude::*;
use serde_json::{json, Value};

use golem_dispatch::ParameterMap;

/// Strategy for numeric parameter values, integral or fractional
pub fn numeric_value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..200).prop_map(f64::from),
        (0.0f64..200.0),
    ]
}

/// Strategy for prompts
pub fn prompt_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.]{1,64}"
}

/// Strategy for an optional parameter tier holding the three caller fields
pub fn parameter_tier_strategy() -> impl Strategy<Value = ParameterMap> {
    (
        prop::option::of(prompt_strategy()),
        prop::option::of(numeric_value_strategy()),
        prop::option::of(numeric_value_strategy()),
    )
        .prop_map(|(prompt, length, guidance)| {
            let mut tier = ParameterMap::new();
            if let Some(prompt) = prompt {
                tier.insert("prompt".into(), Value::String(prompt));
            }
            if let Some(length) = length {
                tier.insert("length_in_seconds".into(), json!(length));
            }
            if let Some(guidance) = guidance {
                tier.insert("guidance_scale".into(), json!(guidance));
            }
            tier
        })
}
