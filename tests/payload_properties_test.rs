mod common;

use common::strategies::*;
use proptest::prelude::*;
use serde_json::{json, Value};

use golem_dispatch::config::PayloadConfig;
use golem_dispatch::ParameterMap;

fn as_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

proptest! {
    /// Property: clamped fields never exceed their ceilings and values under the ceiling pass through
    #[test]
    fn clamped_fields_respect_ceilings(length in numeric_value_strategy(), guidance in numeric_value_strategy()) {
        let mut overrides = ParameterMap::new();
        overrides.insert("length_in_seconds".into(), json!(length));
        overrides.insert("guidance_scale".into(), json!(guidance));

        let payload = PayloadConfig::default().build(None, &overrides).unwrap();

        let seconds = as_f64(payload.get("seconds")).unwrap();
        let scale = as_f64(payload.get("guidance_scale")).unwrap();
        prop_assert_eq!(seconds, length.min(30.0));
        prop_assert_eq!(scale, guidance.min(5.0));
    }

    /// Property: the internal field name never reaches the worker and progress is always forced
    #[test]
    fn outbound_payload_uses_worker_schema(stored in parameter_tier_strategy(), overrides in parameter_tier_strategy()) {
        let payload = PayloadConfig::default().build(Some(&stored), &overrides).unwrap();

        prop_assert!(!payload.contains_key("length_in_seconds"));
        prop_assert!(payload.contains_key("seconds"));
        prop_assert!(payload.contains_key("guidance_scale"));
        prop_assert_eq!(payload.get("progress"), Some(&json!(true)));
    }

    /// Property: overrides win over stored values, which win over defaults
    #[test]
    fn merge_precedence_holds(stored in parameter_tier_strategy(), overrides in parameter_tier_strategy()) {
        let payload = PayloadConfig::default().build(Some(&stored), &overrides).unwrap();

        let expected_prompt = overrides.get("prompt").or_else(|| stored.get("prompt"));
        prop_assert_eq!(payload.get("prompt"), expected_prompt);

        let expected_length = as_f64(overrides.get("length_in_seconds"))
            .or_else(|| as_f64(stored.get("length_in_seconds")))
            .unwrap_or(10.0)
            .min(30.0);
        prop_assert_eq!(as_f64(payload.get("seconds")), Some(expected_length));

        let expected_scale = as_f64(overrides.get("guidance_scale"))
            .or_else(|| as_f64(stored.get("guidance_scale")))
            .unwrap_or(3.0)
            .min(5.0);
        prop_assert_eq!(as_f64(payload.get("guidance_scale")), Some(expected_scale));
    }

    /// Property: building a payload never mutates its inputs
    #[test]
    fn inputs_are_not_mutated(stored in parameter_tier_strategy(), overrides in parameter_tier_strategy()) {
        let stored_before = stored.clone();
        let overrides_before = overrides.clone();

        let _ = PayloadConfig::default().build(Some(&stored), &overrides).unwrap();

        prop_assert_eq!(stored, stored_before);
        prop_assert_eq!(overrides, overrides_before);
    }
}

#[test]
fn test_defaults_fill_absent_fields() {
    let mut overrides = ParameterMap::new();
    overrides.insert("prompt".into(), json!("x"));

    let payload = PayloadConfig::default().build(None, &overrides).unwrap();

    let expected = json!({
        "seconds": 10,
        "guidance_scale": 3,
        "prompt": "x",
        "progress": true
    });
    assert_eq!(payload.to_json(), expected);
}

#[test]
fn test_non_whitelisted_overrides_are_dropped() {
    let mut overrides = ParameterMap::new();
    overrides.insert("prompt".into(), json!("x"));
    overrides.insert("progress".into(), json!(false));
    overrides.insert("model".into(), json!("large"));

    let payload = PayloadConfig::default().build(None, &overrides).unwrap();

    assert_eq!(payload.get("progress"), Some(&json!(true)));
    assert!(!payload.contains_key("model"));
}
