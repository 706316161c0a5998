//! Unit tests for parameter sets and schemas

use rl_lab_controller::{
    ErrorKind, LabError, ParameterSchema, ParameterSet, ParameterType, ParameterValue,
};
use serde_json::json;

fn schema() -> ParameterSchema {
    serde_json::from_value(json!({
        "learning_rate": {
            "type": "float", "default": 0.1, "min": 0.0, "max": 1.0,
            "description": "Step size"
        },
        "num_episodes": {
            "type": "int", "default": 1000, "min": 1, "max": 50000,
            "description": "Episodes to train"
        },
        "init_strategy": {
            "type": "string", "default": "zeros", "options": ["zeros", "random"],
            "description": "Q-table initialization"
        }
    }))
    .expect("schema")
}

fn rejected_parameter(result: rl_lab_controller::Result<()>) -> String {
    match result {
        Err(LabError::Validation { parameter, .. }) => parameter,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_schema_parses_engine_shape() {
    let schema = schema();
    let spec = schema.get("learning_rate").expect("spec");
    assert_eq!(spec.kind, ParameterType::Float);
    assert_eq!(spec.max, Some(1.0));
    assert_eq!(spec.description, "Step size");
    assert_eq!(
        schema.get("init_strategy").and_then(|s| s.options.clone()),
        Some(vec!["zeros".to_string(), "random".to_string()])
    );
}

#[test]
fn test_schema_defaults() {
    let defaults = schema().defaults();
    assert_eq!(defaults.len(), 3);
    assert_eq!(defaults.num_episodes(), Some(1000));
    assert_eq!(
        defaults.get("init_strategy"),
        Some(&ParameterValue::Text("zeros".to_string()))
    );
    assert!(defaults.validate_against(&schema()).is_ok());
}

#[test]
fn test_validate_against_bounds_and_types() {
    let schema = schema();
    let defaults = schema.defaults();

    let too_high = defaults.clone().with("learning_rate", 1.5);
    assert_eq!(rejected_parameter(too_high.validate_against(&schema)), "learning_rate");

    let fractional = defaults.clone().with("num_episodes", 10.5);
    assert_eq!(rejected_parameter(fractional.validate_against(&schema)), "num_episodes");

    let wrong_type = defaults.clone().with("learning_rate", "fast");
    assert_eq!(rejected_parameter(wrong_type.validate_against(&schema)), "learning_rate");

    let bad_option = defaults.clone().with("init_strategy", "ones");
    assert_eq!(rejected_parameter(bad_option.validate_against(&schema)), "init_strategy");

    // Integral floats are accepted where ints are declared
    let integral = defaults.clone().with("num_episodes", 200.0);
    assert!(integral.validate_against(&schema).is_ok());

    // Parameters the schema does not describe pass through
    let extra = defaults.with("epsilon_decay", 0.99);
    assert!(extra.validate_against(&schema).is_ok());
}

#[test]
fn test_validate_without_schema() {
    assert!(ParameterSet::new().validate().is_ok());
    assert!(ParameterSet::new().with("num_episodes", 5_i64).validate().is_ok());

    let err = ParameterSet::new()
        .with("num_episodes", -3_i64)
        .validate()
        .expect_err("negative");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        "Invalid parameter 'num_episodes': must be a positive integer"
    );

    let err = ParameterSet::new()
        .with("gamma", f64::NAN)
        .validate()
        .expect_err("nan");
    assert_eq!(rejected_parameter(Err(err)), "gamma");
}

#[test]
fn test_num_episodes_reading() {
    assert_eq!(ParameterSet::new().num_episodes(), None);
    assert_eq!(ParameterSet::new().with("num_episodes", 0_i64).num_episodes(), None);
    assert_eq!(ParameterSet::new().with("num_episodes", 300.0).num_episodes(), Some(300));
    assert_eq!(ParameterSet::new().with("num_episodes", "many").num_episodes(), None);
}

#[test]
fn test_parse_cli_values() {
    assert_eq!(ParameterValue::parse("500"), ParameterValue::Int(500));
    assert_eq!(ParameterValue::parse("0.25"), ParameterValue::Float(0.25));
    assert_eq!(
        ParameterValue::parse("random"),
        ParameterValue::Text("random".to_string())
    );
}

#[test]
fn test_parameter_set_serializes_flat() {
    let set = ParameterSet::new()
        .with("alpha", 0.5)
        .with("num_episodes", 100_i64)
        .with("policy", "greedy");
    assert_eq!(
        serde_json::to_value(&set).expect("serialize"),
        json!({"alpha": 0.5, "num_episodes": 100, "policy": "greedy"})
    );
}
