//! Sampling a state through the schema from a telemetry backend stub.

use std::collections::BTreeMap;

use kestrel_model::state::{SampleError, StateVariable, VarType};
use kestrel_model::{Sampler, State, Value, VariableSchema};

struct MapBackend {
    readings: BTreeMap<String, Value>,
}

impl Sampler for MapBackend {
    fn read(&self, variable: &str) -> Result<Value, SampleError> {
        self.readings
            .get(variable)
            .cloned()
            .ok_or_else(|| SampleError::ReadFailed {
                name: variable.to_string(),
                reason: "no such telemetry stream".to_string(),
            })
    }
}

fn schema() -> VariableSchema {
    VariableSchema::new(vec![
        StateVariable::new("armed", VarType::Bool, None).unwrap(),
        StateVariable::new("altitude", VarType::Num, Some(0.5)).unwrap(),
        StateVariable::new("mode", VarType::Str, None).unwrap(),
    ])
    .unwrap()
}

fn backend() -> MapBackend {
    let mut readings = BTreeMap::new();
    readings.insert("armed".to_string(), Value::Bool(true));
    readings.insert("altitude".to_string(), Value::Num(9.8));
    readings.insert("mode".to_string(), Value::Str("GUIDED".to_string()));
    MapBackend { readings }
}

#[test]
fn sampled_state_covers_the_schema_exactly() {
    let schema = schema();
    let state = State::sample(&schema, &backend(), 4.2).unwrap();
    assert!(state.conforms_to(&schema));
    assert_eq!(state.time_offset(), 4.2);
    assert_eq!(state.read("altitude"), Some(&Value::Num(9.8)));
}

#[test]
fn unreadable_variable_fails_the_sample() {
    let schema = schema();
    let mut backend = backend();
    backend.readings.remove("mode");
    assert!(matches!(
        State::sample(&schema, &backend, 0.0),
        Err(SampleError::ReadFailed { .. })
    ));
}

#[test]
fn type_mismatch_fails_the_sample() {
    let schema = schema();
    let mut backend = backend();
    backend
        .readings
        .insert("armed".to_string(), Value::Num(1.0));
    assert!(matches!(
        State::sample(&schema, &backend, 0.0),
        Err(SampleError::TypeMismatch { .. })
    ));
}

#[test]
fn extra_recorded_variable_breaks_conformance() {
    let schema = schema();
    let state = State::sample(&schema, &backend(), 0.0).unwrap();
    let mut vars = state.variables().clone();
    vars.insert("vz".to_string(), Value::Num(0.0));
    let widened = State::from_values(vars, 0.0);
    assert!(!widened.conforms_to(&schema));
}
