use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Runtime values of state variables, parameters, and environment constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Human-readable name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Num(_) => "num",
            Value::Str(_) => "str",
        }
    }
}

/// Semantic type of a state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarType {
    Bool,
    Num,
    Str,
}

impl VarType {
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (VarType::Bool, Value::Bool(_))
                | (VarType::Num, Value::Num(_))
                | (VarType::Str, Value::Str(_))
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("negative noise tolerance for variable '{name}': {noise}")]
    NegativeNoise { name: String, noise: f64 },

    #[error("noise tolerance declared for non-numeric variable '{name}'")]
    NoiseOnNonNumeric { name: String },

    #[error("duplicate variable declaration: '{name}'")]
    DuplicateVariable { name: String },
}

/// A declared state variable: name, semantic type, and optional noise
/// tolerance for measurements of it.
///
/// Immutable after registration in a [`VariableSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateVariable {
    name: String,
    var_type: VarType,
    noise: Option<f64>,
}

impl StateVariable {
    pub fn new(name: &str, var_type: VarType, noise: Option<f64>) -> Result<Self, SchemaError> {
        if let Some(n) = noise {
            if n < 0.0 {
                return Err(SchemaError::NegativeNoise {
                    name: name.to_string(),
                    noise: n,
                });
            }
            if var_type != VarType::Num {
                return Err(SchemaError::NoiseOnNonNumeric {
                    name: name.to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            var_type,
            noise,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    /// The inherent measurement noise, if any.
    pub fn noise(&self) -> Option<f64> {
        self.noise
    }

    pub fn is_noisy(&self) -> bool {
        self.noise.is_some()
    }

    /// Whether two measurements of this variable are considered equal.
    ///
    /// Numeric variables with a declared tolerance compare within it;
    /// everything else compares exactly (type and value).
    pub fn eq(&self, x: &Value, y: &Value) -> bool {
        match (self.noise, x, y) {
            (Some(eps), Value::Num(a), Value::Num(b)) => (a - b).abs() <= eps,
            _ => x == y,
        }
    }

    pub fn neq(&self, x: &Value, y: &Value) -> bool {
        !self.eq(x, y)
    }
}

/// Ordered, immutable registry of the state variables a system declares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableSchema {
    variables: BTreeMap<String, StateVariable>,
}

impl VariableSchema {
    pub fn new(variables: Vec<StateVariable>) -> Result<Self, SchemaError> {
        let mut map = BTreeMap::new();
        for v in variables {
            if map.contains_key(v.name()) {
                return Err(SchemaError::DuplicateVariable {
                    name: v.name().to_string(),
                });
            }
            map.insert(v.name().to_string(), v);
        }
        Ok(Self { variables: map })
    }

    pub fn variable(&self, name: &str) -> Option<&StateVariable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("variable '{name}' could not be read: {reason}")]
    ReadFailed { name: String, reason: String },

    #[error("variable '{name}' read as {actual}, declared as {declared}")]
    TypeMismatch {
        name: String,
        actual: &'static str,
        declared: &'static str,
    },
}

/// Capability for reading the current value of a named state variable
/// from some concrete telemetry backend.
///
/// One implementation per backend replaces the original design of
/// embedding an arbitrary getter closure in every variable.
pub trait Sampler {
    fn read(&self, variable: &str) -> Result<Value, SampleError>;
}

/// A snapshot of the system at one moment, in terms of its declared
/// state variables. Immutable; sampling produces a new `State`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    variables: BTreeMap<String, Value>,
    time_offset: f64,
}

impl State {
    /// Construct a state directly from recorded values (e.g. a trace file).
    pub fn from_values(variables: BTreeMap<String, Value>, time_offset: f64) -> Self {
        Self {
            variables,
            time_offset,
        }
    }

    /// Capture one snapshot by reading every declared variable through
    /// the sampler. The resulting variable set is exactly the schema's.
    pub fn sample(
        schema: &VariableSchema,
        source: &dyn Sampler,
        time_offset: f64,
    ) -> Result<Self, SampleError> {
        let mut variables = BTreeMap::new();
        for name in schema.names() {
            let declared = schema.variable(name).map(|v| v.var_type());
            let value = source.read(name)?;
            if let Some(t) = declared {
                if !t.matches(&value) {
                    return Err(SampleError::TypeMismatch {
                        name: name.to_string(),
                        actual: value.type_name(),
                        declared: match t {
                            VarType::Bool => "bool",
                            VarType::Num => "num",
                            VarType::Str => "str",
                        },
                    });
                }
            }
            variables.insert(name.to_string(), value);
        }
        Ok(Self {
            variables,
            time_offset,
        })
    }

    pub fn read(&self, variable: &str) -> Option<&Value> {
        self.variables.get(variable)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    /// Whether this state's variable set is exactly the schema's.
    pub fn conforms_to(&self, schema: &VariableSchema) -> bool {
        self.variables.len() == schema.len()
            && self.variables.keys().all(|name| schema.contains(name))
    }
}

/// Constants describing the environment a mission runs in. Immutable,
/// scoped to the mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    constants: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new(constants: BTreeMap<String, Value>) -> Self {
        Self { constants }
    }

    pub fn read(&self, constant: &str) -> Option<&Value> {
        self.constants.get(constant)
    }

    pub fn constants(&self) -> &BTreeMap<String, Value> {
        &self.constants
    }
}

/// Physical constants used by timeout formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub time_per_metre_travelled: f64,
    pub constant_timeout_offset: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            time_per_metre_travelled: 1.0,
            constant_timeout_offset: 1.0,
        }
    }
}
