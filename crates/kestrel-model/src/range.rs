use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::Value;

#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    #[error("discrete range has no values")]
    EmptyDiscrete,

    #[error("discrete range mixes value types")]
    MixedDiscrete,

    #[error("continuous range is inverted: min={min}, max={max}")]
    Inverted { min: f64, max: f64 },
}

/// The domain of a command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueRange {
    /// A finite set of admissible values (numbers or enumerations).
    Discrete { values: Vec<Value> },
    /// A real interval. `inclusive` controls whether `max` itself is a
    /// member.
    Continuous { min: f64, max: f64, inclusive: bool },
}

impl ValueRange {
    pub fn discrete(values: Vec<Value>) -> Result<Self, RangeError> {
        if values.is_empty() {
            return Err(RangeError::EmptyDiscrete);
        }
        let first = values[0].type_name();
        if values.iter().any(|v| v.type_name() != first) {
            return Err(RangeError::MixedDiscrete);
        }
        Ok(ValueRange::Discrete { values })
    }

    pub fn continuous(min: f64, max: f64, inclusive: bool) -> Result<Self, RangeError> {
        if min > max {
            return Err(RangeError::Inverted { min, max });
        }
        Ok(ValueRange::Continuous {
            min,
            max,
            inclusive,
        })
    }

    /// A range holding exactly one value.
    pub fn singleton(value: Value) -> Self {
        ValueRange::Discrete {
            values: vec![value],
        }
    }

    /// Uniformly draw one value from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            ValueRange::Discrete { values } => {
                let i = rng.gen_range(0..values.len());
                values[i].clone()
            }
            ValueRange::Continuous {
                min,
                max,
                inclusive,
            } => {
                if min == max {
                    return Value::Num(*min);
                }
                let v = if *inclusive {
                    rng.gen_range(*min..=*max)
                } else {
                    rng.gen_range(*min..*max)
                };
                Value::Num(v)
            }
        }
    }

    /// Membership check.
    pub fn is_valid(&self, value: &Value) -> bool {
        match self {
            ValueRange::Discrete { values } => values.contains(value),
            ValueRange::Continuous {
                min,
                max,
                inclusive,
            } => match value {
                Value::Num(v) => {
                    if *inclusive {
                        *min <= *v && *v <= *max
                    } else {
                        *min <= *v && *v < *max
                    }
                }
                _ => false,
            },
        }
    }
}

/// A named command parameter and its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    range: ValueRange,
}

impl Parameter {
    pub fn new(name: &str, range: ValueRange) -> Self {
        Self {
            name: name.to_string(),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &ValueRange {
        &self.range
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        self.range.sample(rng)
    }
}
