use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{Configuration, Environment, State, Value};

/// A concrete, parameterized unit of behaviour within a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    kind: String,
    parameters: BTreeMap<String, Value>,
}

impl Command {
    pub fn new(kind: &str, parameters: BTreeMap<String, Value>) -> Self {
        Self {
            kind: kind.to_string(),
            parameters,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }
}

/// A configuration, environment, initial state, and ordered command
/// sequence to execute. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    configuration: Configuration,
    environment: Environment,
    initial_state: State,
    commands: Vec<Command>,
}

impl Mission {
    pub fn new(
        configuration: Configuration,
        environment: Environment,
        initial_state: State,
        commands: Vec<Command>,
    ) -> Self {
        Self {
            configuration,
            environment,
            initial_state,
            commands,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Content-derived identity, stable across processes. Used for trace
    /// file naming. Distinct missions must never share an ident, so a
    /// serialization failure falls back to the Debug form rather than a
    /// constant.
    pub fn ident(&self) -> String {
        let bytes = match serde_json::to_vec(self) {
            Ok(bytes) => bytes,
            Err(_) => format!("{self:?}").into_bytes(),
        };
        format!("{:016x}", stable_hash(&bytes))
    }
}

/// FNV-1a. `DefaultHasher` is not guaranteed stable across processes, and
/// trace filenames must be reproducible between runs.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// One command and the ordered states sampled during and after its
/// execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTrace {
    command: Command,
    states: Vec<State>,
}

impl CommandTrace {
    pub fn new(command: Command, states: Vec<State>) -> Self {
        Self { command, states }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn first_state(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn final_state(&self) -> Option<&State> {
        self.states.last()
    }
}

/// The recorded execution of a whole mission: one [`CommandTrace`] per
/// mission command, positionally aligned with the command sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionTrace {
    traces: Vec<CommandTrace>,
}

impl MissionTrace {
    pub fn new(traces: Vec<CommandTrace>) -> Self {
        Self { traces }
    }

    pub fn traces(&self) -> &[CommandTrace] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}
