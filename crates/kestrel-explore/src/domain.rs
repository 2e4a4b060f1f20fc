//! Parameter domains over a fixed command sequence: the space of
//! missions that share one mission's structure.

use std::collections::BTreeMap;

use rand::Rng;

use kestrel_model::{
    Command, Configuration, Environment, Mission, Parameter, State, Value, ValueRange,
};
use kestrel_spec::{SpecError, SpecLibrary};

/// The space of missions with a fixed configuration, environment, initial
/// state, and command-kind sequence, varying only in parameter values.
#[derive(Debug, Clone)]
pub struct MissionDomain {
    configuration: Configuration,
    environment: Environment,
    initial_state: State,
    entries: Vec<(String, Vec<Parameter>)>,
}

impl MissionDomain {
    /// Derive a domain from a concrete mission. With `discrete` set, each
    /// parameter collapses to the singleton value that mission used;
    /// otherwise each parameter carries its full specified range.
    pub fn from_mission(
        mission: &Mission,
        library: &SpecLibrary,
        discrete: bool,
    ) -> Result<Self, SpecError> {
        let mut entries = Vec::with_capacity(mission.commands().len());
        for command in mission.commands() {
            let spec = library.spec(command.kind())?;
            let parameters = if discrete {
                command
                    .parameters()
                    .iter()
                    .map(|(name, value)| {
                        Parameter::new(name, ValueRange::singleton(value.clone()))
                    })
                    .collect()
            } else {
                spec.parameters().to_vec()
            };
            entries.push((command.kind().to_string(), parameters));
        }
        Ok(Self {
            configuration: mission.configuration().clone(),
            environment: mission.environment().clone(),
            initial_state: mission.initial_state().clone(),
            entries,
        })
    }

    pub fn entries(&self) -> &[(String, Vec<Parameter>)] {
        &self.entries
    }

    /// Count of parameters whose range is not yet a singleton.
    pub fn free_dimensions(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|(_, params)| params.iter())
            .filter(|p| !is_singleton(p.range()))
            .count()
    }

    /// A copy with one command's parameter pinned to a single value.
    /// `None` when the command index or parameter name does not exist.
    pub fn with_singleton(
        &self,
        command_index: usize,
        parameter: &str,
        value: Value,
    ) -> Option<Self> {
        let (_, params) = self.entries.get(command_index)?;
        params.iter().find(|p| p.name() == parameter)?;

        let mut pinned = self.clone();
        let (_, params) = &mut pinned.entries[command_index];
        *params = params
            .iter()
            .map(|p| {
                if p.name() == parameter {
                    Parameter::new(p.name(), ValueRange::singleton(value.clone()))
                } else {
                    p.clone()
                }
            })
            .collect();
        Some(pinned)
    }

    /// Draw one concrete mission from the domain.
    pub fn sample_mission<R: Rng + ?Sized>(&self, rng: &mut R) -> Mission {
        let commands = self
            .entries
            .iter()
            .map(|(kind, params)| {
                let mut args = BTreeMap::new();
                for param in params {
                    args.insert(param.name().to_string(), param.sample(rng));
                }
                Command::new(kind, args)
            })
            .collect();
        Mission::new(
            self.configuration.clone(),
            self.environment.clone(),
            self.initial_state.clone(),
            commands,
        )
    }

    /// Membership: same command-kind sequence, same parameter names, every
    /// value inside its range.
    pub fn is_valid(&self, mission: &Mission) -> bool {
        if mission.commands().len() != self.entries.len() {
            return false;
        }
        for (command, (kind, params)) in mission.commands().iter().zip(&self.entries) {
            if command.kind() != kind || command.parameters().len() != params.len() {
                return false;
            }
            for param in params {
                match command.parameter(param.name()) {
                    Some(value) if param.range().is_valid(value) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

fn is_singleton(range: &ValueRange) -> bool {
    match range {
        ValueRange::Discrete { values } => values.len() == 1,
        ValueRange::Continuous { min, max, .. } => min == max,
    }
}
