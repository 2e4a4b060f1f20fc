//! Data model for noise-aware differential testing of control software:
//! typed state variables with measurement tolerances, immutable state
//! snapshots, parameter ranges, missions, and recorded traces.

pub mod mission;
pub mod range;
pub mod state;

pub use mission::{stable_hash, Command, CommandTrace, Mission, MissionTrace};
pub use range::{Parameter, ValueRange};
pub use state::{
    Configuration, Environment, Sampler, State, StateVariable, Value, VariableSchema,
};
