//! Mission-space exploration: branch-path enumeration over a command
//! sequence, parameter domains derived from missions, and root-cause
//! narrowing of failing domains.

pub mod domain;
pub mod narrow;
pub mod paths;

pub use domain::MissionDomain;
pub use narrow::{LabelError, MissionLabeller, NarrowError, RootCauseNarrower};
pub use paths::{enumerate_paths, BranchPath};
