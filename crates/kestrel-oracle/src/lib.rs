//! Trace oracle: validates recorded mission runs against the command
//! specifications and classifies mutant traces against the validated
//! ground truth.

pub mod filter;
pub mod matching;
pub mod trace_file;
pub mod validate;

pub use filter::{filter_truth_pool, write_valid_list};
pub use matching::{matches_ground_truth, OracleError};
pub use trace_file::{load_trace_file, MalformedTraceFile, TraceFile};
pub use validate::{is_ground_truth_valid, OracleContext, MIN_TRACE_STEPS};
