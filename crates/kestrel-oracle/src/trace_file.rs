//! On-disk trace file: one JSON document per recorded mission run,
//! holding the mission and one command trace per executed command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kestrel_model::{CommandTrace, Mission, MissionTrace};

#[derive(Debug, thiserror::Error)]
pub enum MalformedTraceFile {
    #[error("failed to read trace file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse trace file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The recorded execution of one mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFile {
    mission: Mission,
    traces: Vec<CommandTrace>,
}

impl TraceFile {
    pub fn new(mission: Mission, traces: Vec<CommandTrace>) -> Self {
        Self { mission, traces }
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn traces(&self) -> &[CommandTrace] {
        &self.traces
    }

    pub fn mission_trace(&self) -> MissionTrace {
        MissionTrace::new(self.traces.clone())
    }

    /// Serialize to the on-disk JSON document.
    pub fn save(&self, path: &Path) -> Result<(), MalformedTraceFile> {
        let jsn = serde_json::to_string_pretty(self).map_err(|source| MalformedTraceFile::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, jsn).map_err(|source| MalformedTraceFile::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load and parse one trace file. A malformed file is rejected on its
/// own; callers continue with the remaining pool.
pub fn load_trace_file(path: &Path) -> Result<TraceFile, MalformedTraceFile> {
    let text = fs::read_to_string(path).map_err(|source| MalformedTraceFile::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| MalformedTraceFile::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use kestrel_model::{Command, Configuration, Environment, State, Value};

    fn sample_file() -> TraceFile {
        let mut vars = BTreeMap::new();
        vars.insert("altitude".to_string(), Value::Num(0.2));
        let initial = State::from_values(vars.clone(), 0.0);

        let mut params = BTreeMap::new();
        params.insert("altitude".to_string(), Value::Num(10.0));
        let takeoff = Command::new("takeoff", params);

        let mission = Mission::new(
            Configuration::default(),
            Environment::default(),
            initial.clone(),
            vec![takeoff.clone()],
        );

        let mut reached = vars;
        reached.insert("altitude".to_string(), Value::Num(10.1));
        let trace = CommandTrace::new(takeoff, vec![initial, State::from_values(reached, 9.8)]);
        TraceFile::new(mission, vec![trace])
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let file = sample_file();
        file.save(&path).unwrap();
        assert_eq!(load_trace_file(&path).unwrap(), file);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_trace_file(Path::new("/nonexistent/run.json")).unwrap_err();
        assert!(matches!(err, MalformedTraceFile::Io { .. }));
    }

    #[test]
    fn test_garbage_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_trace_file(&path).unwrap_err();
        assert!(matches!(err, MalformedTraceFile::Json { .. }));
    }

    #[test]
    fn test_document_shape() {
        let jsn = serde_json::to_value(sample_file()).unwrap();
        assert!(jsn["mission"]["commands"].is_array());
        assert_eq!(jsn["traces"][0]["command"]["type"], "takeoff");
        assert_eq!(
            jsn["traces"][0]["states"][1]["variables"]["altitude"],
            serde_json::json!(10.1)
        );
    }
}
