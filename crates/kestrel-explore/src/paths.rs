//! Depth-first enumeration of the branch paths a command sequence can
//! take: one branch choice per command, in order.

use kestrel_model::Command;
use kestrel_spec::{SpecError, SpecLibrary};

/// One branch choice per command, positionally aligned with the command
/// sequence. Stored as (command kind, branch name) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPath {
    steps: Vec<(String, String)>,
}

impl BranchPath {
    pub fn steps(&self) -> &[(String, String)] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// All branch paths through `commands`: the Cartesian product of each
/// command's branch set, enumerated depth-first in declaration order.
/// Reachability is not evaluated; structurally impossible paths are left
/// to downstream applicability checks.
pub fn enumerate_paths(
    commands: &[Command],
    library: &SpecLibrary,
) -> Result<Vec<BranchPath>, SpecError> {
    let mut paths = Vec::new();
    let mut prefix: Vec<(String, String)> = Vec::with_capacity(commands.len());
    dfs(commands, library, &mut prefix, &mut paths)?;
    Ok(paths)
}

fn dfs(
    commands: &[Command],
    library: &SpecLibrary,
    prefix: &mut Vec<(String, String)>,
    out: &mut Vec<BranchPath>,
) -> Result<(), SpecError> {
    let Some((command, rest)) = commands.split_first() else {
        out.push(BranchPath {
            steps: prefix.clone(),
        });
        return Ok(());
    };

    let spec = library.spec(command.kind())?;
    for branch in spec.branches() {
        prefix.push((command.kind().to_string(), branch.name().to_string()));
        dfs(rest, library, prefix, out)?;
        prefix.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use kestrel_model::Value;
    use kestrel_spec::copter;

    fn cmd(kind: &str) -> Command {
        Command::new(kind, BTreeMap::new())
    }

    fn takeoff() -> Command {
        let mut p = BTreeMap::new();
        p.insert("altitude".to_string(), Value::Num(10.0));
        Command::new("takeoff", p)
    }

    #[test]
    fn test_empty_sequence_has_one_empty_path() {
        let library = copter::spec_library().unwrap();
        let paths = enumerate_paths(&[], &library).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_empty());
    }

    #[test]
    fn test_cartesian_product_of_branch_sets() {
        let library = copter::spec_library().unwrap();
        // arm has 2 branches, takeoff 2, setmode 4.
        let commands = vec![cmd("arm"), takeoff(), cmd("setmode")];
        let paths = enumerate_paths(&commands, &library).unwrap();
        assert_eq!(paths.len(), 2 * 2 * 4);
        for path in &paths {
            assert_eq!(path.len(), 3);
            assert_eq!(path.steps()[0].0, "arm");
            assert_eq!(path.steps()[2].0, "setmode");
        }
    }

    #[test]
    fn test_enumeration_order_is_depth_first() {
        let library = copter::spec_library().unwrap();
        let commands = vec![cmd("arm"), takeoff()];
        let paths = enumerate_paths(&commands, &library).unwrap();
        let named: Vec<(&str, &str)> = paths
            .iter()
            .map(|p| (p.steps()[0].1.as_str(), p.steps()[1].1.as_str()))
            .collect();
        assert_eq!(
            named,
            vec![
                ("normal", "normal"),
                ("normal", "idle"),
                ("idle", "normal"),
                ("idle", "idle"),
            ]
        );
    }

    #[test]
    fn test_repeated_calls_are_independent() {
        let library = copter::spec_library().unwrap();
        let commands = vec![cmd("arm")];
        let first = enumerate_paths(&commands, &library).unwrap();
        let second = enumerate_paths(&commands, &library).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_unknown_command_is_error() {
        let library = copter::spec_library().unwrap();
        assert!(enumerate_paths(&[cmd("teleport")], &library).is_err());
    }
}
