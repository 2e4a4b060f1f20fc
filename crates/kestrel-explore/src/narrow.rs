//! Root-cause narrowing: shrink a failing mission domain by pinning the
//! parameter dimensions whose variation does not affect the failure.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use kestrel_model::Mission;

use crate::domain::MissionDomain;

/// A labeller could not produce a verdict for a mission.
#[derive(Debug, thiserror::Error)]
#[error("labelling failed: {message}")]
pub struct LabelError {
    pub message: String,
}

impl LabelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NarrowError {
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Capability to decide whether a concrete mission exhibits the failure
/// under investigation. `true` means failing.
pub trait MissionLabeller {
    fn label(&mut self, mission: &Mission) -> Result<bool, LabelError>;
}

/// Iterative domain shrinker. Best effort: the narrowed domain is sound
/// only to the extent the sampled probes are representative; termination
/// is guaranteed by the label budget and by the singleton fixpoint.
#[derive(Debug, Clone)]
pub struct RootCauseNarrower {
    label_budget: usize,
    probes_per_dimension: usize,
    seed: u64,
}

impl RootCauseNarrower {
    pub fn new(label_budget: usize, probes_per_dimension: usize, seed: u64) -> Self {
        Self {
            label_budget,
            probes_per_dimension,
            seed,
        }
    }

    /// Narrow `domain` to a sub-domain that still fails everywhere the
    /// probes looked. Each pass walks every still-free dimension and pins
    /// it to a sampled value; the pin is kept only when every probe drawn
    /// from the pinned domain still fails. Stops at a fixpoint (a pass
    /// that pins nothing) or when the label budget runs out.
    pub fn narrow(
        &self,
        domain: &MissionDomain,
        labeller: &mut dyn MissionLabeller,
    ) -> Result<MissionDomain, NarrowError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut current = domain.clone();
        let mut remaining = self.label_budget;

        loop {
            let mut pinned_this_pass = false;

            for command_index in 0..current.entries().len() {
                let free: Vec<String> = current.entries()[command_index]
                    .1
                    .iter()
                    .filter(|p| !is_pinned(p))
                    .map(|p| p.name().to_string())
                    .collect();

                for name in free {
                    if remaining < self.probes_per_dimension {
                        info!(free = current.free_dimensions(), "label budget exhausted");
                        return Ok(current);
                    }

                    // Pin the dimension to a value drawn from a witness
                    // sample, then check the failure survives resampling of
                    // every other dimension.
                    let witness = current.sample_mission(&mut rng);
                    let Some(value) = witness.commands()[command_index].parameter(&name) else {
                        continue;
                    };
                    let Some(candidate) =
                        current.with_singleton(command_index, &name, value.clone())
                    else {
                        continue;
                    };

                    let mut all_failing = true;
                    for _ in 0..self.probes_per_dimension {
                        remaining -= 1;
                        let probe = candidate.sample_mission(&mut rng);
                        if !labeller.label(&probe)? {
                            all_failing = false;
                            break;
                        }
                    }

                    if all_failing {
                        debug!(command_index, parameter = %name, "dimension pinned");
                        current = candidate;
                        pinned_this_pass = true;
                    }
                }
            }

            if !pinned_this_pass || current.free_dimensions() == 0 {
                info!(free = current.free_dimensions(), "narrowing reached fixpoint");
                return Ok(current);
            }
        }
    }
}

fn is_pinned(param: &kestrel_model::Parameter) -> bool {
    match param.range() {
        kestrel_model::ValueRange::Discrete { values } => values.len() == 1,
        kestrel_model::ValueRange::Continuous { min, max, .. } => min == max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use kestrel_model::{Command, Configuration, Environment, State, Value};
    use kestrel_spec::copter;

    fn mission() -> Mission {
        let mut vars = BTreeMap::new();
        vars.insert("altitude".to_string(), Value::Num(0.2));
        let initial = State::from_values(vars, 0.0);

        let arm = Command::new("arm", BTreeMap::new());
        let mut p = BTreeMap::new();
        p.insert("altitude".to_string(), Value::Num(10.0));
        let takeoff = Command::new("takeoff", p);
        let mut p = BTreeMap::new();
        p.insert("latitude".to_string(), Value::Num(-35.36));
        p.insert("longitude".to_string(), Value::Num(149.16));
        p.insert("altitude".to_string(), Value::Num(20.0));
        let goto = Command::new("goto", p);

        Mission::new(
            Configuration::default(),
            Environment::default(),
            initial,
            vec![arm, takeoff, goto],
        )
    }

    /// Fails for every mission: every dimension is irrelevant, so the
    /// narrower should pin them all.
    struct AlwaysFailing {
        calls: usize,
    }

    impl MissionLabeller for AlwaysFailing {
        fn label(&mut self, _mission: &Mission) -> Result<bool, LabelError> {
            self.calls += 1;
            Ok(true)
        }
    }

    /// Fails only when the takeoff altitude is above 50: that dimension is
    /// load-bearing and must stay free.
    struct AltitudeSensitive;

    impl MissionLabeller for AltitudeSensitive {
        fn label(&mut self, mission: &Mission) -> Result<bool, LabelError> {
            let alt = mission.commands()[1]
                .parameter("altitude")
                .and_then(|v| v.as_num())
                .ok_or_else(|| LabelError::new("takeoff altitude missing"))?;
            Ok(alt > 50.0)
        }
    }

    #[test]
    fn test_irrelevant_dimensions_are_pinned() {
        let library = copter::spec_library().unwrap();
        let domain = MissionDomain::from_mission(&mission(), &library, false).unwrap();
        assert_eq!(domain.free_dimensions(), 4);

        let narrower = RootCauseNarrower::new(500, 5, 11);
        let mut labeller = AlwaysFailing { calls: 0 };
        let narrowed = narrower.narrow(&domain, &mut labeller).unwrap();
        assert_eq!(narrowed.free_dimensions(), 0);
        assert!(labeller.calls <= 500);
    }

    #[test]
    fn test_load_bearing_dimension_survives() {
        let library = copter::spec_library().unwrap();
        let domain = MissionDomain::from_mission(&mission(), &library, false).unwrap();

        let narrower = RootCauseNarrower::new(2_000, 8, 23);
        let narrowed = narrower.narrow(&domain, &mut AltitudeSensitive).unwrap();

        // Whatever got pinned, the narrowed domain must still contain
        // failing missions.
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut labeller = AltitudeSensitive;
        let mut saw_failing = false;
        for _ in 0..50 {
            let probe = narrowed.sample_mission(&mut rng);
            if labeller.label(&probe).unwrap() {
                saw_failing = true;
                break;
            }
        }
        assert!(saw_failing);
    }

    #[test]
    fn test_budget_bounds_label_calls() {
        let library = copter::spec_library().unwrap();
        let domain = MissionDomain::from_mission(&mission(), &library, false).unwrap();

        let narrower = RootCauseNarrower::new(10, 5, 7);
        let mut labeller = AlwaysFailing { calls: 0 };
        narrower.narrow(&domain, &mut labeller).unwrap();
        assert!(labeller.calls <= 10);
    }

    #[test]
    fn test_label_error_propagates() {
        struct Broken;
        impl MissionLabeller for Broken {
            fn label(&mut self, _mission: &Mission) -> Result<bool, LabelError> {
                Err(LabelError::new("sandbox unreachable"))
            }
        }

        let library = copter::spec_library().unwrap();
        let domain = MissionDomain::from_mission(&mission(), &library, false).unwrap();
        let narrower = RootCauseNarrower::new(100, 3, 1);
        assert!(matches!(
            narrower.narrow(&domain, &mut Broken),
            Err(NarrowError::Label(_))
        ));
    }
}
