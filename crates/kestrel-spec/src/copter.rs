//! Built-in specification library for a multirotor under guided control:
//! the variable schema and the arm/takeoff/setmode/goto command specs.
//!
//! Noise tolerances reflect sensor jitter observed on the real vehicle:
//! GPS position is trusted to roughly half a metre of latitude/longitude,
//! barometric altitude to half a metre, vertical speed to 0.3 m/s.

use kestrel_model::range::RangeError;
use kestrel_model::state::{SchemaError, StateVariable, VarType};
use kestrel_model::{Parameter, Value, ValueRange, VariableSchema};

use crate::branch::{Branch, Timeout};
use crate::engine::{CommandSpec, SpecLibrary};
use crate::geo;
use crate::parse::ParseError;

/// Failure while assembling the built-in library. Every predicate and
/// range below is a literal, so in practice this only fires when one is
/// edited incorrectly.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Extra headroom added to every derived takeoff/travel deadline, on top
/// of the distance-proportional term and the mission's constant offset.
const TIMEOUT_HEADROOM_SECS: f64 = 2.0;

/// The observable state of the vehicle.
pub fn variable_schema() -> Result<VariableSchema, SchemaError> {
    VariableSchema::new(vec![
        StateVariable::new("home_latitude", VarType::Num, Some(0.0005))?,
        StateVariable::new("home_longitude", VarType::Num, Some(0.0005))?,
        StateVariable::new("latitude", VarType::Num, Some(0.0005))?,
        StateVariable::new("longitude", VarType::Num, Some(0.0005))?,
        StateVariable::new("altitude", VarType::Num, Some(0.5))?,
        StateVariable::new("armable", VarType::Bool, None)?,
        StateVariable::new("armed", VarType::Bool, None)?,
        StateVariable::new("mode", VarType::Str, None)?,
        StateVariable::new("vz", VarType::Num, Some(0.3))?,
    ])
}

/// All command specifications for the copter.
pub fn spec_library() -> Result<SpecLibrary, LibraryError> {
    let mut lib = SpecLibrary::new();
    lib.register(arm_spec()?);
    lib.register(takeoff_spec()?);
    lib.register(setmode_spec()?);
    lib.register(goto_spec()?);
    Ok(lib)
}

fn arm_spec() -> Result<CommandSpec, LibraryError> {
    let normal = Branch::new(
        "normal",
        r#"(and (= _armable true) (= _armed false))"#,
        r#"(= __armed true)"#,
        Timeout::Fixed(5.0),
    )?;
    let idle = Branch::new(
        "idle",
        r#"(not (and (= _armable true) (= _armed false)))"#,
        r#"(= __armed _armed)"#,
        Timeout::Fixed(2.0),
    )?;
    Ok(CommandSpec::new("arm", vec![], vec![normal, idle]))
}

fn takeoff_spec() -> Result<CommandSpec, LibraryError> {
    let pre = r#"(and (= _armed true)
                      (= _mode "GUIDED")
                      (< _altitude 0.3)
                      (> $altitude _altitude)
                      (> $altitude 1.0))"#;

    let normal = Branch::new(
        "normal",
        pre,
        r#"(and (= _latitude __latitude)
                (= _longitude __longitude)
                (= __altitude $altitude)
                (= __vz 0.0))"#,
        Timeout::derived(|a| {
            geo::altitude_delta_metres(a.prior_num("altitude"), a.arg_num("altitude"))
                * a.config.time_per_metre_travelled
                + a.config.constant_timeout_offset
                + TIMEOUT_HEADROOM_SECS
        }),
    )?;

    // Climbs nowhere when already airborne, disarmed, or out of GUIDED.
    let idle = Branch::new(
        "idle",
        &format!("(not {pre})"),
        r#"(and (= __altitude _altitude) (= __armed _armed) (= __mode _mode))"#,
        Timeout::Fixed(2.0),
    )?;

    Ok(CommandSpec::new(
        "takeoff",
        vec![Parameter::new(
            "altitude",
            ValueRange::continuous(1.0, 100.0, false)?,
        )],
        vec![normal, idle],
    ))
}

fn setmode_spec() -> Result<CommandSpec, LibraryError> {
    let guided = Branch::new(
        "guided",
        r#"(= $mode "GUIDED")"#,
        r#"(= __mode "GUIDED")"#,
        Timeout::Fixed(5.0),
    )?;
    let loiter = Branch::new(
        "loiter",
        r#"(= $mode "LOITER")"#,
        r#"(= __mode "LOITER")"#,
        Timeout::Fixed(5.0),
    )?;

    // Return-to-launch flies back to the home point, descends, and
    // disarms.
    let rtl = Branch::new(
        "rtl",
        r#"(= $mode "RTL")"#,
        r#"(and (= __mode "RTL")
                (= __latitude _home_latitude)
                (= __longitude _home_longitude)
                (= __altitude 0.0)
                (= __armed false))"#,
        Timeout::derived(|a| {
            let travel = geo::great_circle_metres(
                a.prior_num("latitude"),
                a.prior_num("longitude"),
                a.prior_num("home_latitude"),
                a.prior_num("home_longitude"),
            );
            let descent = geo::altitude_delta_metres(a.prior_num("altitude"), 0.0);
            (travel + descent) * a.config.time_per_metre_travelled
                + a.config.constant_timeout_offset
                + TIMEOUT_HEADROOM_SECS
        }),
    )?;

    // Land descends in place.
    let land = Branch::new(
        "land",
        r#"(= $mode "LAND")"#,
        r#"(and (= __mode "LAND")
                (= __latitude _latitude)
                (= __longitude _longitude)
                (= __altitude 0.0)
                (= __armed false))"#,
        Timeout::derived(|a| {
            geo::altitude_delta_metres(a.prior_num("altitude"), 0.0)
                * a.config.time_per_metre_travelled
                + a.config.constant_timeout_offset
                + TIMEOUT_HEADROOM_SECS
        }),
    )?;

    Ok(CommandSpec::new(
        "setmode",
        vec![Parameter::new(
            "mode",
            ValueRange::discrete(vec![
                Value::Str("GUIDED".into()),
                Value::Str("LOITER".into()),
                Value::Str("RTL".into()),
                Value::Str("LAND".into()),
            ])?,
        )],
        vec![guided, loiter, rtl, land],
    ))
}

fn goto_spec() -> Result<CommandSpec, LibraryError> {
    let pre = r#"(and (= _armed true) (> _altitude 0.3))"#;

    let normal = Branch::new(
        "normal",
        pre,
        r#"(and (= __latitude $latitude)
                (= __longitude $longitude)
                (= __altitude $altitude))"#,
        Timeout::derived(|a| {
            let travel = geo::great_circle_metres(
                a.prior_num("latitude"),
                a.prior_num("longitude"),
                a.arg_num("latitude"),
                a.arg_num("longitude"),
            );
            let climb = geo::altitude_delta_metres(a.prior_num("altitude"), a.arg_num("altitude"));
            (travel + climb) * a.config.time_per_metre_travelled
                + a.config.constant_timeout_offset
                + TIMEOUT_HEADROOM_SECS
        }),
    )?;

    let idle = Branch::new(
        "idle",
        &format!("(not {pre})"),
        r#"(and (= __latitude _latitude)
                (= __longitude _longitude)
                (= __altitude _altitude))"#,
        Timeout::Fixed(2.0),
    )?;

    Ok(CommandSpec::new(
        "goto",
        vec![
            Parameter::new(
                "latitude",
                ValueRange::continuous(-90.0, 90.0, true)?,
            ),
            Parameter::new(
                "longitude",
                ValueRange::continuous(-180.0, 180.0, true)?,
            ),
            Parameter::new(
                "altitude",
                ValueRange::continuous(0.3, 100.0, false)?,
            ),
        ],
        vec![normal, idle],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use kestrel_model::{Command, Configuration, Environment, State, Value};

    use crate::engine::{postcondition_holds, timeout_seconds};

    fn ground_state() -> State {
        let mut vars = BTreeMap::new();
        vars.insert("home_latitude".to_string(), Value::Num(-35.362938));
        vars.insert("home_longitude".to_string(), Value::Num(149.165085));
        vars.insert("latitude".to_string(), Value::Num(-35.362938));
        vars.insert("longitude".to_string(), Value::Num(149.165085));
        vars.insert("altitude".to_string(), Value::Num(0.2));
        vars.insert("armable".to_string(), Value::Bool(true));
        vars.insert("armed".to_string(), Value::Bool(true));
        vars.insert("mode".to_string(), Value::Str("GUIDED".to_string()));
        vars.insert("vz".to_string(), Value::Num(0.0));
        State::from_values(vars, 0.0)
    }

    fn with_var(base: &State, name: &str, value: Value) -> State {
        let mut vars = base.variables().clone();
        vars.insert(name.to_string(), value);
        State::from_values(vars, base.time_offset())
    }

    fn takeoff_params(alt: f64) -> BTreeMap<String, Value> {
        let mut p = BTreeMap::new();
        p.insert("altitude".to_string(), Value::Num(alt));
        p
    }

    #[test]
    fn test_library_has_all_commands() {
        let lib = spec_library().unwrap();
        let kinds: Vec<&str> = lib.kinds().collect();
        assert_eq!(kinds, vec!["arm", "goto", "setmode", "takeoff"]);
    }

    #[test]
    fn test_takeoff_branch_selection() {
        let lib = spec_library().unwrap();
        let schema = variable_schema().unwrap();
        let env = Environment::default();
        let spec = lib.spec("takeoff").unwrap();

        let grounded = ground_state();
        let branch = spec
            .applicable_branch(&grounded, &takeoff_params(10.0), &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "normal");

        let airborne = with_var(&grounded, "altitude", Value::Num(5.0));
        let branch = spec
            .applicable_branch(&airborne, &takeoff_params(10.0), &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "idle");

        let disarmed = with_var(&grounded, "armed", Value::Bool(false));
        let branch = spec
            .applicable_branch(&disarmed, &takeoff_params(10.0), &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "idle");
    }

    #[test]
    fn test_takeoff_postcondition_noise_window() {
        let lib = spec_library().unwrap();
        let schema = variable_schema().unwrap();
        let env = Environment::default();
        let normal = lib.spec("takeoff").unwrap().branch("normal").unwrap();

        let prior = ground_state();
        let params = takeoff_params(10.0);

        let reached = with_var(&prior, "altitude", Value::Num(10.3));
        assert!(postcondition_holds(normal, &prior, &params, &reached, &env, &schema).unwrap());

        let overshot = with_var(&prior, "altitude", Value::Num(10.6));
        assert!(!postcondition_holds(normal, &prior, &params, &overshot, &env, &schema).unwrap());
    }

    #[test]
    fn test_takeoff_timeout_formula() {
        let lib = spec_library().unwrap();
        let env = Environment::default();
        let config = Configuration::default();
        let normal = lib.spec("takeoff").unwrap().branch("normal").unwrap();

        let command = Command::new("takeoff", takeoff_params(10.0));
        let prior = ground_state();

        // |10.0 - 0.2| * 1.0 + 1.0 + 2.0
        let secs = timeout_seconds(normal, &command, &prior, &env, &config);
        assert!((secs - 12.8).abs() < 1e-9);
    }

    #[test]
    fn test_setmode_branches_are_keyed_on_target_mode() {
        let lib = spec_library().unwrap();
        let schema = variable_schema().unwrap();
        let env = Environment::default();
        let spec = lib.spec("setmode").unwrap();

        for (mode, expected) in [
            ("GUIDED", "guided"),
            ("LOITER", "loiter"),
            ("RTL", "rtl"),
            ("LAND", "land"),
        ] {
            let mut params = BTreeMap::new();
            params.insert("mode".to_string(), Value::Str(mode.to_string()));
            let branch = spec
                .applicable_branch(&ground_state(), &params, &env, &schema)
                .unwrap();
            assert_eq!(branch.name(), expected);
        }
    }

    #[test]
    fn test_rtl_timeout_scales_with_distance_from_home() {
        let lib = spec_library().unwrap();
        let env = Environment::default();
        let config = Configuration::default();
        let rtl = lib.spec("setmode").unwrap().branch("rtl").unwrap();

        let mut params = BTreeMap::new();
        params.insert("mode".to_string(), Value::Str("RTL".to_string()));
        let command = Command::new("setmode", params);

        let home = ground_state();
        let near = timeout_seconds(rtl, &command, &home, &env, &config);

        let far_state = with_var(&home, "latitude", Value::Num(-35.372938));
        let far = timeout_seconds(rtl, &command, &far_state, &env, &config);
        assert!(far > near + 100.0, "near={near} far={far}");
    }

    #[test]
    fn test_goto_requires_airborne_and_armed() {
        let lib = spec_library().unwrap();
        let schema = variable_schema().unwrap();
        let env = Environment::default();
        let spec = lib.spec("goto").unwrap();

        let mut params = BTreeMap::new();
        params.insert("latitude".to_string(), Value::Num(-35.363));
        params.insert("longitude".to_string(), Value::Num(149.166));
        params.insert("altitude".to_string(), Value::Num(10.0));

        let airborne = with_var(&ground_state(), "altitude", Value::Num(10.0));
        let branch = spec
            .applicable_branch(&airborne, &params, &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "normal");

        let grounded = ground_state();
        let branch = spec
            .applicable_branch(&grounded, &params, &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "idle");
    }

    #[test]
    fn test_arm_branches() {
        let lib = spec_library().unwrap();
        let schema = variable_schema().unwrap();
        let env = Environment::default();
        let spec = lib.spec("arm").unwrap();
        let params = BTreeMap::new();

        let disarmed = with_var(&ground_state(), "armed", Value::Bool(false));
        let branch = spec
            .applicable_branch(&disarmed, &params, &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "normal");

        let armed = ground_state();
        let branch = spec
            .applicable_branch(&armed, &params, &env, &schema)
            .unwrap();
        assert_eq!(branch.name(), "idle");
    }
}
