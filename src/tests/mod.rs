use crate::prelude::*;
use crate::routines::settings::read_settings;

const CONFIG: &str = "src/tests/config.toml";

#[test]
fn read_mandatory_settings() {
    let settings = read_settings(CONFIG).unwrap();
    assert_eq!(settings.model.kind, ModelKind::SeirDeath);
    assert_eq!(settings.segments.len(), 2);
    assert_eq!(settings.config.log_level, "debug");
    assert_eq!(settings.config.time_offset, 14.0);
}

#[test]
fn read_defaults() {
    let settings = read_settings(CONFIG).unwrap();
    assert!(settings.config.output);
    assert_eq!(settings.paths.output_folder, "outputs/");
    assert_eq!(settings.paths.log, "log.txt");
    assert_eq!(
        settings.observed.as_ref().unwrap().date_format,
        "%m/%d/%y"
    );
}

#[test]
fn read_initial_state() {
    let settings = read_settings(CONFIG).unwrap();
    let y0 = settings.initial_state().unwrap();
    assert_eq!(y0.as_slice(), &[0.9999, 0.0, 0.0001, 0.0, 0.0]);
}

#[test]
fn read_segment_parameters() {
    let settings = read_settings(CONFIG).unwrap();
    let segments = settings.segments().unwrap();
    assert_eq!(segments[0].label, "before");
    assert_eq!(segments[0].params.as_slice(), &[0.4, 0.01, 0.01, 0.2]);
    // Order in the file does not matter
    assert_eq!(segments[1].params.as_slice(), &[0.1, 0.01, 0.01, 0.2]);
    assert_eq!(segments[1].times().len(), 100);
}

#[test]
fn read_solver() {
    let settings = read_settings(CONFIG).unwrap();
    assert_eq!(settings.solver, Solver::rk4(0.005));
}

#[test]
fn read_observed() {
    let settings = read_settings(CONFIG).unwrap();
    let observed = settings.observed.unwrap();
    assert_eq!(observed.value_column, "DEATH_COUNT");
    assert_eq!(observed.population, Some(8.74488e6));
}

#[test]
fn missing_settings_file() {
    assert!(read_settings("src/tests/does_not_exist.toml").is_err());
}

#[test]
fn settings_round_trip_through_json() {
    let settings = read_settings(CONFIG).unwrap();
    let json = serde_json::to_string(&settings).unwrap();
    assert!(json.contains("\"kind\":\"seir_death\""));
    let deserialized: Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.segments().unwrap(), settings.segments().unwrap());
}

#[test]
fn explicit_parameters_override_rates() {
    let settings = Settings::new(ModelKind::SeirDeath).with_rates(
        "quarantine",
        (0.0, 1.0, 0.01),
        EpidemicRates {
            quarantine_rate: 0.1,
            ..Default::default()
        },
    );
    // SEIR also needs `c`, which the rates do not provide
    assert!(settings.segments().is_err());

    let mut settings = settings;
    settings.segments[0]
        .parameters
        .extend([("c".to_string(), 0.2), ("d".to_string(), 0.02)]);
    let segments = settings.segments().unwrap();
    let params = segments[0].params.as_slice();
    assert!((params[0] - 0.2).abs() < 1e-12);
    assert!((params[1] - 0.165).abs() < 1e-12);
    assert_eq!(&params[2..], &[0.02, 0.2]);
}

#[test]
fn read_rates_from_toml() {
    let settings = read_settings("demos/lockdown.toml").unwrap();
    let lockdown = settings.segments[1].rates.unwrap();
    assert_eq!(lockdown.distancing_factor, 0.5);
    assert_eq!(lockdown.quarantine_rate, 0.1);
    // Fields left out take their defaults
    assert_eq!(lockdown.infection_rate, 0.2);
    assert!(settings.segments[1].parameters.is_empty());
}
