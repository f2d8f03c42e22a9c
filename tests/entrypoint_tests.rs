use approx::assert_relative_eq;
use episolve::prelude::*;
use episolve::routines::settings::read_settings;
use eyre::Result;

#[test]
fn solve_the_lockdown_demo() -> Result<()> {
    let mut settings = read_settings("demos/lockdown.toml")?;
    settings.set_output(false);

    let result = solve(&settings)?;
    assert_eq!(result.run.nsegments(), 3);
    assert_eq!(result.trajectory.len(), 2000);
    // Simulated days are shifted to line up with the observed data
    assert_eq!(result.trajectory.times().first(), Some(&14.0));

    let observed = result.observed.as_ref().unwrap();
    assert_eq!(observed.len(), 45);
    assert!(observed.final_value().unwrap() < 1e-3);

    // The lockdown halves the infection rate and adds quarantine
    let params: Vec<Vec<f64>> = settings
        .segments()?
        .iter()
        .map(|segment| segment.params.as_slice().to_vec())
        .collect();
    assert_relative_eq!(params[1][0], 0.1, epsilon = 1e-12);
    assert_relative_eq!(params[1][1], 0.165, epsilon = 1e-12);
    assert_relative_eq!(params[1][2], 0.01, epsilon = 1e-12);
    assert_eq!(params[0], params[2]);

    let thresholds = result.thresholds()?;
    let labels: Vec<&str> = thresholds.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, vec!["before", "lockdown", "restart"]);
    assert_relative_eq!(thresholds[0].1, 0.325, epsilon = 1e-12);
    assert_relative_eq!(thresholds[1].1, 1.65, epsilon = 1e-12);

    let figure = result.figure()?;
    assert_eq!(figure.curves.len(), 5);
    assert_eq!(figure.curves[4].label, "Data");
    assert_eq!(figure.x_label, "t (days)");
    Ok(())
}

#[test]
fn run_writes_outputs() -> Result<()> {
    let folder = std::env::temp_dir().join("episolve_run_test");
    let folder = folder.to_str().unwrap();

    let mut settings = Settings::new(ModelKind::Sir)
        .with_initial("S", 0.99)
        .with_initial("I", 0.01)
        .with_solver(Solver::rk4(0.1))
        .with_segment("all", (0.0, 20.0, 1.0), &[("r", 0.3), ("a", 0.1)]);
    settings.set_output_folder(folder);

    let result = run(settings)?;
    assert_eq!(result.trajectory.len(), 20);

    for file in ["settings.json", "trajectory.csv", "segments.csv", "simulation.svg"] {
        assert!(std::path::Path::new(folder).join(file).exists(), "{} is missing", file);
    }
    let chart = std::fs::read_to_string(std::path::Path::new(folder).join("simulation.svg"))?;
    assert!(chart.contains("<svg"));

    let segments = std::fs::read_to_string(std::path::Path::new(folder).join("segments.csv"))?;
    assert!(segments.starts_with("segment,time,S,I,R"));
    assert!(!std::path::Path::new(folder).join("observed.csv").exists());
    Ok(())
}

#[test]
fn enzyme_figure_labels() -> Result<()> {
    let mut settings = Settings::new(ModelKind::Enzyme)
        .with_initial("s", 10.0)
        .with_segment(
            "reaction",
            (0.0, 1.0, 0.1),
            &[("kp1", 2.0), ("kp2", 1.9), ("km1", 1.5), ("e0", 2.0)],
        );
    settings.set_output(false);

    let result = solve(&settings)?;
    assert!(result.thresholds()?.is_empty());

    let figure = result.figure()?;
    assert_eq!(figure.title, "Enzyme Kinetics");
    let labels: Vec<&str> = figure.curves.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Substrate (S)", "Enzyme/Substrate (ES)"]);
    Ok(())
}

#[test]
fn missing_parameters_fail() {
    let settings = Settings::new(ModelKind::SirDeath)
        .with_initial("S", 1.0)
        .with_segment("incomplete", (0.0, 10.0, 1.0), &[("r", 0.2), ("a", 0.1)]);
    assert!(solve(&settings).is_err());
}

#[test]
fn solve_the_simple_epidemic_demo() -> Result<()> {
    let settings = read_settings("demos/simple_epidemic.toml")?;
    assert_eq!(settings.solver, Solver::rk4(0.01));

    let result = solve(&settings)?;
    assert_eq!(result.run.nsegments(), 1);
    assert_eq!(result.trajectory.len(), 400);
    assert!(result.observed.is_none());

    // r / a is above one, so the infectives peak before the end
    let (t_peak, _) = result.trajectory.peak("I")?.unwrap();
    assert!(t_peak > 14.0 && t_peak < 214.0);
    Ok(())
}

#[test]
fn thresholds_without_deaths() -> Result<()> {
    let mut settings = Settings::new(ModelKind::Sir)
        .with_initial("S", 0.99)
        .with_initial("I", 0.01)
        .with_rates(
            "distancing",
            (0.0, 10.0, 1.0),
            EpidemicRates {
                distancing_factor: 0.5,
                ..Default::default()
            },
        );
    settings.set_output(false);

    let result = solve(&settings)?;
    assert_eq!(result.trajectory.compartments(), &["S", "I", "R"]);
    let thresholds = result.thresholds()?;
    assert_eq!(thresholds.len(), 1);
    assert_relative_eq!(thresholds[0].1, 0.65, epsilon = 1e-12);
    Ok(())
}

#[test]
fn rates_do_not_apply_to_enzymes() {
    let settings = Settings::new(ModelKind::Enzyme)
        .with_initial("s", 10.0)
        .with_rates("reaction", (0.0, 1.0, 0.1), EpidemicRates::default());
    assert!(solve(&settings).is_err());
}
