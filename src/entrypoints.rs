use std::time::Instant;

use eyre::{eyre, Result, WrapErr};

use crate::logger;
use crate::routines::data::ObservedSeries;
use crate::routines::output::{write_observed, write_run, write_trajectory, OutputFile};
use crate::routines::plot::{Curve, Figure};
use crate::routines::settings::{read_settings, write_settings_to_file, Settings};
use crate::simulator::{simulate_piecewise, ModelKind, PiecewiseRun, Trajectory};

/// The outcome of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub settings: Settings,
    /// One trajectory per configured segment
    pub run: PiecewiseRun,
    /// All segments concatenated, shifted by `config.time_offset`
    pub trajectory: Trajectory,
    pub observed: Option<ObservedSeries>,
}

impl SimulationResult {
    /// Chart of every compartment, with the observed series overlaid when there is one
    pub fn figure(&self) -> Result<Figure> {
        let (title, x_label, y_label) = match self.settings.model.kind {
            ModelKind::Enzyme => ("Enzyme Kinetics", "t (sec)", "Concentration"),
            _ => ("Epidemic", "t (days)", "Population Fraction"),
        };
        let mut figure = Figure::new(title, x_label, y_label);
        for compartment in self.trajectory.compartments() {
            figure = figure.curve(Curve::from_trajectory(
                &self.trajectory,
                compartment,
                compartment_label(compartment),
            )?);
        }
        if let Some(observed) = &self.observed {
            figure = figure.curve(Curve::from_observed(observed, "Data"));
        }
        Ok(figure)
    }

    /// Epidemic threshold `a / r` of every segment, for models with an infection and a removal rate
    ///
    /// An epidemic only grows while `S` exceeds the threshold. Empty for enzyme kinetics.
    pub fn thresholds(&self) -> Result<Vec<(String, f64)>> {
        segment_thresholds(&self.settings)
    }

    /// Write trajectories, observed data, settings and charts to the output folder
    pub fn write_outputs(&self) -> Result<()> {
        let folder = self.settings.paths.output_folder.as_str();
        write_settings_to_file(&self.settings)?;
        write_trajectory(&self.trajectory, folder, "trajectory.csv")?;
        write_run(&self.run, folder, "segments.csv")?;

        let chart = OutputFile::new(folder, "simulation.svg")?;
        self.figure()?.render(chart.relative_path())?;

        if let Some(observed) = &self.observed {
            write_observed(observed, folder, "observed.csv")?;
            let chart = OutputFile::new(folder, "observed.svg")?;
            Figure::new("Observed Data", "t (days)", "Number")
                .curve(Curve::from_observed(observed, "Data"))
                .render(chart.relative_path())?;
        }
        tracing::info!("Output files written to {}", folder);
        Ok(())
    }
}

/// Run the configured simulation, without logging setup or output files
pub fn solve(settings: &Settings) -> Result<SimulationResult> {
    let model = settings.model();
    let y0 = settings.initial_state()?;
    let segments = settings.segments()?;

    let run = simulate_piecewise(&model, &settings.solver, &y0, &segments)?;
    for (label, trajectory) in run.segments() {
        tracing::info!(
            "Segment '{}': {} samples, final state {:?}",
            label,
            trajectory.len(),
            trajectory.last_state().map(|state| state.as_slice().to_vec())
        );
    }

    for (label, threshold) in segment_thresholds(settings)? {
        tracing::info!("Segment '{}': epidemic threshold a / r = {}", label, threshold);
    }

    let trajectory = run
        .trajectory()
        .ok_or_else(|| eyre!("No segments are configured"))?
        .shifted(settings.config.time_offset);

    let observed = match &settings.observed {
        Some(observed) => {
            let series = ObservedSeries::read(
                &observed.path,
                &observed.date_column,
                &observed.value_column,
                &observed.date_format,
            )?;
            tracing::info!("Reference date of the observed data: {}", series.reference_date());
            if let Some(total) = series.final_value() {
                tracing::info!("Final cumulative {}: {}", observed.value_column, total);
            }
            Some(match observed.population {
                Some(population) => series.normalized(population),
                None => series,
            })
        }
        None => None,
    };

    Ok(SimulationResult {
        settings: settings.clone(),
        run,
        trajectory,
        observed,
    })
}

/// Primary entrypoint
///
/// Sets up logging, runs the simulation, and writes the output files if `config.output` is set.
pub fn run(settings: Settings) -> Result<SimulationResult> {
    let now = Instant::now();
    logger::setup_log(&settings)?;
    tracing::info!(
        "Simulating the {} model over {} segment(s)",
        settings.model.kind,
        settings.segments.len()
    );

    let result = match solve(&settings) {
        Ok(result) => result,
        Err(err) => {
            tracing::error!("The simulation failed: {:#}", err);
            return Err(err);
        }
    };

    if settings.config.output {
        result.write_outputs()?;
    } else {
        tracing::info!("Output files will not be written - set `output = true` in the configuration file to enable output files");
    }

    tracing::info!("Program complete after {:.2?}", now.elapsed());
    Ok(result)
}

/// Read the settings from a TOML file and [run] them
pub fn run_from_file(path: &str) -> Result<SimulationResult> {
    let settings = read_settings(path).wrap_err("Failed to load the settings")?;
    run(settings)
}

fn segment_thresholds(settings: &Settings) -> Result<Vec<(String, f64)>> {
    let model = settings.model();
    Ok(settings
        .segments()?
        .into_iter()
        .filter_map(|segment| {
            let r = model.parameter(&segment.params, "r")?;
            let a = model.parameter(&segment.params, "a")?;
            Some((segment.label, a / r))
        })
        .collect())
}

fn compartment_label(compartment: &str) -> &str {
    match compartment {
        "S" => "Susceptibles",
        "E" => "Exposed",
        "I" => "Infectives",
        "R" => "Immune",
        "D" => "Deaths",
        "s" => "Substrate (S)",
        "c" => "Enzyme/Substrate (ES)",
        other => other,
    }
}
