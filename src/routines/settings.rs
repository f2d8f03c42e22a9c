use std::collections::HashMap;

use config::Config as eConfig;
use eyre::{Result, WrapErr};
use serde_derive::{Deserialize, Serialize};

use crate::routines::output::OutputFile;
use crate::simulator::models::EpidemicRates;
use crate::simulator::{Model, ModelKind, Segment, Solver, V};

/// Settings for a simulation run
///
/// The settings are usually read from a TOML file with [read_settings], but can also be built in
/// code starting from [Settings::new].
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub paths: Paths,
    pub model: ModelSettings,
    #[serde(default)]
    pub solver: Solver,
    pub segments: Vec<SegmentSettings>,
    pub observed: Option<ObservedSettings>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write trajectories, the observed series and the charts to the output folder
    #[serde(default = "default_true")]
    pub output: bool,
    /// Days added to the simulated times before they are compared with observed data
    #[serde(default)]
    pub time_offset: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_log_level(),
            output: true,
            time_offset: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Paths {
    #[serde(default = "default_output_folder")]
    pub output_folder: String,
    #[serde(default = "default_log")]
    pub log: String,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            output_folder: default_output_folder(),
            log: default_log(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ModelSettings {
    pub kind: ModelKind,
    /// Initial value per compartment, compartments left out start at zero
    #[serde(default)]
    pub initial: HashMap<String, f64>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct SegmentSettings {
    #[serde(default)]
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    /// Rates derived from interventions, giving `r`, `a` and `d`
    pub rates: Option<EpidemicRates>,
    /// Parameters by name, taking precedence over the derived rates
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
}

impl SegmentSettings {
    /// All parameters of the segment by name, derived rates first
    pub fn named_parameters(&self, model: &Model) -> Result<HashMap<String, f64>> {
        let mut named = match &self.rates {
            Some(rates) => rates.parameters_for(model)?,
            None => HashMap::new(),
        };
        named.extend(self.parameters.iter().map(|(name, value)| (name.clone(), *value)));
        Ok(named)
    }
}

/// Where to find observed counts, and how to read them
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct ObservedSettings {
    pub path: String,
    pub date_column: String,
    pub value_column: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Divide the cumulative counts by this population to get a fraction
    pub population: Option<f64>,
}

impl Settings {
    pub fn new(kind: ModelKind) -> Self {
        Settings {
            config: Config::default(),
            paths: Paths::default(),
            model: ModelSettings {
                kind,
                initial: HashMap::new(),
            },
            solver: Solver::default(),
            segments: vec![],
            observed: None,
        }
    }

    pub fn with_initial(mut self, compartment: &str, value: f64) -> Self {
        self.model.initial.insert(compartment.to_string(), value);
        self
    }

    pub fn with_segment(
        mut self,
        label: &str,
        (start, end, step): (f64, f64, f64),
        parameters: &[(&str, f64)],
    ) -> Self {
        self.segments.push(SegmentSettings {
            label: label.to_string(),
            start,
            end,
            step,
            rates: None,
            parameters: parameters
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        });
        self
    }

    /// Add a segment whose parameters are derived from intervention rates
    pub fn with_rates(
        mut self,
        label: &str,
        (start, end, step): (f64, f64, f64),
        rates: EpidemicRates,
    ) -> Self {
        self.segments.push(SegmentSettings {
            label: label.to_string(),
            start,
            end,
            step,
            rates: Some(rates),
            parameters: HashMap::new(),
        });
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_observed(mut self, observed: ObservedSettings) -> Self {
        self.observed = Some(observed);
        self
    }

    pub fn set_output(&mut self, output: bool) {
        self.config.output = output;
    }

    pub fn set_output_folder(&mut self, folder: &str) {
        self.paths.output_folder = folder.to_string();
    }

    pub fn model(&self) -> Model {
        Model::new(self.model.kind)
    }

    pub fn initial_state(&self) -> Result<V> {
        self.model()
            .state_from_map(&self.model.initial)
            .wrap_err("Invalid initial state in the settings")
    }

    /// The configured segments, with their parameters ordered as the model expects them
    pub fn segments(&self) -> Result<Vec<Segment>> {
        let model = self.model();
        self.segments
            .iter()
            .map(|segment| {
                let params = segment
                    .named_parameters(&model)
                    .and_then(|named| model.params_from_map(&named))
                    .wrap_err_with(|| format!("Invalid parameters in segment '{}'", segment.label))?;
                Ok(Segment::new(segment.start, segment.end, segment.step, params)
                    .with_label(segment.label.clone()))
            })
            .collect()
    }
}

/// Read settings from a TOML file
///
/// Values can be overridden with environment variables prefixed with `EPISOLVE_`, using `__` to
/// separate nested keys, e.g. `EPISOLVE_CONFIG__LOG_LEVEL=debug`.
pub fn read_settings(path: &str) -> Result<Settings> {
    let parsed = eConfig::builder()
        .add_source(config::File::with_name(path).format(config::FileFormat::Toml))
        .add_source(
            config::Environment::with_prefix("EPISOLVE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .wrap_err_with(|| format!("Unable to read settings from {}", path))?;

    let settings: Settings = parsed
        .try_deserialize()
        .wrap_err_with(|| format!("Unable to parse settings in {}", path))?;
    Ok(settings)
}

/// Write the effective settings as `settings.json` in the output folder
pub fn write_settings_to_file(settings: &Settings) -> Result<()> {
    let serialized = serde_json::to_string_pretty(settings)?;
    let outputfile = OutputFile::new(&settings.paths.output_folder, "settings.json")?;
    std::io::Write::write_all(&mut outputfile.file_owned(), serialized.as_bytes())?;
    Ok(())
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_folder() -> String {
    "outputs/".to_string()
}

fn default_log() -> String {
    "log.txt".to_string()
}

fn default_date_format() -> String {
    "%m/%d/%y".to_string()
}
