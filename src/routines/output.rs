use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use eyre::{Result, WrapErr};

use crate::routines::data::ObservedSeries;
use crate::simulator::{PiecewiseRun, Trajectory};

/// A file in the output folder, created (or truncated) on construction
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

/// Writes a trajectory as CSV, with a `time` column followed by one column per compartment
pub fn write_trajectory(trajectory: &Trajectory, folder: &str, file_name: &str) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, file_name)?;
    let path = outputfile.relative_path().to_path_buf();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(outputfile.file_owned());

    let mut header = vec!["time".to_string()];
    header.extend(trajectory.compartments().iter().cloned());
    writer.write_record(&header)?;

    for row in trajectory.to_array().rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.flush()?;
    tracing::debug!("Trajectory written to {:?}", path);
    Ok(path)
}

/// Writes every segment of a piecewise run as CSV, with the segment label as first column
pub fn write_run(run: &PiecewiseRun, folder: &str, file_name: &str) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, file_name)?;
    let path = outputfile.relative_path().to_path_buf();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(outputfile.file_owned());

    let mut header_written = false;
    for (label, trajectory) in run.segments() {
        if !header_written {
            let mut header = vec!["segment".to_string(), "time".to_string()];
            header.extend(trajectory.compartments().iter().cloned());
            writer.write_record(&header)?;
            header_written = true;
        }
        for (time, state) in trajectory.times().iter().zip(trajectory.states()) {
            let mut record = vec![label.to_string(), time.to_string()];
            record.extend(state.iter().map(|value| value.to_string()));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    tracing::debug!("Piecewise run written to {:?}", path);
    Ok(path)
}

/// Writes the observed series as CSV with `day` and `value` columns
pub fn write_observed(series: &ObservedSeries, folder: &str, file_name: &str) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, file_name)?;
    let path = outputfile.relative_path().to_path_buf();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(outputfile.file_owned());

    writer.write_record(["day", "value"])?;
    for (day, value) in series.days().iter().zip(series.values()) {
        writer.write_record(&[day.to_string(), value.to_string()])?;
    }
    writer.flush()?;
    tracing::debug!("Observed series written to {:?}", path);
    Ok(path)
}
