use std::path::{Path, PathBuf};
use std::time::Instant;

use eyre::Result;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::routines::output::OutputFile;
use crate::routines::settings::Settings;

/// Setup logging for the library
///
/// Log messages are written both to stdout and to the log file in the output folder, with a
/// timestamp relative to the start of the program. The level comes from `config.log_level` and
/// accepts anything an [EnvFilter] does.
///
/// If a global subscriber is already installed, for example when running several simulations in
/// the same process, the existing one is kept together with its log file, and no new log file is
/// created.
pub fn setup_log(settings: &Settings) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        tracing::warn!(
            "Logging is already configured, {} will not be written and events go to the existing log",
            log_path(settings).display()
        );
        return Ok(());
    }

    let log_level = settings.config.log_level.as_str();
    let env_filter = EnvFilter::new(log_level);

    let timestamper = CompactTimestamp {
        start: Instant::now(),
    };

    let subscriber = Registry::default().with(env_filter);

    let outputfile = OutputFile::new(&settings.paths.output_folder, &settings.paths.log)?;

    let file_layer = fmt::layer()
        .with_writer(outputfile.file_owned())
        .with_ansi(false)
        .with_timer(timestamper.clone());

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_timer(timestamper);

    if subscriber
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .is_err()
    {
        tracing::warn!("A global subscriber was set concurrently, keeping it");
    }

    tracing::debug!("Logging is configured with level: {}", log_level);
    Ok(())
}

fn log_path(settings: &Settings) -> PathBuf {
    Path::new(&settings.paths.output_folder).join(&settings.paths.log)
}

#[derive(Clone)]
struct CompactTimestamp {
    start: Instant,
}

impl FormatTime for CompactTimestamp {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> Result<(), std::fmt::Error> {
        let elapsed = self.start.elapsed();
        let hours = elapsed.as_secs() / 3600;
        let minutes = (elapsed.as_secs() % 3600) / 60;
        let seconds = elapsed.as_secs() % 60;

        write!(w, "{:02}h {:02}m {:02}s", hours, minutes, seconds)
    }
}
