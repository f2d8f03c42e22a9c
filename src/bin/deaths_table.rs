//! Print the location and one day of the US deaths time series

use episolve::prelude::*;
use eyre::Result;

const DATA: &str = "demos/data/time_series_covid19_deaths_US.csv";

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let us_data = Table::read(DATA)?;
    tracing::info!("Read {} rows from {}", us_data.nrows(), DATA);

    println!("{}", us_data.select(&["Lat", "Long_"])?);
    println!("{}", us_data.select(&["4/18/20"])?);

    Ok(())
}
