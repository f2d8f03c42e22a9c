use std::ops::Range;
use std::path::Path;

use eyre::{eyre, Result};
use plotters::prelude::*;

use crate::routines::data::ObservedSeries;
use crate::simulator::Trajectory;

/// A labeled line on a chart
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Curve {
            label: label.into(),
            points,
        }
    }

    /// One compartment of a trajectory against time
    pub fn from_trajectory(
        trajectory: &Trajectory,
        compartment: &str,
        label: impl Into<String>,
    ) -> Result<Self> {
        let values = trajectory.column(compartment)?;
        Ok(Curve::new(
            label,
            trajectory.times().iter().copied().zip(values).collect(),
        ))
    }

    pub fn from_observed(series: &ObservedSeries, label: impl Into<String>) -> Self {
        Curve::new(label, series.points())
    }
}

/// Everything needed to draw one chart, independent of the drawing backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub curves: Vec<Curve>,
    /// Horizontal reference lines, `(label, y)`
    pub hlines: Vec<(String, f64)>,
}

impl Figure {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Figure {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            ..Default::default()
        }
    }

    pub fn curve(mut self, curve: Curve) -> Self {
        self.curves.push(curve);
        self
    }

    pub fn hline(mut self, label: &str, y: f64) -> Self {
        self.hlines.push((label.to_string(), y));
        self
    }

    /// Axis ranges covering all curves and reference lines
    pub fn bounds(&self) -> (Range<f64>, Range<f64>) {
        let points = self.curves.iter().flat_map(|curve| curve.points.iter());
        let xs: Vec<f64> = points.clone().map(|(x, _)| *x).filter(|x| x.is_finite()).collect();
        let ys: Vec<f64> = points
            .map(|(_, y)| *y)
            .chain(self.hlines.iter().map(|(_, y)| *y))
            .filter(|y| y.is_finite())
            .collect();
        (span(&xs, 0.0), span(&ys, 0.05))
    }

    /// Draw the figure as an SVG file
    pub fn render(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (x_range, y_range) = self.bounds();
        let (x_start, x_end) = (x_range.start, x_range.end);

        let root = SVGBackend::new(path, (1024, 768)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        for (index, curve) in self.curves.iter().enumerate() {
            let style = Palette99::pick(index).stroke_width(2);
            chart
                .draw_series(LineSeries::new(curve.points.iter().copied(), style))?
                .label(curve.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        for (label, y) in &self.hlines {
            let style = RED.stroke_width(1);
            chart
                .draw_series(LineSeries::new(vec![(x_start, *y), (x_end, *y)], style))?
                .label(label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;

        root.present()
            .map_err(|e| eyre!("Unable to write chart to {:?}: {}", path, e))?;
        tracing::info!("Chart '{}' written to {:?}", self.title, path);
        Ok(())
    }
}

fn span(values: &[f64], padding: f64) -> Range<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if min == max {
        return (min - 0.5)..(max + 0.5);
    }
    let pad = (max - min) * padding;
    (min - pad)..(max + pad)
}
