use crate::aggregate::Granularity;
use crate::config::PlotConfig;
use crate::error::{AppError, Result};
use crate::models::{Measurements, TimeVector, ZONE_FIELDS};
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
}

impl ChartKind {
    /// Lines once there are more buckets than `line_threshold`, bars otherwise.
    pub fn for_buckets(buckets: usize, line_threshold: usize) -> Self {
        if buckets > line_threshold {
            ChartKind::Line
        } else {
            ChartKind::Bar
        }
    }
}

/// Axis label for one row of the current view.
pub fn bucket_label(t: &TimeVector, granularity: Option<Granularity>) -> String {
    match granularity {
        Some(Granularity::HourOfDay) => format!("{:02}:00", t.hour),
        Some(Granularity::Month) => format!("{:04}-{:02}", t.year, t.month),
        Some(Granularity::Day) => t
            .to_datetime()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| format!("{:04}-{:02}-{:02}", t.year, t.month, t.day)),
        Some(Granularity::Hour) | None => t
            .to_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}",
                    t.year, t.month, t.day, t.hour, t.minute
                )
            }),
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Plot(e.to_string())
}

/// Render one series per zone to an SVG file in the configured output directory.
pub fn render_chart(
    measurements: &Measurements,
    granularity: Option<Granularity>,
    config: &PlotConfig,
) -> Result<PathBuf> {
    if measurements.is_empty() {
        return Err(AppError::InvalidArgument(
            "Nothing to plot, the current view is empty".to_string(),
        ));
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let name = granularity.map(|g| g.as_str()).unwrap_or("raw");
    let path = config.output_dir.join(format!("consumption_{}.svg", name));

    let buckets = measurements.len();
    let kind = ChartKind::for_buckets(buckets, config.line_threshold);
    let labels: Vec<String> = measurements
        .time_vectors()
        .iter()
        .map(|t| bucket_label(t, granularity))
        .collect();
    let columns: Vec<Vec<f64>> = (0..ZONE_FIELDS)
        .map(|i| measurements.zones().column(i))
        .collect();
    let y_max = columns
        .iter()
        .flatten()
        .cloned()
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON)
        * 1.05;

    let target = path.clone();
    let root = SVGBackend::new(&target, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let title = match granularity {
        Some(Granularity::HourOfDay) => "Average consumption per hour of day".to_string(),
        Some(g) => format!("Consumption per {}", g),
        None => "Consumption".to_string(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .margin(10)
        .build_cartesian_2d(0f64..buckets as f64, 0f64..y_max)
        .map_err(plot_err)?;

    let x_formatter = |x: &f64| -> String {
        labels
            .get(x.floor().max(0.0) as usize)
            .cloned()
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_labels(buckets.min(12))
        .x_label_formatter(&x_formatter)
        .y_desc("Consumption [Wh]")
        .draw()
        .map_err(plot_err)?;

    for (zone, values) in columns.iter().enumerate() {
        let color = Palette99::pick(zone).mix(1.0);
        let series = match kind {
            ChartKind::Line => chart
                .draw_series(LineSeries::new(
                    values.iter().enumerate().map(|(i, &v)| (i as f64 + 0.5, v)),
                    &color,
                ))
                .map_err(plot_err)?,
            ChartKind::Bar => {
                let width = 0.8 / ZONE_FIELDS as f64;
                chart
                    .draw_series(values.iter().enumerate().map(|(i, &v)| {
                        let x0 = i as f64 + 0.1 + zone as f64 * width;
                        Rectangle::new([(x0, 0.0), (x0 + width, v)], color.filled())
                    }))
                    .map_err(plot_err)?
            }
        };
        series
            .label(format!("Zone {}", zone + 1))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;

    info!(
        "Rendered {:?} chart of {} buckets to {}",
        kind,
        buckets,
        path.display()
    );
    Ok(path)
}
