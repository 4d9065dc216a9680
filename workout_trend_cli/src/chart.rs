use std::panic;
use std::path::Path;

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use workout_trend::ChartSeries;

const CHART_SIZE: (u32, u32) = (1280, 760);
const MAX_X_LABELS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Png,
    Svg,
}

impl ChartKind {
    /// SVG when the path ends in `.svg`, PNG otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartKind::Svg,
            _ => ChartKind::Png,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChartOptions {
    pub caption: String,
    pub y_label: String,
}

/// Render `series`, turning a backend panic into an error.
pub fn render_chart_guard(
    series: &ChartSeries,
    path: &Path,
    kind: ChartKind,
    opts: &ChartOptions,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        render_chart(series, path, kind, opts).map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_chart(
    series: &ChartSeries,
    path: &Path,
    kind: ChartKind,
    opts: &ChartOptions,
) -> Result<()> {
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(root, series, opts)
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
            draw_chart(root, series, opts)
        }
    }
}

fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    series: &ChartSeries,
    opts: &ChartOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = root;
    area.fill(&WHITE)?;

    let (x_max, y_max) = axis_bounds(series);
    let mut chart = ChartBuilder::on(&area)
        .caption(
            &opts.caption,
            FontDesc::new(FontFamily::SansSerif, 26.0, FontStyle::Normal),
        )
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(-0.5..x_max, 0.0..y_max)?;

    let labels = &series.x_values;
    chart
        .configure_mesh()
        .x_labels(labels.len().min(MAX_X_LABELS))
        .x_label_formatter(&|v| x_label(labels, *v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .x_desc("Workout date")
        .y_desc(opts.y_label.as_str())
        .label_style(FontDesc::new(
            FontFamily::SansSerif,
            16.0,
            FontStyle::Normal,
        ))
        .draw()?;

    let color = RGBColor(200, 0, 100);
    let points: Vec<(f64, f64)> = series
        .y_values
        .iter()
        .enumerate()
        .map(|(idx, &y)| (idx as f64, y))
        .collect();

    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        ShapeStyle {
            color: color.to_rgba(),
            filled: false,
            stroke_width: 2,
        },
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
    )?;

    area.present()?;
    Ok(())
}

/// X spans one slot per point; Y leaves headroom above the largest value.
fn axis_bounds(series: &ChartSeries) -> (f64, f64) {
    let x_max = series.len().saturating_sub(1) as f64 + 0.5;
    let mut y_max = series.y_values.iter().copied().fold(0.0, f64::max) * 1.1;
    if !y_max.is_finite() || y_max <= 0.0 {
        y_max = 1.0;
    }
    (x_max, y_max)
}

/// Label for an X tick: the date of the point it lands on, blank between points.
fn x_label(labels: &[String], v: f64) -> String {
    let rounded = v.round();
    if rounded < 0.0 || (v - rounded).abs() > 1e-6 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}
