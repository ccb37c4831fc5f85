//! Seasonal trend chart
//!
//! Renders the zonal time series as a PNG line chart, one colored series per
//! vegetation community. Missing observations break the line instead of
//! being drawn as zeros.

use crate::timeseries::TimeSeries;
use chrono::{Duration, NaiveDate};
use greentrace_core::{Error, Result};
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (1024, 600);

/// Render the time series to a PNG line chart at `path`.
pub fn render_chart<P: AsRef<Path>>(series: &TimeSeries, path: P, title: &str) -> Result<()> {
    let dates = series.dates();
    let (mut min_date, mut max_date) = match (dates.iter().min(), dates.iter().max()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => return Err(Error::Other("cannot chart an empty time series".to_string())),
    };
    if min_date == max_date {
        // Degenerate single-date axis
        min_date = min_date - Duration::days(1);
        max_date = max_date + Duration::days(1);
    }

    let (y_min, y_max) = value_range(series);

    let root = BitMapBackend::new(path.as_ref(), CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(min_date..max_date, y_min..y_max)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .y_desc("NDVI")
        .draw()
        .map_err(chart_err)?;

    for (i, site) in series.sites().into_iter().enumerate() {
        let color = Palette99::pick(i).mix(0.9);
        let mut labelled = false;

        for segment in contiguous_segments(&series.for_site(site)) {
            let anno = chart
                .draw_series(LineSeries::new(segment.clone(), color.stroke_width(2)))
                .map_err(chart_err)?;

            if !labelled {
                let legend_color = color;
                anno.label(site).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], legend_color.stroke_width(2))
                });
                labelled = true;
            }

            chart
                .draw_series(
                    segment
                        .iter()
                        .map(|&(d, v)| Circle::new((d, v), 3, color.filled())),
                )
                .map_err(chart_err)?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

fn chart_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Other(format!("chart rendering failed: {}", e))
}

/// Split a site's observations into runs of present values.
///
/// Each missing value terminates the current run, which is how gaps become
/// breaks in the plotted line.
fn contiguous_segments(points: &[(NaiveDate, Option<f64>)]) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut segments = Vec::new();
    let mut current: Vec<(NaiveDate, f64)> = Vec::new();

    for &(date, value) in points {
        match value {
            Some(v) => current.push((date, v)),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Y-axis range padded around the observed values; NDVI bounds as fallback
fn value_range(series: &TimeSeries) -> (f64, f64) {
    let values: Vec<f64> = series.iter().filter_map(|o| o.value).collect();

    if values.is_empty() {
        return (-1.0, 1.0);
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pad = ((max - min) * 0.1).max(0.05);

    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::ZonalObservation;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_contiguous_segments_break_on_missing() {
        let points = vec![
            (date(2018, 1, 1), Some(0.1)),
            (date(2018, 2, 1), Some(0.2)),
            (date(2018, 3, 1), None),
            (date(2018, 4, 1), Some(0.4)),
        ];

        let segments = contiguous_segments(&points);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1], vec![(date(2018, 4, 1), 0.4)]);
    }

    #[test]
    fn test_value_range_fallback_when_all_missing() {
        let mut series = TimeSeries::new();
        series.push(ZonalObservation {
            site: "bog".to_string(),
            date: date(2018, 1, 1),
            value: None,
        });
        assert_eq!(value_range(&series), (-1.0, 1.0));
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        assert!(render_chart(&TimeSeries::new(), &path, "NDVI").is_err());
    }

    // Needs a system font for axis labels, so not part of the default run
    #[test]
    #[ignore]
    fn test_render_chart_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");

        let mut series = TimeSeries::new();
        for (i, d) in [date(2018, 1, 17), date(2018, 6, 12), date(2018, 9, 3)]
            .into_iter()
            .enumerate()
        {
            series.push(ZonalObservation {
                site: "tussock".to_string(),
                date: d,
                value: Some(0.2 + i as f64 * 0.1),
            });
        }

        render_chart(&series, &path, "Seasonal NDVI").unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
