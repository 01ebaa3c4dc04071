use std::path::Path;

use plotters::prelude::*;

use crate::error::RestmarkError;
use crate::report::ComparisonReport;
use crate::workload::Phase;

const SERIES_COLORS: [RGBColor; 6] = [
    RGBColor(55, 118, 171),
    RGBColor(222, 165, 132),
    RGBColor(89, 169, 79),
    RGBColor(182, 87, 92),
    RGBColor(133, 103, 165),
    RGBColor(225, 190, 106),
];

/// Render the RPS comparison as a grouped bar chart (one bar per target per
/// phase) and write it as a PNG.
///
/// # Errors
///
/// Returns [`RestmarkError::Chart`] when the backend cannot draw or the file
/// cannot be written. Callers treat chart rendering as a side effect — a
/// failure here never fails the run.
pub fn plot_rps_comparison(report: &ComparisonReport, path: &Path) -> Result<(), RestmarkError> {
    if report.results.is_empty() {
        return Ok(());
    }

    let phases: Vec<Phase> = Phase::ALL
        .iter()
        .copied()
        .filter(|p| report.results.iter().any(|r| r.phase == *p))
        .collect();
    let targets = &report.targets;

    let max_rps = report
        .results
        .iter()
        .map(|r| r.result.requests_per_second)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let root = BitMapBackend::new(path, (1600, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(to_chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Requests per Second by Phase", ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..phases.len() as f64, 0f64..max_rps * 1.1)
        .map_err(to_chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(phases.len())
        .x_label_formatter(&|x| {
            let idx = x.floor() as usize;
            phases
                .get(idx)
                .map(|p| p.label().to_string())
                .unwrap_or_default()
        })
        .y_desc("Requests per Second")
        .draw()
        .map_err(to_chart_err)?;

    let band = 0.8 / targets.len() as f64;
    for (ti, target) in targets.iter().enumerate() {
        let color = SERIES_COLORS[ti % SERIES_COLORS.len()];
        let bars: Vec<Rectangle<(f64, f64)>> = phases
            .iter()
            .enumerate()
            .filter_map(|(pi, &phase)| {
                report.result_for(phase, target).map(|record| {
                    let x0 = pi as f64 + 0.1 + ti as f64 * band;
                    Rectangle::new(
                        [(x0, 0.0), (x0 + band, record.result.requests_per_second)],
                        color.filled(),
                    )
                })
            })
            .collect();

        chart
            .draw_series(bars)
            .map_err(to_chart_err)?
            .label(target.clone())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(to_chart_err)?;

    root.present().map_err(to_chart_err)?;
    Ok(())
}

fn to_chart_err<E: std::fmt::Display>(err: E) -> RestmarkError {
    RestmarkError::Chart(err.to_string())
}
