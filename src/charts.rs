use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logger::sanitize_filename;
use crate::results::SimulationResult;

/// Draw the per-day spend-vs-budget and impressions charts of a finished run
/// into `dir`. Returns the files written.
pub fn generate_campaign_charts(result: &SimulationResult, daily_budget: f64, dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    let stem = sanitize_filename(&result.campaign);

    let spend: Vec<f64> = result.daily_spend().into_iter().map(|(_, spend)| spend).collect();
    let impressions: Vec<f64> = result.daily_impressions().into_iter().map(|(_, impressions)| impressions as f64).collect();
    if spend.is_empty() {
        return Err(format!("Campaign '{}' has no simulated days to chart", result.campaign).into());
    }

    let spend_path = dir.join(format!("{}_daily_spend.png", stem));
    create_spend_chart(&spend, daily_budget, &format!("{}: daily spend", result.campaign), &spend_path)?;

    let impressions_path = dir.join(format!("{}_daily_impressions.png", stem));
    create_line_chart(&impressions, &format!("{}: daily impressions", result.campaign), "Impressions", &impressions_path, &BLUE)?;

    Ok(vec![spend_path, impressions_path])
}

/// `(day index, value)` points for a line series
pub fn day_series(values: &[f64]) -> Vec<(f64, f64)> {
    values.iter().enumerate().map(|(day, value)| (day as f64, *value)).collect()
}

/// Top of the y axis: a tenth of headroom above the largest value, never zero
pub fn axis_max(values: &[f64]) -> f64 {
    let max = values.iter().copied().filter(|v| v.is_finite()).fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn x_range(days: usize) -> std::ops::Range<f64> {
    0.0..(days.max(2) - 1) as f64
}

fn create_spend_chart(spend: &[f64], daily_budget: f64, title: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = axis_max(spend).max(daily_budget * 1.1);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range(spend.len()), 0.0..y_max)?;

    chart.configure_mesh()
        .x_desc("Day")
        .y_desc("Spend")
        .draw()?;

    chart.draw_series(LineSeries::new(day_series(spend), &BLUE))?
        .label("Spend")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    let budget_line = vec![(0.0, daily_budget), (x_range(spend.len()).end, daily_budget)];
    chart.draw_series(LineSeries::new(budget_line, &RED))?
        .label("Daily budget")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn create_line_chart(values: &[f64], title: &str, y_label: &str, path: &Path, color: &RGBColor) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range(values.len()), 0.0..axis_max(values))?;

    chart.configure_mesh()
        .x_desc("Day")
        .y_desc(y_label)
        .draw()?;

    chart.draw_series(LineSeries::new(day_series(values), color))?;

    root.present()?;
    Ok(())
}
