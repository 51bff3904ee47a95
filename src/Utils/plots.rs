use crate::numerical::optimization::prediction::PredictionCurve;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

/// min and max of the finite values, widened by 5% of the span on each side
fn padded_range<'a, I: Iterator<Item = &'a f64>>(values: I) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(min <= max) {
        return None;
    }
    let pad = if max > min { 0.05 * (max - min) } else { 1.0 };
    Some((min - pad, max + pad))
}

/// Draw data points and the fitted curve into a PNG file
pub fn plot_fit(
    filename: &Path,
    x_data: &[f64],
    y_data: &[f64],
    curve: &PredictionCurve,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    let (x_min, x_max) = padded_range(x_data.iter().chain(curve.x_pred.iter()))
        .ok_or("nothing to plot: no finite x values")?;
    let (y_min, y_max) = padded_range(y_data.iter().chain(curve.y_pred.iter()))
        .ok_or("nothing to plot: no finite y values")?;

    let root_area = BitMapBackend::new(filename, (800, 600)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart.configure_mesh().x_desc("X").y_desc("Y").draw()?;

    let points: Vec<(f64, f64)> = x_data
        .iter()
        .copied()
        .zip(y_data.iter().copied())
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 5, BLUE.mix(0.6).filled())),
        )?
        .label("Data Points")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, BLUE.mix(0.6).filled()));

    let fitted: Vec<(f64, f64)> = curve
        .points()
        .into_iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    chart
        .draw_series(LineSeries::new(fitted, RED.stroke_width(2)))?
        .label("Fitted Curve")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root_area.present()?;
    Ok(())
}
