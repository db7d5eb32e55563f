//! # Visualization
//!
//! $$
//! (u,v)\in[0,1]^2 \quad\text{and}\quad t\mapsto(\bar\ell_t,\mathrm{VaR}_t)
//! $$
//!
//! Plotly helpers: copula scatterplots and the forecast fan chart. Output is
//! transient (a browser tab or an HTML file); nothing is persisted by the
//! library itself.

use ndarray::Array2;
use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;
use plotly::layout::Layout;
use plotly::Plot;
use plotly::Scatter;

use crate::forecast::ForecastSummary;

/// Scatterplot of a two-column uniform sample, the classic copula-shape demo.
pub fn copula_scatter(data: &Array2<f64>, title: &str) -> Option<Plot> {
  if data.ncols() != 2 {
    eprintln!(
      "Only 2D data can be plotted, but got {} columns!",
      data.ncols()
    );
    return None;
  }

  let x = data.column(0).to_vec();
  let y = data.column(1).to_vec();

  let trace = Scatter::new(x, y)
    .mode(Mode::Markers)
    .marker(plotly::common::Marker::new().size(3))
    .name(title);

  let mut plot = Plot::new();
  plot.add_trace(trace);
  plot.set_layout(
    Layout::new()
      .title(Title::from(title))
      .x_axis(Axis::new().title("u"))
      .y_axis(Axis::new().title("v")),
  );

  Some(plot)
}

/// Fan chart of the aggregated-loss forecast: mean, confidence band and the
/// VaR curve per horizon step.
pub fn forecast_fan(summary: &ForecastSummary, title: &str) -> Plot {
  let steps: Vec<f64> = (1..=summary.horizon()).map(|t| t as f64).collect();

  let lower = Scatter::new(steps.clone(), summary.lower.to_vec())
    .mode(Mode::Lines)
    .name(format!("{:.1}% band", 100.0 * (1.0 - summary.ci_level) / 2.0).as_str());
  let upper = Scatter::new(steps.clone(), summary.upper.to_vec())
    .mode(Mode::Lines)
    .name(format!("{:.1}% band", 100.0 * (1.0 + summary.ci_level) / 2.0).as_str());
  let mean = Scatter::new(steps.clone(), summary.mean.to_vec())
    .mode(Mode::Lines)
    .name("mean loss");
  let var = Scatter::new(steps, summary.var.to_vec())
    .mode(Mode::Lines)
    .name(format!("VaR {:.0}%", summary.var_level * 100.0).as_str());

  let mut plot = Plot::new();
  plot.add_trace(lower);
  plot.add_trace(upper);
  plot.add_trace(mean);
  plot.add_trace(var);
  plot.set_layout(
    Layout::new()
      .title(Title::from(title))
      .x_axis(Axis::new().title("Horizon step"))
      .y_axis(Axis::new().title("Aggregated loss")),
  );

  plot
}
