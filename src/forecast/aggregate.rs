use anyhow::ensure;
use anyhow::Result;
use ndarray::Array1;
use ndarray::Array2;

/// Per-horizon-step forecast of the aggregated portfolio loss.
#[derive(Clone, Debug)]
pub struct ForecastSummary {
  /// Mean aggregated loss per step.
  pub mean: Array1<f64>,
  /// Lower edge of the two-sided confidence band.
  pub lower: Array1<f64>,
  /// Upper edge of the two-sided confidence band.
  pub upper: Array1<f64>,
  /// Value-at-Risk quantile per step.
  pub var: Array1<f64>,
  /// Two-sided band mass, e.g. 0.95 for a 2.5/97.5 band.
  pub ci_level: f64,
  /// VaR confidence level, e.g. 0.99.
  pub var_level: f64,
}

impl ForecastSummary {
  pub fn horizon(&self) -> usize {
    self.mean.len()
  }
}

/// Collapse an ensemble of `m x d` loss paths into a `B x m` matrix of
/// aggregated portfolio losses (equal-weight sum across assets).
pub fn aggregate_portfolio(ensemble: &[Array2<f64>]) -> Array2<f64> {
  let b = ensemble.len();
  let m = ensemble.first().map_or(0, |p| p.nrows());
  let mut out = Array2::<f64>::zeros((b, m));

  for (bi, path) in ensemble.iter().enumerate() {
    for t in 0..m {
      out[[bi, t]] = path.row(t).sum();
    }
  }

  out
}

/// Column-wise quantile reduction over the replicate axis.
///
/// For each horizon step: empirical mean, the two-sided `ci_level` band and
/// the `var_level` upper quantile across the `B` replicate values.
pub fn summarize(portfolio: &Array2<f64>, ci_level: f64, var_level: f64) -> Result<ForecastSummary> {
  ensure!(portfolio.nrows() > 0, "empty replicate set");
  ensure!(
    0.0 < ci_level && ci_level < 1.0,
    "ci_level must be in (0, 1), got {}",
    ci_level
  );
  ensure!(
    0.0 < var_level && var_level < 1.0,
    "var_level must be in (0, 1), got {}",
    var_level
  );

  let m = portfolio.ncols();
  let b = portfolio.nrows();
  let tail = (1.0 - ci_level) / 2.0;

  let mut mean = Array1::<f64>::zeros(m);
  let mut lower = Array1::<f64>::zeros(m);
  let mut upper = Array1::<f64>::zeros(m);
  let mut var = Array1::<f64>::zeros(m);

  for t in 0..m {
    let mut column: Vec<f64> = portfolio.column(t).to_vec();
    column.sort_by(f64::total_cmp);

    mean[t] = column.iter().sum::<f64>() / b as f64;
    lower[t] = empirical_quantile(&column, tail);
    upper[t] = empirical_quantile(&column, 1.0 - tail);
    var[t] = empirical_quantile(&column, var_level);
  }

  Ok(ForecastSummary {
    mean,
    lower,
    upper,
    var,
    ci_level,
    var_level,
  })
}

/// Linearly interpolated empirical quantile of a sorted sample.
pub fn empirical_quantile(sorted: &[f64], q: f64) -> f64 {
  let n = sorted.len();
  if n == 1 {
    return sorted[0];
  }

  let h = (n as f64 - 1.0) * q.clamp(0.0, 1.0);
  let i = h.floor() as usize;
  if i + 1 >= n {
    return sorted[n - 1];
  }
  sorted[i] + (h - i as f64) * (sorted[i + 1] - sorted[i])
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::Array2;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;

  use super::aggregate_portfolio;
  use super::empirical_quantile;
  use super::summarize;

  #[test]
  fn quantile_interpolates_linearly() {
    let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    assert_abs_diff_eq!(empirical_quantile(&x, 0.0), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(empirical_quantile(&x, 1.0), 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(empirical_quantile(&x, 0.5), 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(empirical_quantile(&x, 0.625), 3.5, epsilon = 1e-12);
  }

  #[test]
  fn band_brackets_the_mean_and_var_dominates_the_band() {
    let mut rng = StdRng::seed_from_u64(6);
    let portfolio = Array2::from_shape_fn((500, 12), |_| rng.gen::<f64>() * 2.0 - 0.5);

    let summary = summarize(&portfolio, 0.95, 0.99).unwrap();
    for t in 0..summary.horizon() {
      assert!(summary.lower[t] <= summary.mean[t], "step {}", t);
      assert!(summary.mean[t] <= summary.upper[t], "step {}", t);
      // 0.99 > 0.975, so the VaR curve sits at or above the upper band edge.
      assert!(summary.var[t] >= summary.upper[t] - 1e-12, "step {}", t);
    }
  }

  #[test]
  fn aggregation_sums_across_assets() {
    let path_a = ndarray::array![[0.1, 0.2], [0.3, 0.4]];
    let path_b = ndarray::array![[-0.1, 0.1], [0.0, 0.2]];
    let portfolio = aggregate_portfolio(&[path_a, path_b]);

    assert_eq!(portfolio.nrows(), 2);
    assert!((portfolio[[0, 0]] - 0.3).abs() < 1e-12);
    assert!((portfolio[[0, 1]] - 0.7).abs() < 1e-12);
    assert!((portfolio[[1, 0]] - 0.0).abs() < 1e-12);
    assert!((portfolio[[1, 1]] - 0.2).abs() < 1e-12);
  }
}
