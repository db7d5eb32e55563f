use std::error::Error;

use ndarray::Array2;
use statrs::distribution::ChiSquared;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use super::anderson_darling::anderson_darling_normal_test;
use super::anderson_darling::AndersonDarlingResult;
use crate::copulas::FittedCopula;

/// Diagnostics of a Rosenblatt-transformed sample.
#[derive(Debug, Clone)]
pub struct RosenblattDiagnostics {
  /// Anderson-Darling normality results of each probit-transformed coordinate.
  pub columns: Vec<AndersonDarlingResult>,
  /// Anderson-Darling result of the per-row chi-square aggregation, which is
  /// what reacts to a misspecified dependence structure.
  pub aggregate: AndersonDarlingResult,
}

impl RosenblattDiagnostics {
  /// Smallest p-value across the coordinate checks and the aggregate check.
  pub fn worst_p_value(&self) -> f64 {
    self
      .columns
      .iter()
      .map(|c| c.p_value)
      .fold(self.aggregate.p_value, f64::min)
  }

  pub fn rejects_at(&self, alpha: f64) -> bool {
    self.worst_p_value() < alpha
  }
}

/// Rosenblatt-transform check of a fitted copula.
///
/// Under a correctly specified copula the transformed coordinates are
/// independent U(0,1). Two views of that hypothesis:
/// - each probit-transformed coordinate must be standard normal;
/// - per row, the sum of squared probits must be chi-square with d degrees of
///   freedom — the coordinate checks are blind to dependence left between
///   coordinates, the aggregate is not.
pub fn rosenblatt_check(
  copula: &FittedCopula,
  U: &Array2<f64>,
) -> Result<RosenblattDiagnostics, Box<dyn Error>> {
  let e = copula.rosenblatt(U)?;
  let normal = Normal::new(0.0, 1.0).unwrap();
  let eps = 1e-12;

  let probits = e.mapv(|u| normal.inverse_cdf(u.clamp(eps, 1.0 - eps)));

  let mut columns = Vec::with_capacity(probits.ncols());
  for j in 0..probits.ncols() {
    let col: Vec<f64> = probits.column(j).to_vec();
    columns.push(anderson_darling_normal_test(&col));
  }

  let chi = ChiSquared::new(probits.ncols() as f64).unwrap();
  let aggregated: Vec<f64> = (0..probits.nrows())
    .map(|i| {
      let s: f64 = probits.row(i).iter().map(|x| x * x).sum();
      normal.inverse_cdf(chi.cdf(s).clamp(eps, 1.0 - eps))
    })
    .collect();
  let aggregate = anderson_darling_normal_test(&aggregated);

  Ok(RosenblattDiagnostics { columns, aggregate })
}
