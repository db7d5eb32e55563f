use std::error::Error;

use ndarray::Array1;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::copulas::FittedCopula;
use crate::marginal::pseudo_observations;

/// Which Cramer-von Mises variant was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvmKind {
  /// `S_n` against the parametric copula cdf.
  Cdf,
  /// `S_n^{(B)}` on the Rosenblatt transform, for families without a
  /// tractable cdf.
  Rosenblatt,
}

/// Outcome of the parametric bootstrap goodness-of-fit test.
#[derive(Debug, Clone, Copy)]
pub struct GofReport {
  pub statistic: f64,
  pub p_value: f64,
  pub replicates: usize,
  pub kind: CvmKind,
}

/// Empirical copula evaluated at its own sample points.
fn empirical_cdf_at_sample(U: &Array2<f64>) -> Array1<f64> {
  let n = U.nrows();
  let d = U.ncols();
  let mut out = Array1::<f64>::zeros(n);

  for i in 0..n {
    let mut count = 0;
    for k in 0..n {
      let mut dominated = true;
      for j in 0..d {
        if U[[k, j]] > U[[i, j]] {
          dominated = false;
          break;
        }
      }
      if dominated {
        count += 1;
      }
    }
    out[i] = count as f64 / n as f64;
  }

  out
}

/// Cramer-von Mises distance between the empirical and the fitted copula,
/// falling back to the Rosenblatt variant when the family has no cdf.
fn cvm_statistic(copula: &FittedCopula, U: &Array2<f64>) -> Result<(f64, CvmKind), String> {
  match copula.cdf(U) {
    Ok(parametric) => {
      let empirical = empirical_cdf_at_sample(U);
      let s = empirical
        .iter()
        .zip(parametric.iter())
        .map(|(e, p)| (e - p) * (e - p))
        .sum();
      Ok((s, CvmKind::Cdf))
    }
    Err(_) => {
      let e = copula.rosenblatt(U).map_err(|err| err.to_string())?;
      Ok((rosenblatt_cvm(&e), CvmKind::Rosenblatt))
    }
  }
}

/// `S_n^{(B)}` of Genest, Remillard and Beaudoin on a Rosenblatt-transformed
/// sample, measuring its distance from the independence copula.
fn rosenblatt_cvm(E: &Array2<f64>) -> f64 {
  let n = E.nrows();
  let d = E.ncols();
  let n_f = n as f64;

  let mut cross = 0.0;
  for i in 0..n {
    let mut prod = 1.0;
    for j in 0..d {
      prod *= 1.0 - E[[i, j]] * E[[i, j]];
    }
    cross += prod;
  }

  let mut pair = 0.0;
  for i in 0..n {
    for k in 0..n {
      let mut prod = 1.0;
      for j in 0..d {
        prod *= 1.0 - E[[i, j]].max(E[[k, j]]);
      }
      pair += prod;
    }
  }

  n_f / 3.0_f64.powi(d as i32) - cross / 2.0_f64.powi(d as i32 - 1) + pair / n_f
}

/// Parametric bootstrap of the Cramer-von Mises statistic.
///
/// Repeats `replicates` times: draw `n` rows from the fitted copula, convert
/// to pseudo-observations, refit the same family, recompute the statistic.
/// The p-value is `(1 + #{S_k >= S_0}) / (replicates + 1)`; replicates are
/// independent and run in parallel.
pub fn parametric_bootstrap(
  copula: &FittedCopula,
  U: &Array2<f64>,
  replicates: usize,
  seed: u64,
) -> Result<GofReport, Box<dyn Error>> {
  if replicates == 0 {
    return Err("bootstrap needs at least one replicate".into());
  }

  let n = U.nrows();
  let family = copula.r#type();
  let (s0, kind) = cvm_statistic(copula, U)?;

  let stats: Result<Vec<f64>, String> = (0..replicates)
    .into_par_iter()
    .map(|k| {
      let mut rng = StdRng::seed_from_u64(seed ^ (k as u64).wrapping_mul(0x9e3779b97f4a7c15));
      let sim = copula.sample(n, &mut rng).map_err(|e| e.to_string())?;
      let u_sim = pseudo_observations(&sim);
      let refit = FittedCopula::fit(family, &u_sim).map_err(|e| e.to_string())?;
      let (s_k, _) = cvm_statistic(&refit, &u_sim)?;
      Ok(s_k)
    })
    .collect();
  let stats = stats?;

  let exceed = stats.iter().filter(|&&s| s >= s0).count();
  let p_value = (1.0 + exceed as f64) / (replicates as f64 + 1.0);
  debug!(statistic = s0, p_value, replicates, "bootstrap GoF complete");

  Ok(GofReport {
    statistic: s0,
    p_value,
    replicates,
    kind,
  })
}

#[cfg(test)]
mod tests {
  use ndarray::array;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::parametric_bootstrap;
  use super::CvmKind;
  use crate::copulas::multivariate::gumbel::GumbelCopula;
  use crate::copulas::multivariate::student::StudentCopula;
  use crate::copulas::multivariate::CopulaType;
  use crate::copulas::multivariate::Multivariate;
  use crate::copulas::FittedCopula;
  use crate::marginal::pseudo_observations;

  #[test]
  fn well_specified_gumbel_is_not_rejected() {
    let truth = GumbelCopula::with_theta(2, 2.0);
    let mut rng = StdRng::seed_from_u64(51);
    let sample = truth.sample(300, &mut rng).unwrap();
    let u = pseudo_observations(&sample);

    let fitted = FittedCopula::fit(CopulaType::Gumbel, &u).unwrap();
    let report = parametric_bootstrap(&fitted, &u, 40, 7).unwrap();

    assert_eq!(report.kind, CvmKind::Cdf);
    assert!(report.p_value > 0.02, "unexpected rejection: {:?}", report);
  }

  // The source walkthrough accepts a rejected Gumbel fit as a legitimate
  // outcome; this pins that known-bad-fit scenario down as expected behavior.
  #[test]
  fn gumbel_fit_to_student_data_is_rejected() {
    let truth = StudentCopula::with_params(2.5, array![[1.0, 0.8], [0.8, 1.0]]);
    let mut rng = StdRng::seed_from_u64(77);
    let sample = truth.sample(600, &mut rng).unwrap();
    let u = pseudo_observations(&sample);

    let fitted = FittedCopula::fit(CopulaType::Gumbel, &u).unwrap();
    let report = parametric_bootstrap(&fitted, &u, 50, 11).unwrap();

    assert!(
      report.p_value <= 0.05,
      "expected known-bad-fit rejection: {:?}",
      report
    );
  }

  #[test]
  fn student_bootstrap_uses_the_rosenblatt_statistic() {
    let truth = StudentCopula::with_params(8.0, array![[1.0, 0.4], [0.4, 1.0]]);
    let mut rng = StdRng::seed_from_u64(3);
    let sample = truth.sample(150, &mut rng).unwrap();
    let u = pseudo_observations(&sample);

    let fitted = FittedCopula::fit(CopulaType::Student, &u).unwrap();
    let report = parametric_bootstrap(&fitted, &u, 10, 5).unwrap();

    assert_eq!(report.kind, CvmKind::Rosenblatt);
    assert!(report.p_value > 0.0 && report.p_value <= 1.0);
  }
}
