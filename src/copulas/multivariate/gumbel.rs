use std::error::Error;

use ndarray::Array1;
use ndarray::Array2;
use rand::Rng;
use rand_distr::Distribution;
use rand_distr::Exp1;

use super::CopulaType;
use super::Multivariate;
use crate::copulas::bivariate::gumbel::Gumbel;
use crate::copulas::bivariate::Bivariate;
use crate::copulas::correlation::kendall_tau_matrix;
use crate::copulas::correlation::mean_offdiagonal_tau;

/// Exchangeable d-dimensional Gumbel copula,
/// `C(u) = exp(-(sum_j (-ln u_j)^theta)^(1/theta))`.
///
/// A single `theta` governs every pair, so the fit inverts the mean pairwise
/// Kendall tau. Negative mean dependence has no Gumbel representation.
#[derive(Debug, Clone)]
pub struct GumbelCopula {
  dim: usize,
  pub theta: Option<f64>,
  pub tau: Option<f64>,
}

impl GumbelCopula {
  pub fn new(dim: usize) -> Self {
    Self {
      dim,
      theta: None,
      tau: None,
    }
  }

  pub fn with_theta(dim: usize, theta: f64) -> Self {
    Self {
      dim,
      theta: Some(theta),
      tau: Some(1.0 - 1.0 / theta),
    }
  }
}

impl Multivariate for GumbelCopula {
  fn r#type(&self) -> CopulaType {
    CopulaType::Gumbel
  }

  fn dim(&self) -> usize {
    self.dim
  }

  fn fit(&mut self, U: &Array2<f64>) -> Result<(), Box<dyn Error>> {
    if U.ncols() != self.dim {
      return Err(format!("expected {} columns, got {}", self.dim, U.ncols()).into());
    }

    let tau_matrix = kendall_tau_matrix(U)?;
    let tau = mean_offdiagonal_tau(&tau_matrix);

    if tau >= 0.95 {
      return Err(format!("mean pairwise tau {} is too close to 1", tau).into());
    }
    // tau < 0 collapses to independence, the closest Gumbel member.
    let tau = tau.max(0.0);

    self.tau = Some(tau);
    self.theta = Some(1.0 / (1.0 - tau));
    Ok(())
  }

  fn check_fit(&self) -> Result<(), Box<dyn Error>> {
    match self.theta {
      Some(theta) if theta >= 1.0 && theta.is_finite() => Ok(()),
      Some(theta) => Err(format!("theta {} outside [1, inf)", theta).into()),
      None => Err("Fit the copula first".into()),
    }
  }

  fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;
    Ok(stable_frailty_sample(self.theta.unwrap(), n, self.dim, rng))
  }

  fn cdf(&self, U: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    self.check_fit()?;
    let theta = self.theta.unwrap();

    let mut out = Array1::zeros(U.nrows());
    for i in 0..U.nrows() {
      let mut s = 0.0;
      for j in 0..U.ncols() {
        s += (-U[[i, j]].ln()).powf(theta);
      }
      out[i] = (-s.powf(1.0 / theta)).exp();
    }

    Ok(out)
  }

  /// Only the bivariate member has a closed-form conditional distribution.
  fn rosenblatt(&self, U: &Array2<f64>) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;
    if self.dim != 2 {
      return Err("Rosenblatt transform is only available for the bivariate Gumbel".into());
    }

    Gumbel::with_theta(self.theta.unwrap()).rosenblatt(U)
  }
}

/// Marshall-Olkin sampling of the Gumbel copula with a positive-stable
/// frailty: `U_j = exp(-(E_j / S)^(1/theta))` with `E_j ~ Exp(1)` and `S`
/// drawn by the Chambers-Mallows-Stuck construction with index `1/theta`.
pub(crate) fn stable_frailty_sample<R: Rng + ?Sized>(
  theta: f64,
  n: usize,
  dim: usize,
  rng: &mut R,
) -> Array2<f64> {
  let mut data = Array2::<f64>::zeros((n, dim));
  let eps = 1e-12;

  if (theta - 1.0).abs() < 1e-10 {
    for i in 0..n {
      for j in 0..dim {
        data[[i, j]] = rng.gen::<f64>().clamp(eps, 1.0 - eps);
      }
    }
    return data;
  }

  let alpha = 1.0 / theta;
  for i in 0..n {
    let s = positive_stable(alpha, rng);
    for j in 0..dim {
      let e: f64 = Exp1.sample(rng);
      let u = (-(e / s).powf(alpha)).exp();
      data[[i, j]] = u.clamp(eps, 1.0 - eps);
    }
  }

  data
}

/// One positive-stable draw `S` with Laplace transform `exp(-t^alpha)`,
/// `alpha` in (0, 1), via Chambers-Mallows-Stuck.
fn positive_stable<R: Rng + ?Sized>(alpha: f64, rng: &mut R) -> f64 {
  let theta_angle = rng.gen::<f64>().clamp(1e-12, 1.0 - 1e-12) * std::f64::consts::PI;
  let w: f64 = Exp1.sample(rng);
  let w = w.max(1e-300);

  let a = (alpha * theta_angle).sin() / theta_angle.sin().powf(1.0 / alpha);
  let b = (((1.0 - alpha) * theta_angle).sin() / w).powf((1.0 - alpha) / alpha);

  a * b
}

#[cfg(test)]
mod tests {
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::super::Multivariate;
  use super::GumbelCopula;

  #[test]
  fn fit_recovers_theta_in_three_dimensions() {
    let truth = GumbelCopula::with_theta(3, 2.0);
    let mut rng = StdRng::seed_from_u64(5);
    let sample = truth.sample(4000, &mut rng).unwrap();
    let u = crate::marginal::pseudo_observations(&sample);

    let mut fitted = GumbelCopula::new(3);
    fitted.fit(&u).unwrap();

    let tau = fitted.tau.unwrap();
    assert!((tau - 0.5).abs() < 0.05, "fitted tau {}", tau);
  }

  #[test]
  fn cdf_is_monotone_in_each_argument() {
    let cop = GumbelCopula::with_theta(3, 2.5);
    let lo = ndarray::array![[0.3, 0.4, 0.5]];
    let hi = ndarray::array![[0.35, 0.4, 0.5]];
    let c_lo = cop.cdf(&lo).unwrap()[0];
    let c_hi = cop.cdf(&hi).unwrap()[0];
    assert!(c_hi >= c_lo);
  }

  #[test]
  fn negative_dependence_collapses_to_independence() {
    // Antithetic columns carry tau = -1.
    let n = 200;
    let mut x = ndarray::Array2::<f64>::zeros((n, 2));
    for i in 0..n {
      x[[i, 0]] = (i + 1) as f64 / (n as f64 + 1.0);
      x[[i, 1]] = 1.0 - x[[i, 0]];
    }

    let mut cop = GumbelCopula::new(2);
    cop.fit(&x).unwrap();
    assert!((cop.theta.unwrap() - 1.0).abs() < 1e-12);
  }

  #[test]
  fn rosenblatt_rejects_higher_dimensions() {
    let cop = GumbelCopula::with_theta(3, 2.0);
    let u = ndarray::array![[0.5, 0.5, 0.5]];
    assert!(cop.rosenblatt(&u).is_err());
  }
}
