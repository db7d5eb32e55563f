use std::error::Error;

use ndarray::Array1;
use ndarray::Array2;
use rand::Rng;

use super::Bivariate;
use crate::copulas::multivariate::gumbel::stable_frailty_sample;

/// Gumbel copula, `theta` in `[1, inf)`:
/// `C(u,v) = exp(-((-ln u)^theta + (-ln v)^theta)^(1/theta))`
///
/// Upper-tail dependent; `theta = 1` is independence.
#[derive(Debug, Clone)]
pub struct Gumbel {
  pub theta: Option<f64>,
  pub tau: Option<f64>,
}

impl Gumbel {
  pub fn new() -> Self {
    Self {
      theta: None,
      tau: None,
    }
  }

  pub fn with_theta(theta: f64) -> Self {
    Self {
      theta: Some(theta),
      tau: Some(1.0 - 1.0 / theta),
    }
  }

  fn cdf_scalar(&self, u: f64, v: f64) -> f64 {
    let theta = self.theta.unwrap();
    if theta == 1.0 {
      return u * v;
    }
    let s = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
    (-s.powf(1.0 / theta)).exp()
  }
}

impl Default for Gumbel {
  fn default() -> Self {
    Self::new()
  }
}

impl Bivariate for Gumbel {
  fn tau(&self) -> Option<f64> {
    self.tau
  }

  fn set_tau(&mut self, tau: f64) {
    self.tau = Some(tau);
  }

  fn theta(&self) -> Option<f64> {
    self.theta
  }

  fn set_theta(&mut self, theta: f64) {
    self.theta = Some(theta);
  }

  fn theta_bounds(&self) -> (f64, f64) {
    (1.0, f64::INFINITY)
  }

  /// `theta = 1 / (1 - tau)`; negative tau has no Gumbel representation and
  /// falls outside the theta bounds, which `fit` reports as an error.
  fn compute_theta(&self) -> f64 {
    let tau = self.tau.unwrap();
    if tau >= 1.0 {
      return f64::INFINITY;
    }
    1.0 / (1.0 - tau)
  }

  fn cdf(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let mut out = Array1::zeros(X.nrows());
    for i in 0..X.nrows() {
      out[i] = self.cdf_scalar(X[[i, 0]], X[[i, 1]]);
    }

    Ok(out)
  }

  fn pdf(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let theta = self.theta.unwrap();
    if theta == 1.0 {
      return Ok(Array1::ones(X.nrows()));
    }

    let mut out = Array1::zeros(X.nrows());
    for i in 0..X.nrows() {
      let u = X[[i, 0]];
      let v = X[[i, 1]];
      let s = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
      let a = 1.0 / (u * v);
      let b = s.powf(-2.0 + 2.0 / theta);
      let c = (u.ln() * v.ln()).powf(theta - 1.0);
      let d = 1.0 + (theta - 1.0) * s.powf(-1.0 / theta);
      out[i] = self.cdf_scalar(u, v) * a * b * c * d;
    }

    Ok(out)
  }

  /// Closed-form `dC/dv`.
  fn h_function(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let theta = self.theta.unwrap();
    if theta == 1.0 {
      return Ok(X.column(0).to_owned());
    }

    let mut out = Array1::zeros(X.nrows());
    for i in 0..X.nrows() {
      let u = X[[i, 0]];
      let v = X[[i, 1]];
      let s = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
      out[i] = self.cdf_scalar(u, v) * s.powf(1.0 / theta - 1.0) * (-v.ln()).powf(theta - 1.0) / v;
    }

    Ok(out)
  }

  /// Positive-stable frailty sampler; much cheaper than conditional inversion.
  fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;
    Ok(stable_frailty_sample(self.theta.unwrap(), n, 2, rng))
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::super::Bivariate;
  use super::Gumbel;

  #[test]
  fn cdf_respects_frechet_bounds() {
    let cop = Gumbel::with_theta(2.5);
    let x = array![[0.3, 0.7], [0.9, 0.1], [0.5, 0.5]];
    let c = cop.cdf(&x).unwrap();

    for (i, &ci) in c.iter().enumerate() {
      let (u, v) = (x[[i, 0]], x[[i, 1]]);
      assert!(ci >= (u + v - 1.0).max(0.0) - 1e-12);
      assert!(ci <= u.min(v) + 1e-12);
    }
  }

  #[test]
  fn theta_one_is_independence() {
    let cop = Gumbel::with_theta(1.0);
    let x = array![[0.2, 0.6], [0.8, 0.3]];
    let c = cop.cdf(&x).unwrap();
    assert!((c[0] - 0.12).abs() < 1e-12);
    assert!((c[1] - 0.24).abs() < 1e-12);
  }

  #[test]
  fn h_function_matches_finite_difference() {
    let cop = Gumbel::with_theta(3.0);
    let x = array![[0.4, 0.6]];
    let h = cop.h_function(&x).unwrap()[0];

    let eps = 1e-6;
    let up = cop.cdf(&array![[0.4, 0.6 + eps]]).unwrap()[0];
    let dn = cop.cdf(&array![[0.4, 0.6 - eps]]).unwrap()[0];
    let fd = (up - dn) / (2.0 * eps);
    assert!((h - fd).abs() < 1e-6, "analytic {} vs fd {}", h, fd);
  }

  #[test]
  fn fit_recovers_generating_tau() {
    let truth = Gumbel::with_theta(2.0); // tau = 0.5
    let mut rng = StdRng::seed_from_u64(42);
    let sample = truth.sample(4000, &mut rng).unwrap();

    // Rank-transform back to pseudo-observations before fitting.
    let u = crate::marginal::pseudo_observations(&sample);
    let mut fitted = Gumbel::new();
    fitted.fit(&u).unwrap();

    let tau = fitted.tau.unwrap();
    assert!((tau - 0.5).abs() < 0.05, "fitted tau {}", tau);
  }

  #[test]
  fn sample_marginals_stay_in_unit_square() {
    let cop = Gumbel::with_theta(4.0);
    let mut rng = StdRng::seed_from_u64(9);
    let s = cop.sample(1000, &mut rng).unwrap();
    for &v in s.iter() {
      assert!(v > 0.0 && v < 1.0);
    }
  }

  #[test]
  fn rosenblatt_decorrelates_a_fitted_sample() {
    let cop = Gumbel::with_theta(2.0);
    let mut rng = StdRng::seed_from_u64(17);
    let s = cop.sample(2000, &mut rng).unwrap();
    let e = cop.rosenblatt(&s).unwrap();

    let e1 = e.column(0).to_owned();
    let e2 = e.column(1).to_owned();
    let (tau, ..) = kendalls::tau_b_with_comparator(&e1.to_vec(), &e2.to_vec(), |a, b| {
      a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Greater)
    })
    .unwrap();
    assert!(tau.abs() < 0.05, "residual tau {}", tau);
  }
}
