use core::f64;
use std::cmp::Ordering;
use std::error::Error;

use ndarray::stack;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand::Rng;
use rand_distr::Uniform;
use roots::find_root_brent;
use roots::SimpleConvergency;

pub mod gumbel;

/// A bivariate copula parameterized by a single dependence parameter `theta`,
/// fitted by Kendall-tau inversion.
pub trait Bivariate {
  fn tau(&self) -> Option<f64>;

  fn set_tau(&mut self, tau: f64);

  fn theta(&self) -> Option<f64>;

  fn set_theta(&mut self, theta: f64);

  fn theta_bounds(&self) -> (f64, f64);

  /// Map the fitted Kendall tau to `theta`.
  fn compute_theta(&self) -> f64;

  fn check_theta(&self) -> Result<(), String> {
    let (lower, upper) = self.theta_bounds();
    let theta = self.theta().unwrap();

    if !(lower <= theta && theta <= upper) {
      return Err(format!(
        "Theta must be in the interval [{}, {}], got {}",
        lower, upper, theta
      ));
    }

    Ok(())
  }

  /// Estimate Kendall's tau from two pseudo-observation columns and invert it.
  fn fit(&mut self, X: &Array2<f64>) -> Result<(), Box<dyn Error>> {
    let U = X.column(0).to_owned();
    let V = X.column(1).to_owned();

    self.check_marginal(&U)?;
    self.check_marginal(&V)?;

    let (tau, ..) = kendalls::tau_b_with_comparator(&U.to_vec(), &V.to_vec(), |a, b| {
      a.partial_cmp(b).unwrap_or(Ordering::Greater)
    })?;

    self.set_tau(tau);
    self.set_theta(self.compute_theta());
    self.check_theta()?;

    Ok(())
  }

  fn check_fit(&self) -> Result<(), Box<dyn Error>> {
    if self.theta().is_none() {
      return Err("Fit the copula first".into());
    }

    self.check_theta()?;
    Ok(())
  }

  /// Kolmogorov-style sanity check that a column looks uniform on [0, 1].
  fn check_marginal(&self, u: &Array1<f64>) -> Result<(), String> {
    if !(0.0..=1.0).contains(u.min().unwrap()) || !(0.0..=1.0).contains(u.max().unwrap()) {
      return Err("Marginal values must be in the interval [0, 1]".into());
    }

    let mut empirical_cdf = u.to_vec();
    empirical_cdf.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Greater));
    let empirical_cdf = Array1::from(empirical_cdf);
    let uniform = Array1::linspace(0.0, 1.0, u.len());
    let ks = (empirical_cdf - uniform).mapv(f64::abs);
    let ks = ks.max().unwrap();

    if *ks > 1.627 / (u.len() as f64).sqrt() {
      return Err("Marginal values do not follow a uniform distribution".into());
    }

    Ok(())
  }

  fn cdf(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>>;

  fn pdf(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>>;

  fn log_pdf(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    Ok(self.pdf(X)?.mapv(f64::ln))
  }

  /// Conditional distribution `C(u | v) = dC/dv`, the h-function.
  ///
  /// The default is a central finite difference; implementations with a
  /// closed form should override it.
  fn h_function(&self, X: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    let n = X.nrows();
    let mut X_prime = X.clone();
    let mut delta = Array1::zeros(n);
    for i in 0..n {
      delta[i] = if X[[i, 1]] > 0.5 { -0.0001 } else { 0.0001 };
      X_prime[[i, 1]] = X[[i, 1]] + delta[i];
    }

    let f = self.cdf(X)?;
    let f_prime = self.cdf(&X_prime)?;

    let mut deriv = Array1::zeros(n);
    for i in 0..n {
      deriv[i] = ((f_prime[i] - f[i]) / delta[i]).clamp(0.0, 1.0);
    }

    Ok(deriv)
  }

  fn h_function_scalar(&self, U: f64, V: f64) -> Result<f64, Box<dyn Error>> {
    self.check_fit()?;
    let X = stack![Axis(1), Array1::from(vec![U]), Array1::from(vec![V])];
    let out = self.h_function(&X)?;

    Ok(out[0])
  }

  /// Invert the h-function in its first argument by Brent's method.
  fn inverse_h(&self, y: &Array1<f64>, V: &Array1<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    let n = y.len();
    let mut results = Array1::zeros(n);

    for i in 0..n {
      let y_i = y[i];
      let v_i = V[i];

      let f = |u| self.h_function_scalar(u, v_i).unwrap_or(f64::NAN) - y_i;
      let mut convergency = SimpleConvergency {
        eps: f64::EPSILON,
        max_iter: 50,
      };
      let root = find_root_brent(f64::EPSILON, 1.0 - f64::EPSILON, f, &mut convergency);
      results[i] = root.unwrap_or(f64::EPSILON);
    }

    Ok(results)
  }

  /// Draw `n` pairs by conditional inversion: `v, c ~ U(0,1)`, `u = h^{-1}(c | v)`.
  fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let v = Array1::<f64>::random_using(n, Uniform::new(0.0, 1.0), rng);
    let c = Array1::<f64>::random_using(n, Uniform::new(0.0, 1.0), rng);
    let u = self.inverse_h(&c, &v)?;

    Ok(stack![Axis(1), u, v])
  }

  /// Rosenblatt transform: `(u, v) -> (v, C(u | v))`, independent uniforms
  /// under a correctly specified copula.
  fn rosenblatt(&self, X: &Array2<f64>) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let e2 = self.h_function(X)?;
    let v = X.column(1).to_owned();

    Ok(stack![Axis(1), v, e2])
  }
}

#[cfg(test)]
mod tests {
  use ndarray::stack;
  use ndarray::Array1;
  use ndarray::Axis;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;

  use super::gumbel::Gumbel;
  use super::Bivariate;

  #[test]
  fn fit_requires_uniform_marginals() {
    let mut rng = StdRng::seed_from_u64(3);
    // Marginals concentrated near zero are flagged by the KS check.
    let u = Array1::from_iter((0..500).map(|_| rng.gen::<f64>() * 0.2));
    let v = Array1::from_iter((0..500).map(|_| rng.gen::<f64>() * 0.2));
    let x = stack![Axis(1), u, v];

    let mut cop = Gumbel::new();
    assert!(cop.fit(&x).is_err());
  }

  #[test]
  fn unfitted_copula_refuses_to_evaluate() {
    let cop = Gumbel::new();
    assert!(cop.check_fit().is_err());
  }

  #[test]
  fn inverse_h_inverts_the_conditional_distribution() {
    let cop = Gumbel::with_theta(2.5);
    let u = Array1::from_vec(vec![0.3, 0.6, 0.85]);
    let v = Array1::from_vec(vec![0.4, 0.5, 0.7]);
    let x = stack![Axis(1), u.clone(), v.clone()];

    let y = cop.h_function(&x).unwrap();
    let u_back = cop.inverse_h(&y, &v).unwrap();

    for i in 0..u.len() {
      assert!(
        (u_back[i] - u[i]).abs() < 1e-6,
        "i={}: {} vs {}",
        i,
        u_back[i],
        u[i]
      );
    }
  }
}
