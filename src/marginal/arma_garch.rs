use ndarray::Array1;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::StudentsT;
use statrs::function::gamma::ln_gamma;

/// Parameters of an ARMA(1,1)-GARCH(1,1) model with standardized Student-t
/// innovations.
///
/// Stationarity requires `|ar| < 1` and `alpha + beta < 1`; the innovation
/// distribution needs `nu > 2` so that its variance can be rescaled to one.
#[derive(Clone, Copy, Debug)]
pub struct ArmaGarchParams {
  /// Unconditional mean of the series.
  pub mu: f64,
  /// AR(1) coefficient.
  pub ar: f64,
  /// MA(1) coefficient.
  pub ma: f64,
  /// Constant term of the variance equation.
  pub omega: f64,
  /// Weight of the lagged squared residual.
  pub alpha: f64,
  /// Weight of the lagged conditional variance.
  pub beta: f64,
  /// Degrees of freedom of the innovation distribution.
  pub nu: f64,
}

impl ArmaGarchParams {
  pub fn validate(&self) -> Result<(), String> {
    if !self.mu.is_finite() {
      return Err("mu must be finite".into());
    }
    if self.ar.abs() >= 1.0 {
      return Err(format!("|ar| must be < 1, got {}", self.ar));
    }
    if self.ma.abs() >= 1.0 {
      return Err(format!("|ma| must be < 1, got {}", self.ma));
    }
    if self.omega <= 0.0 {
      return Err(format!("omega must be > 0, got {}", self.omega));
    }
    if self.alpha < 0.0 || self.beta < 0.0 {
      return Err("alpha and beta must be non-negative".into());
    }
    if self.alpha + self.beta >= 1.0 {
      return Err(format!(
        "alpha + beta must be < 1, got {}",
        self.alpha + self.beta
      ));
    }
    if self.nu <= 2.0 {
      return Err(format!("nu must be > 2, got {}", self.nu));
    }
    Ok(())
  }

  /// Long-run variance `omega / (1 - alpha - beta)`.
  pub fn unconditional_variance(&self) -> f64 {
    self.omega / (1.0 - self.alpha - self.beta).max(1e-12)
  }

  /// State used to start the recursions when no history exists.
  pub fn rest_state(&self) -> MarginalState {
    MarginalState {
      last_x: self.mu,
      last_eps: 0.0,
      last_sigma2: self.unconditional_variance(),
    }
  }
}

/// Terminal state of the filter, everything the forward recursion needs.
#[derive(Clone, Copy, Debug)]
pub struct MarginalState {
  pub last_x: f64,
  pub last_eps: f64,
  pub last_sigma2: f64,
}

/// Output of running the filter over an observed loss series.
#[derive(Clone, Debug)]
pub struct FilterOutput {
  /// Raw residuals `eps_t`.
  pub residuals: Array1<f64>,
  /// Conditional variances `sigma_t^2`.
  pub sigma2: Array1<f64>,
  /// Standardized residuals `z_t = eps_t / sigma_t`.
  pub std_residuals: Array1<f64>,
  /// Log-likelihood of the series under the parameters.
  pub log_likelihood: f64,
  /// State after the last observation.
  pub state: MarginalState,
}

/// Run the ARMA-GARCH recursions over `x` and collect residuals, conditional
/// variances and the log-likelihood.
///
/// Both recursions start from [`ArmaGarchParams::rest_state`] (zero lagged
/// residual, long-run variance), the same state the forward simulation uses,
/// so `filter` inverts [`simulate_path`] exactly.
pub fn filter(params: &ArmaGarchParams, x: &Array1<f64>) -> FilterOutput {
  let n = x.len();
  let mut residuals = Array1::<f64>::zeros(n);
  let mut sigma2 = Array1::<f64>::zeros(n);
  let mut std_residuals = Array1::<f64>::zeros(n);

  let rest = params.rest_state();
  let mut last_x = rest.last_x;
  let mut last_eps = rest.last_eps;
  let mut last_sigma2 = rest.last_sigma2;
  let mut log_likelihood = 0.0;

  for t in 0..n {
    let var_t = params.omega + params.alpha * last_eps * last_eps + params.beta * last_sigma2;
    let mean_t = params.mu + params.ar * (last_x - params.mu) + params.ma * last_eps;

    let eps_t = x[t] - mean_t;
    let sd_t = var_t.sqrt();
    let z_t = eps_t / sd_t;

    residuals[t] = eps_t;
    sigma2[t] = var_t;
    std_residuals[t] = z_t;
    log_likelihood += std_t_ln_pdf(params.nu, z_t) - sd_t.ln();

    last_x = x[t];
    last_eps = eps_t;
    last_sigma2 = var_t;
  }

  FilterOutput {
    residuals,
    sigma2,
    std_residuals,
    log_likelihood,
    state: MarginalState {
      last_x,
      last_eps,
      last_sigma2,
    },
  }
}

/// Extend the recursions `z.len()` steps forward from `state`, feeding the
/// supplied standardized innovations. Pure function of its inputs.
pub fn simulate_path(
  params: &ArmaGarchParams,
  state: &MarginalState,
  z: &Array1<f64>,
) -> Array1<f64> {
  let m = z.len();
  let mut path = Array1::<f64>::zeros(m);

  let mut last_x = state.last_x;
  let mut last_eps = state.last_eps;
  let mut last_sigma2 = state.last_sigma2;

  for t in 0..m {
    let var_t = params.omega + params.alpha * last_eps * last_eps + params.beta * last_sigma2;
    let eps_t = var_t.sqrt() * z[t];
    let x_t = params.mu + params.ar * (last_x - params.mu) + params.ma * last_eps + eps_t;

    path[t] = x_t;
    last_x = x_t;
    last_eps = eps_t;
    last_sigma2 = var_t;
  }

  path
}

/// Log-density of the unit-variance Student-t distribution.
///
/// The classical t with `nu` degrees of freedom has variance `nu/(nu-2)`;
/// rescaling by `sqrt((nu-2)/nu)` makes the innovation variance exactly one.
pub fn std_t_ln_pdf(nu: f64, z: f64) -> f64 {
  ln_gamma((nu + 1.0) / 2.0)
    - ln_gamma(nu / 2.0)
    - 0.5 * (std::f64::consts::PI * (nu - 2.0)).ln()
    - (nu + 1.0) / 2.0 * (1.0 + z * z / (nu - 2.0)).ln()
}

/// Quantile of the unit-variance Student-t distribution.
pub fn std_t_quantile(nu: f64, u: f64) -> f64 {
  let t = StudentsT::new(0.0, 1.0, nu).unwrap();
  t.inverse_cdf(u) * ((nu - 2.0) / nu).sqrt()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::Array1;

  use super::filter;
  use super::simulate_path;
  use super::std_t_ln_pdf;
  use super::std_t_quantile;
  use super::ArmaGarchParams;

  fn params() -> ArmaGarchParams {
    ArmaGarchParams {
      mu: 0.0005,
      ar: 0.05,
      ma: -0.02,
      omega: 2e-6,
      alpha: 0.08,
      beta: 0.9,
      nu: 6.0,
    }
  }

  #[test]
  fn validate_rejects_nonstationary_variance() {
    let mut p = params();
    p.alpha = 0.6;
    p.beta = 0.5;
    assert!(p.validate().is_err());
  }

  #[test]
  fn filter_reproduces_injected_innovations() {
    let p = params();
    let z = Array1::from_vec(vec![0.3, -1.2, 0.8, 2.1, -0.4, 0.0, 1.5, -2.2]);
    let path = simulate_path(&p, &p.rest_state(), &z);
    let out = filter(&p, &path);

    for t in 0..z.len() {
      assert!(
        (out.std_residuals[t] - z[t]).abs() < 1e-10,
        "t={}: {} vs {}",
        t,
        out.std_residuals[t],
        z[t]
      );
    }
  }

  #[test]
  fn std_t_quantile_is_monotone_and_centered() {
    let q_lo = std_t_quantile(5.0, 0.1);
    let q_mid = std_t_quantile(5.0, 0.5);
    let q_hi = std_t_quantile(5.0, 0.9);
    assert!(q_lo < q_mid && q_mid < q_hi);
    assert_abs_diff_eq!(q_mid, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(q_lo, -q_hi, epsilon = 1e-10);
  }

  #[test]
  fn std_t_ln_pdf_integrates_to_one() {
    // Crude trapezoid over a wide grid.
    let mut total = 0.0;
    let step = 0.01;
    let mut z = -30.0;
    while z < 30.0 {
      total += std_t_ln_pdf(4.0, z).exp() * step;
      z += step;
    }
    assert!((total - 1.0).abs() < 1e-3, "integral {}", total);
  }
}
