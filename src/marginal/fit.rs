use anyhow::anyhow;
use anyhow::ensure;
use anyhow::Result;
use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use tracing::debug;

use super::arma_garch::filter;
use super::arma_garch::ArmaGarchParams;
use super::arma_garch::MarginalState;

/// A fitted marginal model: parameters plus everything the later stages read.
///
/// This is a plain immutable value, not a handle into the optimizer; the
/// simulator and the copula stage only ever borrow it.
#[derive(Clone, Debug)]
pub struct FittedMarginal {
  pub params: ArmaGarchParams,
  pub residuals: Array1<f64>,
  pub sigma2: Array1<f64>,
  pub std_residuals: Array1<f64>,
  pub state: MarginalState,
  pub log_likelihood: f64,
}

const LN_OMEGA_BOUNDS: (f64, f64) = (-30.0, 0.0);
const ARMA_BOUND: f64 = 0.95;
const NU_BOUNDS: (f64, f64) = (2.1, 60.0);
const PENALTY: f64 = 1e10;

/// Optimizer-facing view: `[mu, ar, ma, ln(omega), alpha, beta, nu]`.
///
/// Omega lives in log-space so that the simplex moves are well scaled against
/// the O(1) coefficients.
#[derive(Clone)]
struct ArmaGarchProblem {
  x: Array1<f64>,
  mu_bounds: (f64, f64),
}

impl ArmaGarchProblem {
  fn decode(&self, p: &[f64]) -> ArmaGarchParams {
    ArmaGarchParams {
      mu: p[0].clamp(self.mu_bounds.0, self.mu_bounds.1),
      ar: p[1].clamp(-ARMA_BOUND, ARMA_BOUND),
      ma: p[2].clamp(-ARMA_BOUND, ARMA_BOUND),
      omega: p[3].clamp(LN_OMEGA_BOUNDS.0, LN_OMEGA_BOUNDS.1).exp(),
      alpha: p[4].clamp(0.0, 0.999),
      beta: p[5].clamp(0.0, 0.999),
      nu: p[6].clamp(NU_BOUNDS.0, NU_BOUNDS.1),
    }
  }
}

impl CostFunction for ArmaGarchProblem {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, p: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let params = self.decode(p);

    let persistence = params.alpha + params.beta;
    if persistence >= 0.999 {
      return Ok(PENALTY * (1.0 + persistence));
    }

    let nll = -filter(&params, &self.x).log_likelihood;
    if nll.is_finite() {
      Ok(nll)
    } else {
      Ok(PENALTY)
    }
  }
}

/// Fit an ARMA(1,1)-GARCH(1,1)-t marginal to one loss series by maximum
/// likelihood (Nelder-Mead over the penalized negative log-likelihood).
pub fn fit_arma_garch(x: &Array1<f64>) -> Result<FittedMarginal> {
  ensure!(
    x.len() >= 50,
    "need at least 50 observations to fit a marginal, got {}",
    x.len()
  );
  ensure!(
    x.iter().all(|v| v.is_finite()),
    "loss series contains non-finite values"
  );

  let n = x.len() as f64;
  let mean = x.sum() / n;
  let var = x.mapv(|v| (v - mean) * (v - mean)).sum() / n;
  ensure!(var > 0.0, "loss series is constant");
  let sd = var.sqrt();

  let problem = ArmaGarchProblem {
    x: x.clone(),
    mu_bounds: (mean - 5.0 * sd, mean + 5.0 * sd),
  };

  let x0 = vec![
    mean,
    0.0,
    0.0,
    (var * 0.05).max(1e-12).ln(),
    0.05,
    0.9,
    8.0,
  ];
  let steps = [0.25 * sd, 0.1, 0.1, 0.5, 0.04, 0.04, 2.0];

  let mut simplex = vec![x0.clone()];
  for (i, step) in steps.iter().enumerate() {
    let mut vertex = x0.clone();
    vertex[i] += step;
    simplex.push(vertex);
  }

  let solver = NelderMead::new(simplex).with_sd_tolerance(1e-9)?;
  let res = Executor::new(problem.clone(), solver)
    .configure(|state| state.max_iters(600))
    .run()?;

  let best = res
    .state()
    .get_best_param()
    .ok_or_else(|| anyhow!("optimizer returned no parameters"))?;
  let params = problem.decode(best);
  params.validate().map_err(|e| anyhow!(e))?;

  let out = filter(&params, x);
  debug!(
    nll = -out.log_likelihood,
    alpha = params.alpha,
    beta = params.beta,
    nu = params.nu,
    "marginal fit converged"
  );

  Ok(FittedMarginal {
    params,
    residuals: out.residuals,
    sigma2: out.sigma2,
    std_residuals: out.std_residuals,
    state: out.state,
    log_likelihood: out.log_likelihood,
  })
}
