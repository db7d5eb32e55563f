use std::error::Error;

use nalgebra::DMatrix;
use ndarray::Array2;
use rand::Rng;
use rand_distr::ChiSquared;
use rand_distr::Distribution;
use rand_distr::StandardNormal;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::StudentsT;
use statrs::function::gamma::ln_gamma;
use tracing::debug;

use super::CopulaType;
use super::Multivariate;
use crate::copulas::correlation::kendall_tau_matrix;
use crate::copulas::correlation::tau_to_correlation;

const NU_BOUNDS: (f64, f64) = (2.2, 60.0);
const UNIT_EPS: f64 = 1e-10;

/// Student-t copula with unstructured correlation matrix.
///
/// The correlation matrix comes from the pairwise Kendall taus through
/// `rho = sin(pi tau / 2)` (projected to a valid correlation matrix); the
/// degrees of freedom maximize the profile likelihood given that matrix.
#[derive(Debug, Clone)]
pub struct StudentCopula {
  dim: usize,
  pub nu: Option<f64>,
  pub corr: Option<Array2<f64>>,
}

impl StudentCopula {
  pub fn new(dim: usize) -> Self {
    Self {
      dim,
      nu: None,
      corr: None,
    }
  }

  pub fn with_params(nu: f64, corr: Array2<f64>) -> Self {
    Self {
      dim: corr.nrows(),
      nu: Some(nu),
      corr: Some(corr),
    }
  }

  fn cholesky_factor(&self) -> Result<DMatrix<f64>, Box<dyn Error>> {
    let corr = self.corr.as_ref().ok_or("Fit the copula first")?;
    cholesky_factor(corr)
  }

  /// Negative copula log-likelihood at the given degrees of freedom.
  fn profile_nll(&self, U: &Array2<f64>, corr: &Array2<f64>, nu: f64) -> f64 {
    let l = match cholesky_factor(corr) {
      Ok(l) => l,
      Err(_) => return f64::INFINITY,
    };

    let d = U.ncols();
    let n = U.nrows();
    let log_det: f64 = (0..d).map(|j| l[(j, j)].ln()).sum::<f64>() * 2.0;
    let t_nu = StudentsT::new(0.0, 1.0, nu).unwrap();

    let const_term = ln_gamma((nu + d as f64) / 2.0) + (d as f64 - 1.0) * ln_gamma(nu / 2.0)
      - d as f64 * ln_gamma((nu + 1.0) / 2.0)
      - 0.5 * log_det;

    let mut nll = 0.0;
    for i in 0..n {
      let x: Vec<f64> = (0..d)
        .map(|j| t_nu.inverse_cdf(U[[i, j]].clamp(UNIT_EPS, 1.0 - UNIT_EPS)))
        .collect();

      // q = x' R^-1 x through one forward substitution.
      let mut w = vec![0.0; d];
      let mut q = 0.0;
      for j in 0..d {
        let mut m = 0.0;
        for k in 0..j {
          m += l[(j, k)] * w[k];
        }
        w[j] = (x[j] - m) / l[(j, j)];
        q += w[j] * w[j];
      }

      let mut marginal_term = 0.0;
      for &xj in &x {
        marginal_term += (1.0 + xj * xj / nu).ln();
      }

      let ln_c = const_term - (nu + d as f64) / 2.0 * (1.0 + q / nu).ln()
        + (nu + 1.0) / 2.0 * marginal_term;

      nll -= ln_c;
    }

    if nll.is_finite() {
      nll
    } else {
      f64::INFINITY
    }
  }
}

impl Multivariate for StudentCopula {
  fn r#type(&self) -> CopulaType {
    CopulaType::Student
  }

  fn dim(&self) -> usize {
    self.dim
  }

  fn fit(&mut self, U: &Array2<f64>) -> Result<(), Box<dyn Error>> {
    if U.ncols() != self.dim {
      return Err(format!("expected {} columns, got {}", self.dim, U.ncols()).into());
    }
    if U.nrows() < 10 {
      return Err("need at least 10 rows to fit a Student copula".into());
    }

    let tau = kendall_tau_matrix(U)?;
    let corr = tau_to_correlation(&tau);

    // Profile likelihood over the degrees of freedom, golden-section in
    // log-space (the likelihood is smooth and unimodal in practice).
    let golden = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut a = NU_BOUNDS.0.ln();
    let mut b = NU_BOUNDS.1.ln();
    let mut c = b - golden * (b - a);
    let mut d = a + golden * (b - a);
    let mut fc = self.profile_nll(U, &corr, c.exp());
    let mut fd = self.profile_nll(U, &corr, d.exp());

    for _ in 0..25 {
      if fc < fd {
        b = d;
        d = c;
        fd = fc;
        c = b - golden * (b - a);
        fc = self.profile_nll(U, &corr, c.exp());
      } else {
        a = c;
        c = d;
        fc = fd;
        d = a + golden * (b - a);
        fd = self.profile_nll(U, &corr, d.exp());
      }
    }

    let nu = (0.5 * (a + b)).exp();
    debug!(nu, "student copula profile fit converged");

    self.nu = Some(nu);
    self.corr = Some(corr);
    Ok(())
  }

  fn check_fit(&self) -> Result<(), Box<dyn Error>> {
    match (self.nu, &self.corr) {
      (Some(nu), Some(corr)) if nu > 2.0 && corr.nrows() == self.dim => Ok(()),
      (Some(nu), Some(_)) => Err(format!("invalid degrees of freedom {}", nu).into()),
      _ => Err("Fit the copula first".into()),
    }
  }

  fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let nu = self.nu.unwrap();
    let l = self.cholesky_factor()?;
    let d = self.dim;
    let t_nu = StudentsT::new(0.0, 1.0, nu).unwrap();
    let chi = ChiSquared::new(nu).map_err(|e| e.to_string())?;

    let mut out = Array2::<f64>::zeros((n, d));
    let mut z = vec![0.0; d];

    for i in 0..n {
      for zj in z.iter_mut() {
        *zj = StandardNormal.sample(rng);
      }
      let s: f64 = chi.sample(rng);
      let mix = (nu / s.max(1e-300)).sqrt();

      for j in 0..d {
        let mut y = 0.0;
        for k in 0..=j {
          y += l[(j, k)] * z[k];
        }
        out[[i, j]] = t_nu.cdf(y * mix).clamp(UNIT_EPS, 1.0 - UNIT_EPS);
      }
    }

    Ok(out)
  }

  /// Sequential conditional distributions: given the first `j` coordinates,
  /// the next one is scaled Student-t with `nu + j` degrees of freedom.
  fn rosenblatt(&self, U: &Array2<f64>) -> Result<Array2<f64>, Box<dyn Error>> {
    self.check_fit()?;

    let nu = self.nu.unwrap();
    let l = self.cholesky_factor()?;
    let d = self.dim;
    if U.ncols() != d {
      return Err(format!("expected {} columns, got {}", d, U.ncols()).into());
    }

    let t_nu = StudentsT::new(0.0, 1.0, nu).unwrap();
    let conditionals: Vec<StudentsT> = (1..d)
      .map(|j| StudentsT::new(0.0, 1.0, nu + j as f64).unwrap())
      .collect();

    let mut out = Array2::<f64>::zeros((U.nrows(), d));

    for i in 0..U.nrows() {
      let x: Vec<f64> = (0..d)
        .map(|j| t_nu.inverse_cdf(U[[i, j]].clamp(UNIT_EPS, 1.0 - UNIT_EPS)))
        .collect();

      let mut w = vec![0.0; d];
      let mut q = 0.0;

      for j in 0..d {
        let mut m = 0.0;
        for k in 0..j {
          m += l[(j, k)] * w[k];
        }

        if j == 0 {
          out[[i, 0]] = U[[i, 0]];
        } else {
          let scale = ((nu + q) / (nu + j as f64)).sqrt() * l[(j, j)];
          let e = conditionals[j - 1].cdf((x[j] - m) / scale);
          out[[i, j]] = e.clamp(UNIT_EPS, 1.0 - UNIT_EPS);
        }

        w[j] = (x[j] - m) / l[(j, j)];
        q += w[j] * w[j];
      }
    }

    Ok(out)
  }
}

/// Cholesky factor with a small ridge retry for matrices sitting on the
/// PSD boundary after eigenvalue clipping.
fn cholesky_factor(corr: &Array2<f64>) -> Result<DMatrix<f64>, Box<dyn Error>> {
  let d = corr.nrows();
  let m = DMatrix::from_fn(d, d, |i, j| corr[[i, j]]);

  if let Some(chol) = m.clone().cholesky() {
    return Ok(chol.l());
  }

  let ridged = m + DMatrix::identity(d, d) * 1e-8;
  ridged
    .cholesky()
    .map(|c| c.l())
    .ok_or_else(|| "correlation matrix is not positive definite".into())
}
