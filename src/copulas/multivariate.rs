use std::error::Error;

use ndarray::Array1;
use ndarray::Array2;
use rand::Rng;

pub mod gumbel;
pub mod student;

use gumbel::GumbelCopula;
use student::StudentCopula;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopulaType {
  Gumbel,
  Student,
}

/// A d-dimensional copula on pseudo-observations.
pub trait Multivariate {
  fn r#type(&self) -> CopulaType;

  fn dim(&self) -> usize;

  /// Estimate the copula parameters from an n x d pseudo-observation matrix.
  fn fit(&mut self, U: &Array2<f64>) -> Result<(), Box<dyn Error>>;

  fn check_fit(&self) -> Result<(), Box<dyn Error>>;

  /// Draw `n` rows from the fitted copula.
  fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>, Box<dyn Error>>;

  /// Copula distribution function. Not every family has a tractable form.
  fn cdf(&self, _U: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    Err("cdf is not available for this copula".into())
  }

  /// Rosenblatt transform of each row into (approximately) independent
  /// uniforms. Not every family has a tractable form.
  fn rosenblatt(&self, _U: &Array2<f64>) -> Result<Array2<f64>, Box<dyn Error>> {
    Err("Rosenblatt transform is not available for this copula".into())
  }
}

/// Enum dispatch over the supported copula families, so the pipeline and the
/// goodness-of-fit bootstrap can hold a fitted copula as a plain value.
#[derive(Debug, Clone)]
pub enum FittedCopula {
  Gumbel(GumbelCopula),
  Student(StudentCopula),
}

impl FittedCopula {
  /// Fit the requested family to a pseudo-observation matrix.
  pub fn fit(family: CopulaType, U: &Array2<f64>) -> Result<Self, Box<dyn Error>> {
    match family {
      CopulaType::Gumbel => {
        let mut c = GumbelCopula::new(U.ncols());
        c.fit(U)?;
        Ok(Self::Gumbel(c))
      }
      CopulaType::Student => {
        let mut c = StudentCopula::new(U.ncols());
        c.fit(U)?;
        Ok(Self::Student(c))
      }
    }
  }

  pub fn r#type(&self) -> CopulaType {
    match self {
      Self::Gumbel(_) => CopulaType::Gumbel,
      Self::Student(_) => CopulaType::Student,
    }
  }

  pub fn dim(&self) -> usize {
    match self {
      Self::Gumbel(c) => c.dim(),
      Self::Student(c) => c.dim(),
    }
  }

  pub fn sample<R: Rng + ?Sized>(
    &self,
    n: usize,
    rng: &mut R,
  ) -> Result<Array2<f64>, Box<dyn Error>> {
    match self {
      Self::Gumbel(c) => c.sample(n, rng),
      Self::Student(c) => c.sample(n, rng),
    }
  }

  pub fn cdf(&self, U: &Array2<f64>) -> Result<Array1<f64>, Box<dyn Error>> {
    match self {
      Self::Gumbel(c) => c.cdf(U),
      Self::Student(c) => c.cdf(U),
    }
  }

  pub fn rosenblatt(&self, U: &Array2<f64>) -> Result<Array2<f64>, Box<dyn Error>> {
    match self {
      Self::Gumbel(c) => c.rosenblatt(U),
      Self::Student(c) => c.rosenblatt(U),
    }
  }

  /// One-line description for logs and summary tables.
  pub fn describe(&self) -> String {
    match self {
      Self::Gumbel(c) => format!(
        "Gumbel(theta = {:.3}, tau = {:.3})",
        c.theta.unwrap_or(f64::NAN),
        c.tau.unwrap_or(f64::NAN)
      ),
      Self::Student(c) => format!("Student-t(nu = {:.2}, d = {})", c.nu.unwrap_or(f64::NAN), c.dim()),
    }
  }
}
