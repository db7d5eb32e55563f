use std::cmp::Ordering;
use std::error::Error;

use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Array2;

/// Pairwise Kendall's tau-b matrix for a pseudo-observation matrix.
pub fn kendall_tau_matrix(data: &Array2<f64>) -> Result<Array2<f64>, Box<dyn Error>> {
  let cols = data.ncols();
  let mut tau_matrix = Array2::<f64>::zeros((cols, cols));

  for i in 0..cols {
    tau_matrix[[i, i]] = 1.0;
    for j in (i + 1)..cols {
      let col_i = data.column(i).to_vec();
      let col_j = data.column(j).to_vec();

      let (tau, ..) = kendalls::tau_b_with_comparator(&col_i, &col_j, |a, b| {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
      })?;

      tau_matrix[[i, j]] = tau;
      tau_matrix[[j, i]] = tau;
    }
  }

  Ok(tau_matrix)
}

/// Moment-match a tau matrix to an elliptical correlation matrix via
/// `rho = sin(pi * tau / 2)`, then project onto the valid correlation cone.
pub fn tau_to_correlation(tau: &Array2<f64>) -> Array2<f64> {
  let d = tau.nrows();
  let mut rho = Array2::<f64>::zeros((d, d));

  for i in 0..d {
    rho[[i, i]] = 1.0;
    for j in (i + 1)..d {
      let r = (std::f64::consts::FRAC_PI_2 * tau[[i, j]]).sin();
      rho[[i, j]] = r;
      rho[[j, i]] = r;
    }
  }

  nearest_correlation(&rho)
}

/// Project a symmetric matrix onto the set of valid correlation matrices:
/// clip negative eigenvalues, rebuild, and rescale to a unit diagonal.
///
/// The result is symmetric positive semi-definite with ones on the diagonal.
pub fn nearest_correlation(r: &Array2<f64>) -> Array2<f64> {
  let d = r.nrows();
  let m = DMatrix::from_fn(d, d, |i, j| 0.5 * (r[[i, j]] + r[[j, i]]));

  let eig = m.symmetric_eigen();
  let clipped = DVector::from_iterator(d, eig.eigenvalues.iter().map(|&l| l.max(1e-10)));
  let rebuilt =
    &eig.eigenvectors * DMatrix::from_diagonal(&clipped) * eig.eigenvectors.transpose();

  let mut out = Array2::<f64>::zeros((d, d));
  for i in 0..d {
    for j in 0..d {
      let denom = (rebuilt[(i, i)] * rebuilt[(j, j)]).sqrt();
      out[[i, j]] = if i == j {
        1.0
      } else {
        (rebuilt[(i, j)] / denom).clamp(-1.0, 1.0)
      };
    }
  }

  // Symmetrize away the last floating-point asymmetry.
  for i in 0..d {
    for j in (i + 1)..d {
      let avg = 0.5 * (out[[i, j]] + out[[j, i]]);
      out[[i, j]] = avg;
      out[[j, i]] = avg;
    }
  }

  out
}

/// Mean of the off-diagonal upper triangle, the exchangeable-tau summary.
pub fn mean_offdiagonal_tau(tau: &Array2<f64>) -> f64 {
  let d = tau.nrows();
  if d < 2 {
    return 0.0;
  }

  let mut sum = 0.0;
  let mut count = 0;
  for i in 0..d {
    for j in (i + 1)..d {
      sum += tau[[i, j]];
      count += 1;
    }
  }

  sum / count as f64
}

#[cfg(test)]
mod tests {
  use nalgebra::DMatrix;
  use ndarray::array;

  use super::kendall_tau_matrix;
  use super::mean_offdiagonal_tau;
  use super::nearest_correlation;
  use super::tau_to_correlation;

  #[test]
  fn tau_matrix_of_comonotone_columns_is_one() {
    let x = array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6], [0.7, 0.8]];
    let tau = kendall_tau_matrix(&x).unwrap();
    assert!((tau[[0, 1]] - 1.0).abs() < 1e-12);
    assert!((tau[[1, 0]] - 1.0).abs() < 1e-12);
  }

  #[test]
  fn nearest_correlation_fixes_an_indefinite_matrix() {
    // Pairwise-consistent but jointly invalid correlation pattern.
    let bad = array![[1.0, 0.9, -0.9], [0.9, 1.0, 0.9], [-0.9, 0.9, 1.0]];
    let fixed = nearest_correlation(&bad);

    for i in 0..3 {
      assert!((fixed[[i, i]] - 1.0).abs() < 1e-12);
    }

    let m = DMatrix::from_fn(3, 3, |i, j| fixed[[i, j]]);
    let eig = m.symmetric_eigen();
    for &l in eig.eigenvalues.iter() {
      assert!(l > -1e-8, "eigenvalue {}", l);
    }
  }

  #[test]
  fn sin_transform_maps_zero_tau_to_zero_rho() {
    let tau = array![[1.0, 0.0], [0.0, 1.0]];
    let rho = tau_to_correlation(&tau);
    assert!(rho[[0, 1]].abs() < 1e-12);
  }

  #[test]
  fn mean_offdiagonal_averages_upper_triangle() {
    let tau = array![[1.0, 0.2, 0.4], [0.2, 1.0, 0.6], [0.4, 0.6, 1.0]];
    assert!((mean_offdiagonal_tau(&tau) - 0.4).abs() < 1e-12);
  }
}
