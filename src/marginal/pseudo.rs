use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;

/// Rank-transform every column of `x` into pseudo-observations on (0,1).
///
/// Each value is replaced by its average rank divided by `n + 1`, so a
/// tie-free column is a permutation of `{1/(n+1), ..., n/(n+1)}` and no output
/// ever touches 0 or 1 (downstream quantile inversions are undefined there).
pub fn pseudo_observations(x: &Array2<f64>) -> Array2<f64> {
  let n = x.nrows();
  let d = x.ncols();
  let mut out = Array2::<f64>::zeros((n, d));

  for j in 0..d {
    let ranks = average_ranks(x.column(j));
    for i in 0..n {
      out[[i, j]] = ranks[i] / (n as f64 + 1.0);
    }
  }

  out
}

/// Average ranks (1-based) of a column, ties sharing the mean of their ranks.
fn average_ranks(column: ArrayView1<'_, f64>) -> Array1<f64> {
  let n = column.len();
  let mut order: Vec<usize> = (0..n).collect();
  order.sort_by(|&a, &b| {
    column[a]
      .partial_cmp(&column[b])
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut ranks = Array1::<f64>::zeros(n);
  let mut i = 0;
  while i < n {
    let mut j = i;
    while j + 1 < n && column[order[j + 1]] == column[order[i]] {
      j += 1;
    }
    // Ranks i+1 ..= j+1 share one tied value; assign their mean.
    let avg = (i + j) as f64 / 2.0 + 1.0;
    for k in i..=j {
      ranks[order[k]] = avg;
    }
    i = j + 1;
  }

  ranks
}
