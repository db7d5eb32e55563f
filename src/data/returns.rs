use chrono::Datelike;
use chrono::NaiveDate;
use ndarray::Array2;

/// Convert an n x d price matrix into an (n-1) x d matrix of negative log-returns.
///
/// Row t holds `-ln(P_{t+1} / P_t)`, so a price drop is a positive loss.
pub fn negative_log_returns(prices: &Array2<f64>) -> Array2<f64> {
  let n = prices.nrows();
  let d = prices.ncols();
  let mut out = Array2::<f64>::zeros((n.saturating_sub(1), d));

  for t in 1..n {
    for j in 0..d {
      out[[t - 1, j]] = -(prices[[t, j]] / prices[[t - 1, j]]).ln();
    }
  }

  out
}

/// Sum per-period log-losses within each ISO week.
///
/// Because log-losses add over periods, the weekly sum equals the negative
/// log-return over the whole week. Each output row carries the last date seen
/// in its week; partial weeks at the edges are kept.
pub fn weekly_sums(dates: &[NaiveDate], values: &Array2<f64>) -> (Vec<NaiveDate>, Array2<f64>) {
  let d = values.ncols();
  let mut out_dates = Vec::new();
  let mut rows: Vec<Vec<f64>> = Vec::new();

  let mut current_key: Option<(i32, u32)> = None;
  for (t, date) in dates.iter().enumerate() {
    let week = date.iso_week();
    let key = (week.year(), week.week());

    if current_key != Some(key) {
      current_key = Some(key);
      out_dates.push(*date);
      rows.push(vec![0.0; d]);
    } else {
      *out_dates.last_mut().unwrap() = *date;
    }

    let row = rows.last_mut().unwrap();
    for j in 0..d {
      row[j] += values[[t, j]];
    }
  }

  let mut out = Array2::<f64>::zeros((rows.len(), d));
  for (i, row) in rows.iter().enumerate() {
    for j in 0..d {
      out[[i, j]] = row[j];
    }
  }

  (out_dates, out)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use ndarray::array;

  use super::negative_log_returns;
  use super::weekly_sums;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn losses_sum_to_window_loss() {
    let prices = array![[100.0], [105.0], [95.0], [102.0]];
    let losses = negative_log_returns(&prices);
    let total: f64 = losses.column(0).sum();
    assert!((total - (-(102.0_f64 / 100.0).ln())).abs() < 1e-12);
  }

  #[test]
  fn weekly_sums_split_on_iso_week() {
    // Thu/Fri then Mon/Tue of the following ISO week.
    let dates = vec![
      date(2024, 1, 4),
      date(2024, 1, 5),
      date(2024, 1, 8),
      date(2024, 1, 9),
    ];
    let values = array![[0.01], [0.02], [0.03], [0.04]];
    let (out_dates, out) = weekly_sums(&dates, &values);

    assert_eq!(out_dates, vec![date(2024, 1, 5), date(2024, 1, 9)]);
    assert!((out[[0, 0]] - 0.03).abs() < 1e-12);
    assert!((out[[1, 0]] - 0.07).abs() < 1e-12);
  }
}
