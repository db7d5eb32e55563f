use anyhow::bail;
use anyhow::ensure;
use anyhow::Result;
use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;

use super::returns::negative_log_returns;
use super::returns::weekly_sums;

/// Ordered-by-date table of asset prices, columns keyed by asset identifier.
///
/// Immutable once constructed: all transforms produce new panels.
#[derive(Clone, Debug)]
pub struct PricePanel {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  values: Array2<f64>,
}

impl PricePanel {
  /// Build a panel after validating shape, date ordering and value sanity.
  ///
  /// Fails on empty input, non-increasing dates, shape mismatch, and on any
  /// non-finite or non-positive price (missing data must be resolved upstream).
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
    ensure!(!assets.is_empty(), "panel must contain at least one asset");
    ensure!(dates.len() >= 2, "panel must contain at least two rows");
    ensure!(
      values.nrows() == dates.len() && values.ncols() == assets.len(),
      "value matrix is {}x{}, expected {}x{}",
      values.nrows(),
      values.ncols(),
      dates.len(),
      assets.len()
    );

    for w in dates.windows(2) {
      if w[0] >= w[1] {
        bail!("dates must be strictly increasing, got {} before {}", w[0], w[1]);
      }
    }

    for (idx, &v) in values.indexed_iter() {
      if !v.is_finite() || v <= 0.0 {
        bail!(
          "invalid price {} for asset {} on {}",
          v,
          assets[idx.1],
          dates[idx.0]
        );
      }
    }

    Ok(Self {
      dates,
      assets,
      values,
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  /// Restrict the panel to `[start, end]` (inclusive on both ends).
  pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
    ensure!(start <= end, "window start {} is after end {}", start, end);

    let lo = self.dates.partition_point(|d| *d < start);
    let hi = self.dates.partition_point(|d| *d <= end);
    ensure!(
      hi - lo >= 2,
      "window [{}, {}] selects fewer than two rows",
      start,
      end
    );

    Ok(Self {
      dates: self.dates[lo..hi].to_vec(),
      assets: self.assets.clone(),
      values: self.values.slice(ndarray::s![lo..hi, ..]).to_owned(),
    })
  }

  /// Transform prices into a panel of negative log-returns ("losses").
  pub fn to_losses(&self) -> LossPanel {
    LossPanel {
      dates: self.dates[1..].to_vec(),
      assets: self.assets.clone(),
      values: negative_log_returns(&self.values),
    }
  }
}

/// Panel of per-period losses (negative log-returns). Derived, read-only.
#[derive(Clone, Debug)]
pub struct LossPanel {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  values: Array2<f64>,
}

impl LossPanel {
  /// Assemble a loss panel directly from already-derived losses.
  pub fn from_parts(dates: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Self {
    Self {
      dates,
      assets,
      values,
    }
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn dim(&self) -> usize {
    self.assets.len()
  }

  /// Loss series of a single asset.
  pub fn column(&self, asset: usize) -> ArrayView1<'_, f64> {
    self.values.column(asset)
  }

  /// Aggregate daily log-losses into ISO-week sums (the weekly negative log-return).
  ///
  /// Each output row is stamped with the last date observed in its week.
  pub fn to_weekly(&self) -> LossPanel {
    let (dates, values) = weekly_sums(&self.dates, &self.values);
    LossPanel {
      dates,
      assets: self.assets.clone(),
      values,
    }
  }
}
