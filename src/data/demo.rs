use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Weekday;
use ndarray::Array1;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::panel::PricePanel;
use crate::copulas::multivariate::gumbel::GumbelCopula;
use crate::copulas::multivariate::Multivariate;
use crate::marginal::arma_garch::simulate_path;
use crate::marginal::arma_garch::std_t_quantile;
use crate::marginal::ArmaGarchParams;

/// Bundled three-asset equity panel: volatility-clustered daily prices with
/// upper-tail-dependent co-movements. Deterministic for a fixed library
/// version (seeded generator standing in for a shipped dataset).
pub fn equity_panel() -> PricePanel {
  let specs = [
    (
      "TECH",
      ArmaGarchParams {
        mu: -0.0004,
        ar: 0.03,
        ma: -0.05,
        omega: 3e-6,
        alpha: 0.09,
        beta: 0.88,
        nu: 5.0,
      },
    ),
    (
      "BANK",
      ArmaGarchParams {
        mu: -0.0002,
        ar: 0.01,
        ma: 0.02,
        omega: 2e-6,
        alpha: 0.07,
        beta: 0.9,
        nu: 7.0,
      },
    ),
    (
      "ENRG",
      ArmaGarchParams {
        mu: -0.0003,
        ar: 0.05,
        ma: 0.0,
        omega: 5e-6,
        alpha: 0.1,
        beta: 0.85,
        nu: 6.0,
      },
    ),
  ];

  let n = 1250;
  let mut rng = StdRng::seed_from_u64(0x5eed_0001);
  let copula = GumbelCopula::with_theta(specs.len(), 1.8);
  let u = copula.sample(n, &mut rng).expect("theta is fixed and valid");

  let mut losses = Array2::<f64>::zeros((n, specs.len()));
  for (j, (_, params)) in specs.iter().enumerate() {
    let z = Array1::from_iter((0..n).map(|t| std_t_quantile(params.nu, u[[t, j]])));
    let path = simulate_path(params, &params.rest_state(), &z);
    for t in 0..n {
      losses[[t, j]] = path[t];
    }
  }

  let start = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
  let dates = business_days(start, n + 1);

  let mut prices = Array2::<f64>::zeros((n + 1, specs.len()));
  for (j, _) in specs.iter().enumerate() {
    prices[[0, j]] = 100.0;
    for t in 0..n {
      prices[[t + 1, j]] = prices[[t, j]] * (-losses[[t, j]]).exp();
    }
  }

  let assets = specs.iter().map(|(name, _)| name.to_string()).collect();
  PricePanel::new(dates, assets, prices).expect("generated panel is valid")
}

/// Bundled two-station weekly river-discharge panel (m^3/s): seasonal
/// log-level series whose innovations share Gumbel upper-tail dependence —
/// joint flood peaks are the interesting events.
pub fn river_panel() -> PricePanel {
  let n = 520;
  let stations = ["GAUGE_A", "GAUGE_B"];
  let mut rng = StdRng::seed_from_u64(0x5eed_0002);

  let copula = GumbelCopula::with_theta(stations.len(), 2.5);
  let u = copula.sample(n, &mut rng).expect("theta is fixed and valid");

  let base = [4.2, 3.6];
  let seasonal = [0.45, 0.5];
  let ar = [0.7, 0.65];
  let noise_sd = [0.25, 0.3];

  let mut values = Array2::<f64>::zeros((n, stations.len()));
  for (j, _) in stations.iter().enumerate() {
    let mut level = base[j];
    for t in 0..n {
      let season = seasonal[j] * (2.0 * std::f64::consts::PI * t as f64 / 52.0).sin();
      let z = std_t_quantile(4.0, u[[t, j]]);
      level = base[j] + ar[j] * (level - base[j]) + noise_sd[j] * z;
      values[[t, j]] = (level + season).exp();
    }
  }

  let start = NaiveDate::from_ymd_opt(2014, 1, 5).unwrap();
  let dates: Vec<NaiveDate> = (0..n)
    .map(|w| start + chrono::Duration::weeks(w as i64))
    .collect();

  let assets = stations.iter().map(|s| s.to_string()).collect();
  PricePanel::new(dates, assets, values).expect("generated panel is valid")
}

fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
  let mut dates = Vec::with_capacity(count);
  let mut day = start;
  while dates.len() < count {
    if day.weekday() != Weekday::Sat && day.weekday() != Weekday::Sun {
      dates.push(day);
    }
    day = day.succ_opt().expect("date range is bounded");
  }
  dates
}
