use std::hint::black_box;
use std::time::Instant;

use ndarray::array;
use ndarray::Array1;
use riskcast::copulas::multivariate::student::StudentCopula;
use riskcast::copulas::FittedCopula;
use riskcast::forecast::ScenarioConfig;
use riskcast::forecast::ScenarioSimulator;
use riskcast::marginal::arma_garch::filter;
use riskcast::marginal::ArmaGarchParams;
use riskcast::marginal::FittedMarginal;

fn median_ms(samples: &mut [f64]) -> f64 {
  samples.sort_by(f64::total_cmp);
  samples[samples.len() / 2]
}

fn fitted_marginal() -> FittedMarginal {
  let params = ArmaGarchParams {
    mu: 0.0004,
    ar: 0.05,
    ma: 0.0,
    omega: 2e-6,
    alpha: 0.08,
    beta: 0.9,
    nu: 6.0,
  };
  let x = Array1::from_vec(vec![0.001, -0.002, 0.004, -0.001, 0.002, 0.0, 0.003, -0.004]);
  let out = filter(&params, &x);
  FittedMarginal {
    params,
    residuals: out.residuals,
    sigma2: out.sigma2,
    std_residuals: out.std_residuals,
    state: out.state,
    log_likelihood: out.log_likelihood,
  }
}

fn main() {
  let marginals = vec![fitted_marginal(), fitted_marginal(), fitted_marginal()];
  let copula = FittedCopula::Student(StudentCopula::with_params(
    6.0,
    array![[1.0, 0.5, 0.4], [0.5, 1.0, 0.3], [0.4, 0.3, 1.0]],
  ));

  for &replicates in &[100usize, 1000, 10000] {
    let config = ScenarioConfig {
      horizon: 10,
      replicates,
      seed: 42,
    };
    let simulator = ScenarioSimulator::new(&marginals, &copula, config).unwrap();

    for _ in 0..2 {
      black_box(simulator.simulate().unwrap());
    }

    let mut times_ms = Vec::with_capacity(5);
    for _ in 0..5 {
      let t0 = Instant::now();
      let ensemble = simulator.simulate().unwrap();
      times_ms.push(t0.elapsed().as_secs_f64() * 1e3);
      black_box(ensemble);
    }

    println!(
      "scenario simulate: B={:>6} horizon=10 d=3  median {:.2} ms",
      replicates,
      median_ms(&mut times_ms)
    );
  }
}
