//! # Forecast
//!
//! $$
//! \widehat{\mathrm{VaR}}_q(m) = Q_q\left(\sum_{j=1}^d X^{(b)}_{m,j}\right)_{b=1}^B
//! $$
//!
//! Monte Carlo scenario simulation over the fitted marginals and copula, and
//! the quantile reduction that turns replicate paths into a portfolio loss
//! forecast with a confidence band and a Value-at-Risk curve.

pub mod aggregate;
pub mod scenario;

pub use aggregate::aggregate_portfolio;
pub use aggregate::summarize;
pub use aggregate::ForecastSummary;
pub use scenario::ScenarioConfig;
pub use scenario::ScenarioSimulator;
