//! # Marginal Models
//!
//! $$
//! X_t = \mu + \phi (X_{t-1}-\mu) + \theta \varepsilon_{t-1} + \varepsilon_t,
//! \quad \varepsilon_t = \sigma_t z_t,
//! \quad \sigma_t^2 = \omega + \alpha \varepsilon_{t-1}^2 + \beta \sigma_{t-1}^2
//! $$
//!
//! Per-asset ARMA(1,1)-GARCH(1,1) marginals with standardized Student-t
//! innovations: filtering, maximum-likelihood fitting and the rank transform
//! that feeds standardized residuals into the copula stage.

pub mod arma_garch;
pub mod fit;
pub mod pseudo;

pub use arma_garch::ArmaGarchParams;
pub use arma_garch::MarginalState;
pub use fit::fit_arma_garch;
pub use fit::FittedMarginal;
pub use pseudo::pseudo_observations;
