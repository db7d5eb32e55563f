//! # riskcast
//!
//! `riskcast` models the joint behaviour of dependent loss series with copulas and
//! turns the fitted models into Monte Carlo risk forecasts. The crate covers the full
//! chain: price panels to negative log-returns, per-asset ARMA-GARCH marginals with
//! Student-t innovations, rank-based pseudo-observations, copula fitting (Gumbel and
//! Student-t), goodness-of-fit diagnostics, and aggregated Value-at-Risk forecasts.
//!
//! ## Modules
//!
//! | Module            | Description                                                                 |
//! |-------------------|-----------------------------------------------------------------------------|
//! | [`data`]          | Price/loss panels, return transforms, CSV loading, bundled demo datasets.   |
//! | [`marginal`]      | ARMA(1,1)-GARCH(1,1) marginals with Student-t innovations, MLE fitting.     |
//! | [`copulas`]       | Bivariate and multivariate copulas: fitting, sampling, Rosenblatt maps.     |
//! | [`gof`]           | Bootstrap and Rosenblatt-based goodness-of-fit tests.                       |
//! | [`forecast`]      | Monte Carlo scenario simulation and quantile aggregation.                   |
//! | [`pipeline`]      | End-to-end risk-forecast pipeline.                                          |
//! | [`visualization`] | Plotly helpers for copula scatters and forecast fan charts.                 |
//!
//! ## Parallelism
//!
//! The scenario-simulation replicate loop and the bootstrap refits use `rayon`; each
//! replicate derives its own RNG from the base seed, so runs are reproducible and
//! replicates are mutually independent. Everything else is single-threaded.

#![allow(non_snake_case)]

pub mod copulas;
pub mod data;
pub mod forecast;
pub mod gof;
pub mod marginal;
pub mod pipeline;
pub mod visualization;
