//! # Goodness of Fit
//!
//! $$
//! S_n=\sum_{i=1}^n\left(C_n(\mathbf u_i)-C_\theta(\mathbf u_i)\right)^2
//! $$
//!
//! Diagnostics for a fitted copula: a parametric-bootstrap Cramer-von Mises
//! test and a Rosenblatt-transform check backed by Anderson-Darling tests.
//! A rejection is a legitimate result, not an error: the pipeline reports the
//! p-value and leaves the verdict to the caller.

pub mod anderson_darling;
pub mod bootstrap;
pub mod rosenblatt;

pub use bootstrap::parametric_bootstrap;
pub use bootstrap::CvmKind;
pub use bootstrap::GofReport;
pub use rosenblatt::rosenblatt_check;
pub use rosenblatt::RosenblattDiagnostics;
