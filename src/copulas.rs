//! # Copulas
//!
//! $$
//! F_{X_1,\dots,X_d}(x)=C\left(F_1(x_1),\dots,F_d(x_d)\right)
//! $$
//!
//! Copula fitting and sampling on pseudo-observations: the bivariate trait
//! surface, an exchangeable multivariate Gumbel and a Student-t copula with
//! unstructured correlation.

pub mod bivariate;
pub mod correlation;
pub mod multivariate;

pub use multivariate::CopulaType;
pub use multivariate::FittedCopula;
