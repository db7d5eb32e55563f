//! # Data
//!
//! $$
//! \ell_t = -\ln\frac{P_t}{P_{t-1}}
//! $$
//!
//! Price and loss panels, return transforms, CSV loading and bundled demo datasets.

pub mod demo;
pub mod loader;
pub mod panel;
pub mod returns;

pub use panel::LossPanel;
pub use panel::PricePanel;
