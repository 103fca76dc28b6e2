//! Data terms of the objective functions.
//!
//! Every loss adds its derivative into a zeroed gradient buffer and returns
//! its value. Priors are applied by [`crate::Objective`], not here.

pub mod biased;
pub mod binary;
pub mod ge;
pub mod log_linear;
pub mod semi_supervised;
pub mod shift;
