//! Spatial transforms: evaluation, fitting and thin-plate splines

pub mod fit;
pub mod general;
pub mod tps;
