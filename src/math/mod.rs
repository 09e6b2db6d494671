//! Numerical utilities

/// Nearest-neighbour and trilinear sampling of gridded values
pub mod interpolation;
/// Nelder–Mead simplex minimisation
pub mod simplex;
