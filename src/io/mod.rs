//! File formats, command-line plumbing and error handling

/// Shared command-line driver and argument helpers
pub mod cli;
/// Tool constants and defaults
pub mod configuration;
/// Error types and result alias
pub mod error;
/// BIC polygon object reader
pub mod polygons;
/// Slice progress display
pub mod progress;
/// MNI tag point files
pub mod tags;
/// NIfTI volume reading and writing
pub mod volume;
/// MNI transform files
pub mod xfm;
