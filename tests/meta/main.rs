//! Repository layout checks
