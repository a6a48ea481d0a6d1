//! HTTP surface consumed by the agency website.
//!
//! Versioned modules (currently `v1`) keep the public routes stable while the
//! gateway evolves underneath.

pub mod v1;
