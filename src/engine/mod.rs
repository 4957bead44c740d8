//! Geographic math, projection and plot rendering.

/// Great-circle distance.
pub mod geodesy;
/// SVG plot composition.
pub mod plot;
/// Shared planar projection for a set of trails.
pub mod projector;
