//! Client recording session and server-side waypoint store.

/// Explicit `Idle`/`Recording` state machine for one trail.
pub mod session;
/// Per-user named waypoints with dirty tracking.
pub mod waypoints;
