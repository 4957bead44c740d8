//! Client upload pump and its single-task runtime.

/// Event stream types emitted by the pump.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
/// Queue drain, retry policy and transports.
pub mod pump;
