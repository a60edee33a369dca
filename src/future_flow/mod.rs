//! Futures over single-slot channels, sequential collection and fan-in merging.

pub mod collector;
pub mod fan_in;
pub mod future;

pub use collector::await_all;
pub use fan_in::{fan_in, FanInItem, FanInOutput, FanInSummary, MergedStream};
pub use future::{launch, launch_with, FutureHandle, FutureState};
