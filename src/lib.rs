// Core infrastructure modules
pub mod core;

// The two demonstrations
pub mod dining; // Dining philosophers coordinator
pub mod future_flow; // Futures, sequential collection and fan-in

// Re-exports for convenience
pub use crate::core::config::{DiningConfig, FutureConfig, KernelConfig, Strategy};
pub use crate::core::delay::{DelaySource, JitterDelays, NoDelay, ReferenceDelays, ScaledDelays};
pub use crate::core::errors::{KernelError, Result};
pub use crate::core::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use dining::{Coordinator, DiningReport, DiningStrategy};
pub use future_flow::{await_all, fan_in, launch, FutureHandle, MergedStream};
