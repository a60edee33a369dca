// Core infrastructure shared by the future engine and the dining coordinator

pub mod config;
pub mod delay;
pub mod errors;
pub mod shutdown;

// Re-export commonly used types
pub use config::{DiningConfig, FutureConfig, KernelConfig, Strategy};
pub use delay::{DelaySource, JitterDelays, NoDelay, ReferenceDelays, ScaledDelays};
pub use errors::{KernelError, Result};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
