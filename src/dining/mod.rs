//! Dining philosophers over a ring of forks, with two interchangeable
//! deadlock-avoidance strategies: global fork ordering and a butler that
//! admits at most `n - 1` philosophers at once.

pub mod coordinator;
pub mod fork;
pub mod monitor;
pub mod philosopher;
pub mod strategy;
pub mod table;

pub use coordinator::{run_strategy, Coordinator, DiningReport};
pub use fork::{Fork, ForkGuard, ForkPair};
pub use monitor::{MonitorSnapshot, TableMonitor};
pub use philosopher::{Philosopher, PhilosopherState, PhilosopherSummary};
pub use strategy::{build_strategy, Butler, DiningStrategy, GlobalOrder, Seat};
pub use table::{acquisition_order, Table};
