use super::fork::ForkPair;
use super::philosopher::{Philosopher, PhilosopherState};
use super::table::{acquisition_order, Table};
use crate::core::config::Strategy;
use crate::core::errors::{KernelError, Result};
use crate::core::shutdown::ShutdownSignal;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

/// Both forks of one philosopher, plus the butler's permit when there is one.
///
/// Dropping a seat releases the forks before the permit.
#[derive(Debug)]
pub struct Seat {
    forks: ForkPair,
    permit: Option<OwnedSemaphorePermit>,
}

impl Seat {
    pub fn new(forks: ForkPair, permit: Option<OwnedSemaphorePermit>) -> Self {
        Self { forks, permit }
    }

    pub fn acquisition_order(&self) -> (usize, usize) {
        self.forks.acquisition_order()
    }

    /// Release both forks, then hand the permit back
    pub fn leave(self) -> Result<()> {
        let Seat { forks, permit } = self;
        let released = forks.release();
        drop(permit);
        released
    }
}

/// A deadlock-avoidance discipline for taking two forks
#[async_trait]
pub trait DiningStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Acquire both forks of `philosopher`, moving it through the acquiring
    /// states. Returns once the philosopher may eat.
    async fn seat(
        &self,
        philosopher: &mut Philosopher,
        table: &Table,
        shutdown: &ShutdownSignal,
    ) -> Result<Seat>;
}

/// Every philosopher takes the lower-numbered fork first. The total order on
/// forks rules out a circular wait.
#[derive(Debug, Default)]
pub struct GlobalOrder;

#[async_trait]
impl DiningStrategy for GlobalOrder {
    fn name(&self) -> &'static str {
        "global_order"
    }

    async fn seat(
        &self,
        philosopher: &mut Philosopher,
        table: &Table,
        shutdown: &ShutdownSignal,
    ) -> Result<Seat> {
        let id = philosopher.id();
        let (low, high) = acquisition_order(philosopher.left(), philosopher.right());

        philosopher.transition(PhilosopherState::AcquiringFirst)?;
        let first = table.fork(low).acquire(id, table.monitor(), shutdown).await?;

        philosopher.transition(PhilosopherState::AcquiringSecond)?;
        let second = table.fork(high).acquire(id, table.monitor(), shutdown).await?;

        Ok(Seat {
            forks: ForkPair::new(first, second),
            permit: None,
        })
    }
}

/// Admission control: at most `permits` philosophers (fewer than the seats)
/// reach for forks at once, so the ring can never close into a cycle.
/// Forks are then taken left first, right second.
#[derive(Debug)]
pub struct Butler {
    permits: usize,
    gate: Arc<Semaphore>,
}

impl Butler {
    pub fn new(permits: usize) -> Self {
        Self {
            permits,
            gate: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Permits currently not handed out
    pub fn available(&self) -> usize {
        self.gate.available_permits()
    }
}

#[async_trait]
impl DiningStrategy for Butler {
    fn name(&self) -> &'static str {
        "butler"
    }

    async fn seat(
        &self,
        philosopher: &mut Philosopher,
        table: &Table,
        shutdown: &ShutdownSignal,
    ) -> Result<Seat> {
        let id = philosopher.id();
        if self.permits >= table.seats() {
            return Err(KernelError::configuration_field(
                format!(
                    "butler with {} permits cannot guard {} seats",
                    self.permits,
                    table.seats()
                ),
                "strategy.permits",
            ));
        }

        philosopher.transition(PhilosopherState::AwaitingAdmission)?;
        debug!(philosopher = id, available = self.available(), "Asking the butler for a seat");
        let permit = shutdown
            .guard("butler admission", Arc::clone(&self.gate).acquire_owned())
            .await?
            .map_err(|_| KernelError::cancelled("butler admission"))?;
        info!(philosopher = id, "[filósofo {}] admitido por el mayordomo", id);

        philosopher.transition(PhilosopherState::AcquiringFirst)?;
        let first = table
            .fork(philosopher.left())
            .acquire(id, table.monitor(), shutdown)
            .await?;

        philosopher.transition(PhilosopherState::AcquiringSecond)?;
        let second = table
            .fork(philosopher.right())
            .acquire(id, table.monitor(), shutdown)
            .await?;

        Ok(Seat {
            forks: ForkPair::new(first, second),
            permit: Some(permit),
        })
    }
}

/// Build the strategy a configuration selects
pub fn build_strategy(strategy: Strategy) -> Arc<dyn DiningStrategy> {
    match strategy {
        Strategy::GlobalOrder => Arc::new(GlobalOrder),
        Strategy::Butler { permits } => Arc::new(Butler::new(permits)),
    }
}
