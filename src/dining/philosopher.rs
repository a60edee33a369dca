use super::strategy::DiningStrategy;
use super::table::Table;
use crate::core::delay::DelaySource;
use crate::core::errors::{KernelError, Result};
use crate::core::shutdown::ShutdownSignal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Phase of a philosopher's think/eat cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhilosopherState {
    Thinking,
    /// Waiting for a permit from the butler
    AwaitingAdmission,
    /// Waiting for the first fork (the lower-numbered one under global ordering)
    AcquiringFirst,
    /// Holding the first fork, waiting for the second
    AcquiringSecond,
    Eating,
    Releasing,
    Terminated,
}

impl PhilosopherState {
    pub fn can_transition_to(self, next: PhilosopherState) -> bool {
        use PhilosopherState::*;
        matches!(
            (self, next),
            (Thinking, AwaitingAdmission)
                | (Thinking, AcquiringFirst)
                | (AwaitingAdmission, AcquiringFirst)
                | (AcquiringFirst, AcquiringSecond)
                | (AcquiringSecond, Eating)
                | (Eating, Releasing)
                | (Releasing, Thinking)
                | (Releasing, Terminated)
        )
    }
}

/// What one philosopher accomplished during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhilosopherSummary {
    pub id: usize,
    pub meals: usize,
    /// Forks in the order they were taken, one entry per meal
    pub acquisitions: Vec<(usize, usize)>,
}

/// One seat at the table, cycling through a fixed number of rounds
#[derive(Debug)]
pub struct Philosopher {
    id: usize,
    left: usize,
    right: usize,
    rounds: usize,
    completed: usize,
    state: PhilosopherState,
    acquisitions: Vec<(usize, usize)>,
}

impl Philosopher {
    pub fn new(id: usize, table: &Table, rounds: usize) -> Self {
        let (left, right) = table.forks_for(id);
        Self {
            id,
            left,
            right,
            rounds,
            completed: 0,
            state: PhilosopherState::Thinking,
            acquisitions: Vec::with_capacity(rounds),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn left(&self) -> usize {
        self.left
    }

    pub fn right(&self) -> usize {
        self.right
    }

    pub fn state(&self) -> PhilosopherState {
        self.state
    }

    pub fn completed_rounds(&self) -> usize {
        self.completed
    }

    /// Move to `next`, rejecting any step outside the cycle
    pub fn transition(&mut self, next: PhilosopherState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(KernelError::protocol_violation(
                format!("philosopher {}", self.id),
                format!("illegal transition {:?} -> {:?}", self.state, next),
            ));
        }
        debug!(philosopher = self.id, from = ?self.state, to = ?next, "State transition");
        self.state = next;
        Ok(())
    }

    /// Think, take a seat through `strategy`, eat and release, `rounds` times
    pub async fn dine(
        mut self,
        table: Arc<Table>,
        strategy: Arc<dyn DiningStrategy>,
        delays: Arc<dyn DelaySource>,
        shutdown: ShutdownSignal,
    ) -> Result<PhilosopherSummary> {
        let id = self.id;
        for round in 1..=self.rounds {
            if self.state != PhilosopherState::Thinking {
                self.transition(PhilosopherState::Thinking)?;
            }
            info!(philosopher = id, round, "[filósofo {}] pensando...", id);
            shutdown
                .guard("think", tokio::time::sleep(delays.think_delay(id)))
                .await?;

            let seat = strategy.seat(&mut self, &table, &shutdown).await?;
            self.acquisitions.push(seat.acquisition_order());

            self.transition(PhilosopherState::Eating)?;
            info!(philosopher = id, round, "[filósofo {}] COMIENDO", id);
            table.monitor().ate(id);
            shutdown
                .guard("eat", tokio::time::sleep(delays.eat_delay(id)))
                .await?;

            self.transition(PhilosopherState::Releasing)?;
            seat.leave()?;
            info!(philosopher = id, round, "[filósofo {}] soltó tenedores", id);
            self.completed += 1;
        }

        self.transition(PhilosopherState::Terminated)?;
        info!(philosopher = id, "[filósofo {}] satisfecho", id);
        Ok(PhilosopherSummary {
            id,
            meals: self.completed,
            acquisitions: self.acquisitions,
        })
    }
}
