use super::philosopher::{Philosopher, PhilosopherSummary};
use super::strategy::{build_strategy, DiningStrategy};
use super::table::Table;
use crate::core::config::{DiningConfig, Strategy};
use crate::core::delay::DelaySource;
use crate::core::errors::{KernelError, Result};
use crate::core::shutdown::shutdown_channel;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Grace period for philosophers to observe cancellation after the watchdog fires
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Outcome of one completed run
#[derive(Debug, Clone, Serialize)]
pub struct DiningReport {
    pub run_id: String,
    pub strategy: String,
    pub philosophers: usize,
    pub rounds: usize,
    /// Meals per philosopher, indexed by seat
    pub meals: Vec<usize>,
    /// Highest holder count seen on each fork
    pub peak_fork_holders: Vec<usize>,
    /// Highest number of philosophers holding at least one fork at once
    pub peak_concurrent_diners: usize,
    pub elapsed_ms: u64,
    pub summaries: Vec<PhilosopherSummary>,
}

impl DiningReport {
    pub fn all_satisfied(&self) -> bool {
        self.meals.len() == self.philosophers && self.meals.iter().all(|&m| m == self.rounds)
    }
}

/// Runs a table of philosophers under one strategy and joins every one of
/// them before reporting.
pub struct Coordinator {
    config: DiningConfig,
    strategy: Arc<dyn DiningStrategy>,
    delays: Arc<dyn DelaySource>,
}

impl Coordinator {
    /// Coordinator for the strategy selected in `config`
    pub fn new(config: DiningConfig, delays: Arc<dyn DelaySource>) -> Result<Self> {
        config.validate()?;
        let strategy = build_strategy(config.strategy);
        Ok(Self {
            config,
            strategy,
            delays,
        })
    }

    /// Coordinator for a caller-supplied strategy; `config.strategy` is ignored
    pub fn with_strategy(
        config: DiningConfig,
        strategy: Arc<dyn DiningStrategy>,
        delays: Arc<dyn DelaySource>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            strategy,
            delays,
        })
    }

    pub fn config(&self) -> &DiningConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Run with the configured table size and round count
    pub async fn run_configured(&self) -> Result<DiningReport> {
        self.run(self.config.philosophers, self.config.rounds).await
    }

    /// Seat `philosophers` philosophers for `rounds` rounds each.
    ///
    /// Fails with `Timeout` if the watchdog expires, or `Deadlock` if it
    /// expires while the wait-for graph holds a cycle. Either way every
    /// philosopher is cancelled and joined before returning.
    #[instrument(skip(self), fields(strategy = self.strategy.name()))]
    pub async fn run(&self, philosophers: usize, rounds: usize) -> Result<DiningReport> {
        let config = DiningConfig {
            philosophers,
            rounds,
            ..self.config.clone()
        };
        config.validate()?;

        let run_id = Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            philosophers,
            rounds,
            "Starting dining run with strategy {}",
            self.strategy.name()
        );

        let started = Instant::now();
        let table = Arc::new(Table::new(philosophers));
        let (trigger, shutdown) = shutdown_channel();

        let mut diners = JoinSet::new();
        for id in 0..philosophers {
            let philosopher = Philosopher::new(id, &table, rounds);
            diners.spawn(philosopher.dine(
                Arc::clone(&table),
                Arc::clone(&self.strategy),
                Arc::clone(&self.delays),
                shutdown.clone(),
            ));
        }

        let watchdog = config.watchdog();
        let summaries = match timeout(watchdog, join_diners(&mut diners)).await {
            Ok(Ok(summaries)) => summaries,
            Ok(Err(e)) => {
                error!(run_id = %run_id, "Dining run failed: {}", e);
                trigger.trigger();
                drain(&mut diners).await;
                return Err(e);
            }
            Err(_) => {
                let stalled = table.monitor().wait_for_cycle();
                trigger.trigger();
                drain(&mut diners).await;
                return Err(match stalled {
                    Some(cycle) => {
                        error!(run_id = %run_id, "Deadlock: {}", cycle);
                        KernelError::deadlock(cycle)
                    }
                    None => {
                        warn!(run_id = %run_id, "Watchdog expired after {:?}", watchdog);
                        KernelError::timeout("dining run", watchdog.as_millis() as u64)
                    }
                });
            }
        };

        let snapshot = table.monitor().snapshot();
        let report = DiningReport {
            run_id,
            strategy: self.strategy.name().to_string(),
            philosophers,
            rounds,
            meals: snapshot.meals,
            peak_fork_holders: snapshot.peak_fork_holders,
            peak_concurrent_diners: snapshot.peak_concurrent_diners,
            elapsed_ms: started.elapsed().as_millis() as u64,
            summaries,
        };
        info!(
            run_id = %report.run_id,
            elapsed_ms = report.elapsed_ms,
            "Todos los filósofos han comido sin deadlock ({})",
            self.strategy.name()
        );
        Ok(report)
    }
}

/// Join every philosopher, stopping at the first failure
async fn join_diners(
    diners: &mut JoinSet<Result<PhilosopherSummary>>,
) -> Result<Vec<PhilosopherSummary>> {
    let mut summaries = Vec::with_capacity(diners.len());
    while let Some(joined) = diners.join_next().await {
        summaries.push(joined??);
    }
    summaries.sort_by_key(|s| s.id);
    Ok(summaries)
}

/// Let cancelled philosophers unwind, then abort whatever is left
async fn drain(diners: &mut JoinSet<Result<PhilosopherSummary>>) {
    let unwound = timeout(CANCEL_GRACE, async {
        while diners.join_next().await.is_some() {}
    })
    .await;
    if unwound.is_err() {
        diners.shutdown().await;
    }
}

/// One run of the reference table (5 philosophers, 3 rounds) under `strategy`
pub async fn run_strategy(
    strategy: Strategy,
    delays: Arc<dyn DelaySource>,
) -> Result<DiningReport> {
    let config = DiningConfig {
        strategy,
        ..Default::default()
    };
    Coordinator::new(config, delays)?.run_configured().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::delay::NoDelay;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_overrides_table_size() {
        let coordinator = Coordinator::new(DiningConfig::default(), Arc::new(NoDelay)).unwrap();
        let report = coordinator.run(3, 2).await.unwrap();
        assert_eq!(report.philosophers, 3);
        assert_eq!(report.meals, vec![2, 2, 2]);
        assert!(report.all_satisfied());
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_override() {
        let config = DiningConfig::with_butler();
        let coordinator = Coordinator::new(config, Arc::new(NoDelay)).unwrap();
        // four permits cannot guard four seats
        let err = coordinator.run(4, 1).await.unwrap_err();
        assert_eq!(err.category(), "configuration");
    }
}
