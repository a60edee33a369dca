use crate::core::errors::{KernelError, Result};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::DiGraph;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct ForkCounters {
    holders: AtomicUsize,
    peak: AtomicUsize,
}

/// Who waits on which fork, and who owns which fork
#[derive(Debug, Default)]
struct WaitFor {
    waiting: HashMap<usize, usize>,
    owners: HashMap<usize, usize>,
}

/// Point-in-time copy of the monitor's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    pub peak_fork_holders: Vec<usize>,
    pub peak_concurrent_diners: usize,
    pub meals: Vec<usize>,
}

/// Instrumentation shared by every fork at one table.
///
/// Counts holders per fork and philosophers holding at least one fork, and
/// keeps the wait-for relation so a stalled run can be checked for a cycle.
#[derive(Debug)]
pub struct TableMonitor {
    forks: Vec<ForkCounters>,
    held_by: Vec<AtomicUsize>,
    diners: AtomicUsize,
    peak_diners: AtomicUsize,
    meals: Vec<AtomicUsize>,
    wait_for: Mutex<WaitFor>,
}

impl TableMonitor {
    pub fn new(seats: usize) -> Self {
        Self {
            forks: (0..seats).map(|_| ForkCounters::default()).collect(),
            held_by: (0..seats).map(|_| AtomicUsize::new(0)).collect(),
            diners: AtomicUsize::new(0),
            peak_diners: AtomicUsize::new(0),
            meals: (0..seats).map(|_| AtomicUsize::new(0)).collect(),
            wait_for: Mutex::new(WaitFor::default()),
        }
    }

    fn wait_for(&self) -> std::sync::MutexGuard<'_, WaitFor> {
        self.wait_for
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn waiting(&self, philosopher: usize, fork: usize) {
        self.wait_for().waiting.insert(philosopher, fork);
    }

    /// The wait ended without the fork (cancellation)
    pub fn gave_up(&self, philosopher: usize) {
        self.wait_for().waiting.remove(&philosopher);
    }

    /// Record that `philosopher` now holds `fork`.
    /// Fails if the fork already had a holder.
    pub fn acquired(&self, philosopher: usize, fork: usize) -> Result<()> {
        let counters = &self.forks[fork];
        let previous = counters.holders.fetch_add(1, Ordering::AcqRel);
        counters.peak.fetch_max(previous + 1, Ordering::AcqRel);
        if previous != 0 {
            counters.holders.fetch_sub(1, Ordering::AcqRel);
            return Err(KernelError::protocol_violation(
                format!("fork {}", fork),
                format!(
                    "philosopher {} acquired a fork already held ({} holders)",
                    philosopher, previous
                ),
            ));
        }

        {
            let mut wait_for = self.wait_for();
            wait_for.waiting.remove(&philosopher);
            wait_for.owners.insert(fork, philosopher);
        }

        if self.held_by[philosopher].fetch_add(1, Ordering::AcqRel) == 0 {
            let diners = self.diners.fetch_add(1, Ordering::AcqRel) + 1;
            self.peak_diners.fetch_max(diners, Ordering::AcqRel);
        }
        Ok(())
    }

    /// Record that `philosopher` let go of `fork`.
    /// Fails if the fork had no holder.
    pub fn released(&self, philosopher: usize, fork: usize) -> Result<()> {
        let released = self.forks[fork]
            .holders
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| h.checked_sub(1));
        if released.is_err() {
            return Err(KernelError::protocol_violation(
                format!("fork {}", fork),
                format!("philosopher {} released a fork nobody held", philosopher),
            ));
        }

        self.wait_for().owners.remove(&fork);

        if self.held_by[philosopher].fetch_sub(1, Ordering::AcqRel) == 1 {
            self.diners.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(())
    }

    pub fn ate(&self, philosopher: usize) {
        self.meals[philosopher].fetch_add(1, Ordering::Relaxed);
    }

    pub fn holders(&self, fork: usize) -> usize {
        self.forks[fork].holders.load(Ordering::Acquire)
    }

    pub fn concurrent_diners(&self) -> usize {
        self.diners.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            peak_fork_holders: self
                .forks
                .iter()
                .map(|c| c.peak.load(Ordering::Acquire))
                .collect(),
            peak_concurrent_diners: self.peak_diners.load(Ordering::Acquire),
            meals: self
                .meals
                .iter()
                .map(|m| m.load(Ordering::Relaxed))
                .collect(),
        }
    }

    /// Describe a cycle in the current wait-for graph, if there is one.
    ///
    /// Nodes are philosophers and forks; a philosopher points at the fork it
    /// waits for and a fork points at the philosopher holding it.
    pub fn wait_for_cycle(&self) -> Option<String> {
        let wait_for = self.wait_for();
        let mut graph = DiGraph::<String, ()>::new();
        let philosophers: Vec<_> = (0..self.held_by.len())
            .map(|p| graph.add_node(format!("p{}", p)))
            .collect();
        let forks: Vec<_> = (0..self.forks.len())
            .map(|f| graph.add_node(format!("f{}", f)))
            .collect();

        for (&philosopher, &fork) in &wait_for.waiting {
            graph.add_edge(philosophers[philosopher], forks[fork], ());
        }
        for (&fork, &philosopher) in &wait_for.owners {
            graph.add_edge(forks[fork], philosophers[philosopher], ());
        }

        if !is_cyclic_directed(&graph) {
            return None;
        }
        tarjan_scc(&graph)
            .into_iter()
            .find(|component| component.len() > 1)
            .map(|component| {
                let mut names: Vec<_> = component.iter().map(|&n| graph[n].clone()).collect();
                names.sort();
                names.join(", ")
            })
    }
}
