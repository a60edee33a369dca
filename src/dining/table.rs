use super::fork::Fork;
use super::monitor::TableMonitor;
use std::sync::Arc;

/// Order in which a philosopher must take the forks `a` and `b` under the
/// global ordering discipline: lower id first.
///
/// Compares the fork ids directly, never the philosopher id. At the
/// wraparound seat the right fork (0) is lower than the left fork (n - 1).
pub fn acquisition_order(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Forks arranged in a ring, one between each pair of neighbours
#[derive(Debug)]
pub struct Table {
    forks: Vec<Fork>,
    monitor: Arc<TableMonitor>,
}

impl Table {
    pub fn new(seats: usize) -> Self {
        Self {
            forks: (0..seats).map(Fork::new).collect(),
            monitor: Arc::new(TableMonitor::new(seats)),
        }
    }

    pub fn seats(&self) -> usize {
        self.forks.len()
    }

    pub fn fork(&self, id: usize) -> &Fork {
        &self.forks[id]
    }

    pub fn monitor(&self) -> &Arc<TableMonitor> {
        &self.monitor
    }

    /// (left, right) forks of a seat: its own id and the next one round the ring
    pub fn forks_for(&self, philosopher: usize) -> (usize, usize) {
        (philosopher, (philosopher + 1) % self.seats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_adjacency() {
        let table = Table::new(5);
        assert_eq!(table.forks_for(0), (0, 1));
        assert_eq!(table.forks_for(3), (3, 4));
        assert_eq!(table.forks_for(4), (4, 0));
    }

    #[test]
    fn test_wraparound_seat_takes_fork_zero_first() {
        let table = Table::new(5);
        let (left, right) = table.forks_for(4);
        assert_eq!(acquisition_order(left, right), (0, 4));
        assert_eq!(acquisition_order(right, left), (0, 4));
    }

    #[test]
    fn test_interior_seats_take_left_first() {
        let table = Table::new(5);
        for philosopher in 0..4 {
            let (left, right) = table.forks_for(philosopher);
            assert_eq!(acquisition_order(left, right), (left, right));
        }
    }
}
