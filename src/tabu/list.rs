//! Tabu list with size and tenure limits.

use std::collections::VecDeque;
use std::time::Instant;

use super::types::MoveKey;

/// Time source for tabu tenure.
pub trait Clock {
    fn now(&self) -> u64;

    /// Called once per search iteration.
    fn tick(&mut self) {}
}

/// Counts iterations.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    ticks: u64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ticks: u64) {
        self.ticks += ticks;
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> u64 {
        self.ticks
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }
}

/// Milliseconds since construction.
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for WallClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// FIFO of recently applied moves.
///
/// A move stays tabu until `tenure` ticks have passed since it was added
/// or `max_size` newer moves have pushed it out. Expired moves are purged
/// lazily on every query and insertion.
#[derive(Debug, Clone)]
pub struct TabuList<C: Clock = LogicalClock> {
    entries: VecDeque<(MoveKey, u64)>,
    max_size: usize,
    tenure: u64,
    clock: C,
}

impl TabuList<LogicalClock> {
    pub fn new(max_size: usize, tenure: u64) -> Self {
        Self::with_clock(max_size, tenure, LogicalClock::new())
    }
}

impl<C: Clock> TabuList<C> {
    pub fn with_clock(max_size: usize, tenure: u64, clock: C) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
            tenure,
            clock,
        }
    }

    fn purge(&mut self) {
        let now = self.clock.now();
        while self
            .entries
            .front()
            .is_some_and(|(_, added)| now.saturating_sub(*added) > self.tenure)
        {
            self.entries.pop_front();
        }
    }

    pub fn add(&mut self, key: MoveKey) {
        self.purge();
        self.entries.push_back((key, self.clock.now()));
        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
    }

    pub fn contains(&mut self, key: &MoveKey) -> bool {
        self.purge();
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&mut self) -> usize {
        self.purge();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn tick(&mut self) {
        self.clock.tick();
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PackageId;
    use crate::route::Route;
    use crate::tabu::TabuMove;
    use crate::test_fixtures::corridor;

    fn keys(n: usize) -> Vec<MoveKey> {
        let fx = corridor();
        (0..n)
            .map(|i| {
                TabuMove::Insert {
                    package: PackageId(i),
                    route: Route::direct(fx.ac),
                }
                .key(&fx.network)
            })
            .collect()
    }

    #[test]
    fn test_tenure_expiry() {
        let k = keys(1).remove(0);
        let mut list = TabuList::new(10, 3);
        list.add(k.clone());
        assert!(list.contains(&k));

        list.clock_mut().advance(3);
        assert!(list.contains(&k));

        list.clock_mut().advance(1);
        assert!(!list.contains(&k));
        assert!(list.is_empty());
    }

    #[test]
    fn test_size_limit_drops_oldest() {
        let ks = keys(4);
        let mut list = TabuList::new(3, 100);
        for k in &ks {
            list.add(k.clone());
            list.tick();
        }
        assert_eq!(list.len(), 3);
        assert!(!list.contains(&ks[0]));
        assert!(list.contains(&ks[3]));
    }

    #[test]
    fn test_clear() {
        let ks = keys(2);
        let mut list = TabuList::new(5, 5);
        list.add(ks[0].clone());
        list.add(ks[1].clone());
        list.clear();
        assert!(!list.contains(&ks[0]));
        assert_eq!(list.len(), 0);
    }
}
