use rand::Rng;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    OnceLock,
};

/// A round-robin cursor shared by all requests handled by a router.
///
/// The cursor starts at a random offset so that independently started routers
/// do not all begin with the same host.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: OnceLock<AtomicUsize>,
}

// === impl RoundRobin ===

impl RoundRobin {
    /// Returns an index into a set of `len` hosts, or `None` if the set is
    /// empty.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let cursor = self
            .cursor
            .get_or_init(|| AtomicUsize::new(rand::thread_rng().gen_range(0..len)));
        // Each caller claims a distinct position, even when racing the seed.
        Some(cursor.fetch_add(1, Ordering::Relaxed) % len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, sync::Mutex, thread};

    #[test]
    fn empty() {
        assert_eq!(RoundRobin::default().next_index(0), None);
    }

    #[test]
    fn fair_over_stable_set() {
        const HOSTS: usize = 7;
        const REQUESTS: usize = 1000;

        let rr = RoundRobin::default();
        let mut counts = HashMap::<usize, usize>::new();
        for _ in 0..REQUESTS {
            *counts.entry(rr.next_index(HOSTS).unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), HOSTS);
        for (i, n) in counts {
            assert!(
                n == REQUESTS / HOSTS || n == REQUESTS / HOSTS + 1,
                "host {i} selected {n} times"
            );
        }
    }

    #[test]
    fn consecutive() {
        let rr = RoundRobin::default();
        let first = rr.next_index(5).unwrap();
        for i in 1..20 {
            assert_eq!(rr.next_index(5), Some((first + i) % 5));
        }
    }

    #[test]
    fn tolerates_changing_sets() {
        let rr = RoundRobin::default();
        for len in [3, 1, 8, 2, 5, 1] {
            let i = rr.next_index(len).unwrap();
            assert!(i < len);
        }
    }

    #[test]
    fn concurrent_callers_stay_in_range() {
        const WORKERS: usize = 8;
        const REQUESTS: usize = 2000;

        let rr = RoundRobin::default();
        thread::scope(|s| {
            for w in 0..WORKERS {
                let rr = &rr;
                s.spawn(move || {
                    for r in 0..REQUESTS {
                        let len = 1 + (w + r) % 11;
                        let i = rr.next_index(len).expect("hosts are never empty");
                        assert!(i < len, "index {i} out of range for {len} hosts");
                    }
                });
            }
        });
    }

    #[test]
    fn concurrent_callers_are_fair() {
        const HOSTS: usize = 5;
        const WORKERS: usize = 8;
        const REQUESTS: usize = 500;

        let rr = RoundRobin::default();
        let counts = Mutex::new(vec![0usize; HOSTS]);
        thread::scope(|s| {
            for _ in 0..WORKERS {
                s.spawn(|| {
                    let mut local = vec![0usize; HOSTS];
                    for _ in 0..REQUESTS {
                        local[rr.next_index(HOSTS).unwrap()] += 1;
                    }
                    let mut counts = counts.lock().unwrap();
                    for (total, n) in counts.iter_mut().zip(local) {
                        *total += n;
                    }
                });
            }
        });

        // Every call claims a distinct cursor position, so totals are exact.
        let counts = counts.into_inner().unwrap();
        assert_eq!(counts, vec![WORKERS * REQUESTS / HOSTS; HOSTS]);
    }
}
