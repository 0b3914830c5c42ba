use std::{
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

/// The static set of cluster management endpoints, dispatched in turn.
#[derive(Debug)]
pub struct ManagementDestinations {
    dests: Vec<String>,
    next: AtomicUsize,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ManagementError {
    #[error("no management API destinations configured")]
    Empty,
}

// === impl ManagementDestinations ===

impl ManagementDestinations {
    pub fn new(dests: Vec<String>) -> Result<Self, ManagementError> {
        if dests.is_empty() {
            return Err(ManagementError::Empty);
        }
        Ok(Self {
            dests,
            next: AtomicUsize::new(0),
        })
    }

    /// Returns the destination the next call to [`Self::next`] returns,
    /// absent concurrent callers.
    pub fn peek(&self) -> &str {
        let i = self.next.load(Ordering::Relaxed) % self.dests.len();
        &self.dests[i]
    }

    pub fn next(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.dests.len();
        &self.dests[i]
    }

    pub fn len(&self) -> usize {
        self.dests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dests.is_empty()
    }
}

/// Parses a whitespace-separated list of `host:port` destinations.
impl FromStr for ManagementDestinations {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split_whitespace().map(str::to_string).collect())
    }
}
