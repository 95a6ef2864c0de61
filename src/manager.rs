use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::store::LogStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProfile {
    pub logical_cores: usize,
    pub worker_threads: usize,
    pub strict_durability: bool, // true = fsync every append, false = OS buffer
}

impl SystemProfile {
    pub fn detect() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::for_cores(cores)
    }

    pub fn for_cores(cores: usize) -> Self {
        // Single core: keep one thread free for disk I/O and skip fsync.
        if cores <= 1 {
            warn!("single core detected; running with 2 workers and buffered writes");
            return Self {
                logical_cores: cores,
                worker_threads: 2,
                strict_durability: false,
            };
        }

        // Capped at 8 workers.
        Self {
            logical_cores: cores,
            worker_threads: cores.min(8),
            strict_durability: true,
        }
    }
}

/// Starts the background compaction thread.
/// Every `every`, folds bike updates in the segment into one entry per bike.
pub fn start_compaction_thread(store: Arc<LogStore>, every: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!("[GC] background compaction every {:?}", every);
        loop {
            thread::sleep(every);
            if let Err(e) = store.compact() {
                error!("[GC] compaction failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_core_profile_relaxes_durability() {
        let p = SystemProfile::for_cores(1);
        assert_eq!(p.worker_threads, 2);
        assert!(!p.strict_durability);
    }

    #[test]
    fn worker_count_is_capped() {
        assert_eq!(SystemProfile::for_cores(4).worker_threads, 4);
        assert_eq!(SystemProfile::for_cores(64).worker_threads, 8);
        assert!(SystemProfile::for_cores(64).strict_durability);
    }
}
