use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

/// Phase of the sweep state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Idle,
    Running,
}

impl fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepPhase::Idle => f.write_str("idle"),
            SweepPhase::Running => f.write_str("running"),
        }
    }
}

/// Tracks whether a sweep is in flight
///
/// The only transition into `Running` is a compare-and-set from `Idle`, so
/// two callers racing to start a sweep produce exactly one winner. The winner
/// holds a [`SweepGuard`]; dropping it (on success, error, or panic) returns
/// the state to `Idle`. The guard owns an `Arc` to the state so it can be
/// moved into a spawned task.
#[derive(Debug)]
pub struct SweepState {
    phase: AtomicU8,
}

impl SweepState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(IDLE),
        }
    }

    /// Attempts the `Idle -> Running` transition
    ///
    /// # Returns
    ///
    /// * `Some(SweepGuard)` - This caller owns the running sweep
    /// * `None` - A sweep is already running; nothing changed
    pub fn try_start(self: &Arc<Self>) -> Option<SweepGuard> {
        self.phase
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepGuard {
                state: Arc::clone(self),
            })
    }

    pub fn phase(&self) -> SweepPhase {
        match self.phase.load(Ordering::Acquire) {
            RUNNING => SweepPhase::Running,
            _ => SweepPhase::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == SweepPhase::Running
    }
}

impl Default for SweepState {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of the running sweep; releases it on drop
#[derive(Debug)]
pub struct SweepGuard {
    state: Arc<SweepState>,
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.state.phase.store(IDLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    #[test]
    fn test_new_state_is_idle() {
        let state = Arc::new(SweepState::new());
        assert_eq!(state.phase(), SweepPhase::Idle);
        assert!(!state.is_running());
    }

    #[test]
    fn test_second_start_rejected_while_running() {
        let state = Arc::new(SweepState::new());

        let guard = state.try_start();
        assert!(guard.is_some());
        assert!(state.is_running());

        assert!(state.try_start().is_none());
        assert!(state.is_running());

        drop(guard);
        assert!(!state.is_running());
        assert!(state.try_start().is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let state = Arc::new(SweepState::new());
        let state_clone = state.clone();

        let result = std::thread::spawn(move || {
            let _guard = state_clone.try_start().unwrap();
            panic!("sweep blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(state.phase(), SweepPhase::Idle);
    }

    #[test]
    fn test_racing_starters_single_winner() {
        let state = Arc::new(SweepState::new());
        let barrier = Arc::new(Barrier::new(8));
        let winners = Arc::new(AtomicUsize::new(0));
        let hold = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                let barrier = barrier.clone();
                let winners = winners.clone();
                let hold = hold.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let guard = state.try_start();
                    if guard.is_some() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    // Keep any guard alive until every thread has tried
                    hold.wait();
                    drop(guard);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!state.is_running());
    }
}
