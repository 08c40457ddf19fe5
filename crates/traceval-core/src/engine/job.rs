//! Shared per-batch bookkeeping

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters shared by every in-flight evaluation of a batch.
///
/// Created at batch start, discarded at batch end. Updates are atomic with
/// respect to concurrent completions.
#[derive(Debug, Default)]
pub struct JobState {
    completed: AtomicUsize,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished example; returns the new completed count
    pub fn record_completion(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_completions_are_all_counted() {
        let state = Arc::new(JobState::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                state.record_completion();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(state.completed(), 50);
    }
}
