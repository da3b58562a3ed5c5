use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debounce: keeps only the latest item and releases it once
/// no newer item has arrived for a full quiet window.
///
/// The owner drives it from its event loop, waiting on `deadline()`.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replace any pending item and restart the quiet window
    pub fn push(&mut self, item: T) {
        self.pending = Some((item, Instant::now() + self.window));
    }

    /// When the pending item is due, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Take the pending item if its quiet window has passed
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.pending.take().map(|(item, _)| item),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep_until};

    const WINDOW: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last() {
        let mut debouncer = Debouncer::new(WINDOW);
        for i in 0..5 {
            debouncer.push(i);
            advance(Duration::from_millis(100)).await;
        }
        assert_eq!(debouncer.take_due(Instant::now()), None);

        sleep_until(debouncer.deadline().unwrap()).await;
        assert_eq!(debouncer.take_due(Instant::now()), Some(4));
        assert_eq!(debouncer.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_items_each_release() {
        let mut debouncer = Debouncer::new(WINDOW);
        let mut released = Vec::new();
        for i in 0..3 {
            debouncer.push(i);
            advance(Duration::from_millis(600)).await;
            released.extend(debouncer.take_due(Instant::now()));
        }
        assert_eq!(released, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_restarts_window() {
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push("a");
        let first = debouncer.deadline().unwrap();
        advance(Duration::from_millis(400)).await;
        debouncer.push("b");
        assert_eq!(debouncer.deadline().unwrap() - first, Duration::from_millis(400));

        advance(Duration::from_millis(200)).await;
        assert_eq!(debouncer.take_due(Instant::now()), None);
    }
}
