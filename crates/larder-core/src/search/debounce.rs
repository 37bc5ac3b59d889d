//! Keystroke debouncing for the search input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period after the last keystroke before a search fires.
pub const KEYWORD_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coalesces rapid keyword edits into a single emission.
///
/// Each [`input`](Self::input) cancels the previous pending timer and starts
/// a new one; only the last value of a burst is delivered on the receiver
/// once the quiet period elapses. One debouncer per active search input.
pub struct KeywordDebouncer {
    delay: Duration,
    tx: mpsc::UnboundedSender<String>,
    pending: Option<JoinHandle<()>>,
}

impl KeywordDebouncer {
    /// Debouncer with the standard quiet period.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::with_delay(KEYWORD_DEBOUNCE)
    }

    /// Debouncer with a custom quiet period (tests use short ones).
    #[must_use]
    pub fn with_delay(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    /// Record a keystroke, restarting the quiet-period timer.
    pub fn input(&mut self, keyword: impl Into<String>) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        let keyword = keyword.into();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver may be gone when the view unmounted; nothing to do.
            let _ = tx.send(keyword);
        }));
    }

    /// Drop any pending emission without firing it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for KeywordDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
