//! Single-slot wait/notify bridging the viewer's "playback finished" signal
//! into the orchestrator's sequential flow.
//!
//! At most one wait is outstanding. A signal releases the outstanding wait or,
//! when nothing is waiting, is dropped. A wait that sees no signal before its
//! deadline resolves anyway: a missing signal is treated as "playback done".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// How a [`CompletionWait`] resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signalled,
    TimedOut,
    /// A newer wait replaced this one before it resolved.
    Superseded,
}

struct Pending {
    id: u64,
    deadline: Instant,
    release: oneshot::Sender<()>,
}

#[derive(Default)]
struct Slot {
    pending: Mutex<Option<Pending>>,
    next_id: AtomicU64,
}

#[derive(Clone, Default)]
pub struct CompletionGate {
    slot: Arc<Slot>,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a wait immediately; a signal arriving before the returned
    /// handle is awaited still releases it.
    pub fn open_wait(&self, timeout: Duration) -> CompletionWait {
        let id = self.slot.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + timeout;
        let (release, released) = oneshot::channel();

        let previous = self.lock().replace(Pending {
            id,
            deadline,
            release,
        });
        if previous.is_some() {
            tracing::warn!("completion wait opened while another was pending; replacing it");
        }

        CompletionWait {
            gate: self.clone(),
            id,
            deadline,
            released,
        }
    }

    /// Releases the outstanding wait, if any. Returns whether one was released.
    pub fn signal(&self) -> bool {
        match self.lock().take() {
            Some(pending) => {
                let remaining = pending.deadline.saturating_duration_since(Instant::now());
                tracing::debug!("playback done signalled ({:?} before deadline)", remaining);
                // The waiter may have been dropped; nothing else to release.
                let _ = pending.release.send(());
                true
            }
            None => {
                tracing::debug!("playback done signal with no pending wait, dropped");
                false
            }
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.lock().is_some()
    }

    fn clear_if_owner(&self, id: u64) {
        let mut pending = self.lock();
        if pending.as_ref().is_some_and(|p| p.id == id) {
            *pending = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Pending>> {
        self.slot
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open wait on a [`CompletionGate`]. Never fails.
pub struct CompletionWait {
    gate: CompletionGate,
    id: u64,
    deadline: Instant,
    released: oneshot::Receiver<()>,
}

impl CompletionWait {
    pub async fn wait(self) -> WaitOutcome {
        match tokio::time::timeout_at(self.deadline, self.released).await {
            Ok(Ok(())) => WaitOutcome::Signalled,
            Ok(Err(_)) => WaitOutcome::Superseded,
            Err(_) => {
                self.gate.clear_if_owner(self.id);
                tracing::info!("[timeout] speech-done not received, continuing");
                WaitOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn signal_without_wait_is_a_no_op() {
        let gate = CompletionGate::new();
        assert!(!gate.signal());
        assert!(!gate.is_waiting());

        // A stale signal is not buffered for the next wait.
        let outcome = gate.open_wait(Duration::from_secs(5)).wait().await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_releases_pending_wait() {
        let gate = CompletionGate::new();
        let wait = gate.open_wait(Duration::from_secs(120));
        let started = Instant::now();

        let signaller = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            signaller.signal();
        });

        assert_eq!(wait.wait().await, WaitOutcome::Signalled);
        assert!(started.elapsed() < Duration::from_secs(8));
        assert!(!gate.is_waiting());
    }

    #[tokio::test(start_paused = true)]
    async fn signal_before_await_is_not_lost() {
        let gate = CompletionGate::new();
        let wait = gate.open_wait(Duration::from_secs(120));
        assert!(gate.signal());
        assert_eq!(wait.wait().await, WaitOutcome::Signalled);
    }

    #[tokio::test(start_paused = true)]
    async fn double_signal_resolves_once() {
        let gate = CompletionGate::new();
        let wait = gate.open_wait(Duration::from_secs(120));
        assert!(gate.signal());
        assert!(!gate.signal());
        assert_eq!(wait.wait().await, WaitOutcome::Signalled);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_signal() {
        let gate = CompletionGate::new();
        let timeout = Duration::from_secs(120);
        let started = Instant::now();

        let outcome = gate.open_wait(timeout).wait().await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        let elapsed = started.elapsed();
        assert!(elapsed >= timeout && elapsed < timeout + Duration::from_millis(50));
        assert!(!gate.is_waiting());
        // Late signal after the timeout is dropped.
        assert!(!gate.signal());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_wait_supersedes_older() {
        let gate = CompletionGate::new();
        let first = gate.open_wait(Duration::from_secs(1));
        let second = gate.open_wait(Duration::from_secs(10));

        assert_eq!(first.wait().await, WaitOutcome::Superseded);
        assert!(gate.is_waiting());
        assert!(gate.signal());
        assert_eq!(second.wait().await, WaitOutcome::Signalled);
    }
}
