use crate::transcript::Utterance;
use dialogue_types::ServerMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::broadcast::{self, error::RecvError};

pub type ServerTx = broadcast::Sender<ServerMessage>;
pub type ServerRx = broadcast::Receiver<ServerMessage>;

/// Fans orchestrator events out to every connected viewer.
pub struct Broadcaster {
    tx: ServerTx,
    viewers: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            viewers: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Sends to every current viewer and returns how many received it. With no
    /// viewers connected the message is simply dropped.
    pub fn send(&self, message: ServerMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    /// Registers a new viewer. Messages sent from now on are delivered to it.
    pub fn connect(&self) -> Viewer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let total = self.viewers.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("Client {} connected ({} total)", id, total);
        Viewer {
            id,
            rx: self.tx.subscribe(),
            viewers: self.viewers.clone(),
        }
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.load(Ordering::SeqCst)
    }

    /// Messages that bring a joining viewer up to date: the topic, then every
    /// retained utterance as a finished turn. No `start` events are replayed.
    pub fn catch_up(topic: &str, tail: &[Utterance]) -> Vec<ServerMessage> {
        std::iter::once(ServerMessage::topic(topic))
            .chain(
                tail.iter()
                    .map(|u| ServerMessage::final_text(u.speaker, &u.text)),
            )
            .collect()
    }
}

/// One connected viewer's handle. Dropping it removes the viewer.
pub struct Viewer {
    id: u64,
    rx: ServerRx,
    viewers: Arc<AtomicUsize>,
}

impl Viewer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next broadcast message. A viewer that fell behind skips what it
    /// missed. Returns `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Client {} lagged, skipped {} messages", self.id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        let remaining = self.viewers.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        tracing::info!("Client {} disconnected ({} total)", self.id, remaining);
    }
}
