//! The turn-taking loop.
//!
//! Each iteration hands the current utterance to viewers, starts generating
//! the other persona's reply in the background, waits for a playback-done
//! signal (or its timeout), then joins the reply. Generation latency is
//! hidden behind playback; only the longer of the two is ever felt.

use crate::broadcast::{Broadcaster, Viewer};
use crate::error::DialogueError;
use crate::gate::{CompletionGate, WaitOutcome};
use crate::generator::Generator;
use crate::llm::ChatModel;
use dialogue_types::{Persona, ServerMessage};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

pub const DEFAULT_TOPIC: &str = "AI LAB: Building a Logical Model of Time Travel";

/// Pacing knobs for the dialogue loop.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueSettings {
    pub topic: String,
    /// Delay between the opening topic announcement and the first turn.
    pub topic_delay: Duration,
    /// Shortest time a "thinking" indication stays up.
    pub min_thinking: Duration,
    /// How long to wait for a playback-done signal.
    pub completion_timeout: Duration,
    pub pause_min: Duration,
    pub pause_max: Duration,
    /// Pause after a turn whose generation failed twice.
    pub empty_retry_pause: Duration,
    /// Pause after an unexpected error in the loop body.
    pub error_backoff: Duration,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            topic_delay: Duration::from_millis(600),
            min_thinking: Duration::from_secs(2),
            completion_timeout: Duration::from_secs(120),
            pause_min: Duration::from_millis(300),
            pause_max: Duration::from_millis(700),
            empty_retry_pause: Duration::from_secs(3),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl DialogueSettings {
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = topic.to_string();
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    fn inter_turn_pause(&self) -> Duration {
        if self.pause_max <= self.pause_min {
            return self.pause_min;
        }
        let min = self.pause_min.as_millis() as u64;
        let max = self.pause_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..max))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Bootstrapping,
    AwaitingPlaybackDone,
    Advancing,
}

/// Whose turn it is and the utterance not yet handed to viewers.
#[derive(Debug)]
struct ConversationState {
    speaker: Persona,
    pending: Option<String>,
}

/// Clears the running flag however `start` ends, including unwinding or
/// being dropped, so a later trigger can start a fresh conversation.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    phase: &'a watch::Sender<Phase>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(Phase::Idle);
        self.running.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, PartialEq)]
enum TurnOutcome {
    Advanced,
    Stalled,
}

pub struct Orchestrator<M: ChatModel + ?Sized + 'static> {
    generator: Arc<Generator<M>>,
    broadcaster: Broadcaster,
    gate: CompletionGate,
    settings: DialogueSettings,
    running: AtomicBool,
    phase: watch::Sender<Phase>,
}

impl<M: ChatModel + ?Sized + 'static> Orchestrator<M> {
    pub fn new(generator: Generator<M>, settings: DialogueSettings) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            generator: Arc::new(generator),
            broadcaster: Broadcaster::new(64),
            gate: CompletionGate::new(),
            settings,
            running: AtomicBool::new(false),
            phase,
        }
    }

    pub fn topic(&self) -> &str {
        &self.settings.topic
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Entry point for a viewer's "playback finished" report.
    pub fn signal_done(&self) -> bool {
        self.gate.signal()
    }

    /// Registers a viewer and returns the catch-up messages it should be
    /// sent before live events.
    pub async fn join(&self) -> (Viewer, Vec<ServerMessage>) {
        let viewer = self.broadcaster.connect();
        let tail = self.generator.transcript().lock().await.snapshot();
        (viewer, Broadcaster::catch_up(&self.settings.topic, &tail))
    }

    /// Runs the dialogue. Returns `Ok` at once if it is already running and
    /// an error if the opening turn cannot be generated; otherwise it never
    /// returns.
    pub async fn start(&self) -> Result<(), DialogueError> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("conversation already running");
            return Ok(());
        }
        let _running = RunGuard {
            running: &self.running,
            phase: &self.phase,
        };

        self.broadcaster.send(ServerMessage::topic(&self.settings.topic));
        tokio::time::sleep(self.settings.topic_delay).await;

        let mut state = match self.bootstrap(Persona::First).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("{}", e);
                return Err(e);
            }
        };

        loop {
            match self.turn(&mut state).await {
                Ok(TurnOutcome::Advanced) => {}
                Ok(TurnOutcome::Stalled) => {
                    tracing::warn!("[{}] turn stalled, retrying", state.speaker.other());
                }
                Err(e) => {
                    tracing::error!("Loop error: {}", e);
                    tokio::time::sleep(self.settings.error_backoff).await;
                }
            }
        }
    }

    async fn bootstrap(&self, who: Persona) -> Result<ConversationState, DialogueError> {
        self.phase.send_replace(Phase::Bootstrapping);
        let started = Instant::now();
        self.broadcaster.send(ServerMessage::start(who));

        let text = self.generate_detached(who).await?;
        if text.is_empty() {
            return Err(DialogueError::BootstrapFailed(who));
        }
        self.hold_thinking(started).await;

        Ok(ConversationState {
            speaker: who,
            pending: Some(text),
        })
    }

    async fn turn(&self, state: &mut ConversationState) -> Result<TurnOutcome, DialogueError> {
        let next = state.speaker.other();

        let mut next_text = match state.pending.take() {
            Some(text) => self.deliver(state.speaker, &text, next).await?,
            None => self.generate_detached(next).await?,
        };

        if next_text.is_empty() {
            tracing::warn!("[{}] pre-gen failed, retrying", next);
            next_text = self.generate_detached(next).await?;
        }
        if next_text.is_empty() {
            tokio::time::sleep(self.settings.empty_retry_pause).await;
            return Ok(TurnOutcome::Stalled);
        }

        tokio::time::sleep(self.settings.inter_turn_pause()).await;

        let started = Instant::now();
        self.broadcaster.send(ServerMessage::start(next));
        self.hold_thinking(started).await;

        state.speaker = next;
        state.pending = Some(next_text);
        Ok(TurnOutcome::Advanced)
    }

    /// Hands `text` to viewers and, while it plays, generates `next`'s reply.
    async fn deliver(
        &self,
        speaker: Persona,
        text: &str,
        next: Persona,
    ) -> Result<String, DialogueError> {
        self.phase.send_replace(Phase::AwaitingPlaybackDone);
        let done = self.gate.open_wait(self.settings.completion_timeout);
        self.broadcaster.send(ServerMessage::final_text(speaker, text));

        let (outcome, next_text) = tokio::join!(
            async {
                let outcome = done.wait().await;
                self.phase.send_replace(Phase::Advancing);
                outcome
            },
            self.generate_detached(next)
        );
        if outcome != WaitOutcome::Signalled {
            tracing::debug!("[{}] playback wait ended: {:?}", speaker, outcome);
        }
        next_text
    }

    /// Generates on a separate task so a panicking model call surfaces as an
    /// error instead of unwinding the loop.
    async fn generate_detached(&self, who: Persona) -> Result<String, DialogueError> {
        let generator = self.generator.clone();
        tokio::spawn(async move { generator.generate(who).await })
            .await
            .map_err(|source| DialogueError::Generation {
                persona: who,
                source,
            })
    }

    async fn hold_thinking(&self, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed < self.settings.min_thinking {
            tokio::time::sleep(self.settings.min_thinking - elapsed).await;
        }
    }
}
