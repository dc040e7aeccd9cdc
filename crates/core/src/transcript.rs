//! Bounded in-memory dialogue history plus a rolling summary of what has
//! been evicted from it.

use dialogue_types::Persona;
use std::collections::VecDeque;
use std::sync::Arc;

/// Most recent utterances kept verbatim for prompting and replay.
pub const TAIL_CAP: usize = 8;
/// Utterances kept after a summary compaction.
pub const SUMMARY_RESIDUAL: usize = 2;
/// A summary refresh is due every this many utterances.
pub const SUMMARIZE_EVERY: u64 = 20;

pub type SharedTranscript = Arc<tokio::sync::Mutex<Transcript>>;

/// One persona's finished turn. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub speaker: Persona,
    pub text: String,
}

impl Utterance {
    pub fn new(speaker: Persona, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct Transcript {
    tail: VecDeque<Utterance>,
    summary: String,
    turn_count: u64,
    tail_cap: usize,
    residual: usize,
    summarize_every: u64,
}

impl Transcript {
    pub fn new(initial_summary: impl Into<String>) -> Self {
        Self::with_limits(initial_summary, TAIL_CAP, SUMMARY_RESIDUAL, SUMMARIZE_EVERY)
    }

    pub fn with_limits(
        initial_summary: impl Into<String>,
        tail_cap: usize,
        residual: usize,
        summarize_every: u64,
    ) -> Self {
        Self {
            tail: VecDeque::with_capacity(tail_cap + 1),
            summary: initial_summary.into(),
            turn_count: 0,
            tail_cap: tail_cap.max(1),
            residual: residual.min(tail_cap),
            summarize_every: summarize_every.max(1),
        }
    }

    pub fn shared(self) -> SharedTranscript {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Appends an utterance, evicting the oldest entries beyond the cap, and
    /// returns `true` when this append makes a summary refresh due.
    pub fn append(&mut self, utterance: Utterance) -> bool {
        self.tail.push_back(utterance);
        while self.tail.len() > self.tail_cap {
            self.tail.pop_front();
        }
        self.turn_count += 1;
        self.turn_count % self.summarize_every == 0
    }

    /// Replaces the rolling summary and keeps only the residual tail.
    pub fn apply_summary(&mut self, summary: String) {
        self.summary = summary;
        let excess = self.tail.len().saturating_sub(self.residual);
        self.tail.drain(..excess);
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn len(&self) -> usize {
        self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tail.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.tail.iter()
    }

    /// Copy of the retained tail, oldest first.
    pub fn snapshot(&self) -> Vec<Utterance> {
        self.tail.iter().cloned().collect()
    }
}
