use crate::llm::ChatModel;
use crate::prompts::PersonaSet;
use crate::summarizer::Summarizer;
use crate::transcript::{SharedTranscript, Transcript, Utterance};
use dialogue_types::{ChatMessage, ChatRequest, Persona};
use std::sync::Arc;
use std::time::Duration;

/// How hard the generator tries before giving up on a turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay after attempt `n` is `n * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            backoff_step: Duration::from_millis(1000),
        }
    }
}

/// Produces one utterance per call for a given persona, retrying empty or
/// failed responses, and records successful utterances in the transcript.
pub struct Generator<M: ChatModel + ?Sized> {
    model: Arc<M>,
    model_name: String,
    personas: PersonaSet,
    transcript: SharedTranscript,
    summarizer: Summarizer<M>,
    policy: RetryPolicy,
    max_completion_tokens: u32,
}

impl<M: ChatModel + ?Sized> Generator<M> {
    pub fn new(
        model: Arc<M>,
        model_name: &str,
        personas: PersonaSet,
        transcript: SharedTranscript,
    ) -> Self {
        let summarizer = Summarizer::new(model.clone(), model_name, &personas);
        Self {
            model,
            model_name: model_name.to_string(),
            personas,
            transcript,
            summarizer,
            policy: RetryPolicy::default(),
            max_completion_tokens: 2048,
        }
    }

    pub fn transcript(&self) -> &SharedTranscript {
        &self.transcript
    }

    /// Builds the prompt for `who`: instructions, the rolling summary, then the
    /// retained history seen from `who`'s side.
    pub fn build_messages(&self, who: Persona, transcript: &Transcript) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(self.personas.instructions(who)),
            ChatMessage::system(format!(
                "Here is a summary of what you two have figured out so far:\n{}",
                transcript.summary()
            )),
        ];

        for turn in transcript.iter() {
            if turn.speaker == who {
                messages.push(ChatMessage::assistant(turn.text.as_str()));
            } else {
                messages.push(ChatMessage::user(turn.text.as_str()));
            }
        }

        if who == Persona::First && transcript.is_empty() {
            messages.push(ChatMessage::user(self.personas.kickoff.as_str()));
        }

        messages
    }

    /// Generates the next utterance for `who`. Returns an empty string when
    /// every attempt failed; that is the only failure signal.
    pub async fn generate(&self, who: Persona) -> String {
        let messages = {
            let transcript = self.transcript.lock().await;
            self.build_messages(who, &transcript)
        };
        let request = ChatRequest::new(&self.model_name, messages)
            .with_max_completion_tokens(self.max_completion_tokens)
            .with_stream(true);

        let mut text = String::new();
        for attempt in 1..=self.policy.attempts {
            match self.model.complete(request.clone()).await {
                Ok(reply) if !reply.trim().is_empty() => {
                    tracing::info!("[{}] text ready ({} chars)", who, reply.len());
                    text = reply;
                    break;
                }
                Ok(_) => tracing::warn!("[{}] attempt {} returned empty", who, attempt),
                Err(e) => tracing::error!("[{}] text attempt {}: {:#}", who, attempt, e),
            }
            if attempt < self.policy.attempts {
                tokio::time::sleep(self.policy.backoff_step * attempt).await;
            }
        }

        if !text.is_empty() {
            self.record(Utterance::new(who, text.as_str())).await;
        }
        text
    }

    async fn record(&self, utterance: Utterance) {
        let summary_due = self.transcript.lock().await.append(utterance);
        if summary_due {
            self.summarizer.refresh(&self.transcript).await;
        }
    }
}
