use crate::llm::ChatModel;
use crate::prompts::PersonaSet;
use crate::transcript::{SharedTranscript, Utterance};
use anyhow::Result;
use dialogue_types::{ChatMessage, ChatRequest};
use std::sync::Arc;

/// Condenses the retained transcript into the rolling summary so prompts stay
/// bounded however long the dialogue runs.
pub struct Summarizer<M: ChatModel + ?Sized> {
    model: Arc<M>,
    model_name: String,
    instructions: String,
}

impl<M: ChatModel + ?Sized> Summarizer<M> {
    pub fn new(model: Arc<M>, model_name: &str, personas: &PersonaSet) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            instructions: personas.summary_instructions.clone(),
        }
    }

    /// Refreshes the summary held by `transcript`. Failures are logged and the
    /// existing summary and tail are left untouched. Returns whether the
    /// summary was replaced.
    pub async fn refresh(&self, transcript: &SharedTranscript) -> bool {
        let (previous, tail) = {
            let t = transcript.lock().await;
            (t.summary().to_string(), t.snapshot())
        };

        match self.condense(&previous, &tail).await {
            Ok(summary) => {
                let preview: String = summary.chars().take(120).collect();
                transcript.lock().await.apply_summary(summary);
                tracing::info!("[summary refreshed] {}…", preview);
                true
            }
            Err(e) => {
                tracing::error!("Summary refresh failed: {:#}", e);
                false
            }
        }
    }

    async fn condense(&self, previous: &str, tail: &[Utterance]) -> Result<String> {
        let recent = tail
            .iter()
            .map(|u| format!("{}: {}", u.speaker.label(), u.text))
            .collect::<Vec<_>>()
            .join("\n");

        let request = ChatRequest::new(
            &self.model_name,
            vec![
                ChatMessage::system(self.instructions.as_str()),
                ChatMessage::user(format!(
                    "Previous summary:\n{previous}\n\nRecent conversation:\n{recent}\n\nWrite an updated summary."
                )),
            ],
        );

        let summary = self.model.complete(request).await?.trim().to_string();
        if summary.is_empty() {
            anyhow::bail!("summary response was empty");
        }
        Ok(summary)
    }
}
