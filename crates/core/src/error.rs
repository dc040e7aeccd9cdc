use dialogue_types::Persona;

/// Failures the turn orchestrator can report.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// The opening utterance could not be generated; the conversation does not start.
    #[error("bootstrap generation for {0} produced no text")]
    BootstrapFailed(Persona),
    /// A generation task did not complete, e.g. the model call panicked.
    #[error("generation task for {persona} failed: {source}")]
    Generation {
        persona: Persona,
        #[source]
        source: tokio::task::JoinError,
    },
}
