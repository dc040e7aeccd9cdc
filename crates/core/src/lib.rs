pub mod broadcast;
pub mod error;
pub mod gate;
pub mod generator;
pub mod llm;
pub mod orchestrator;
pub mod prompt_loader;
pub mod prompts;
pub mod summarizer;
pub mod transcript;

pub use dialogue_types as types;
pub use dialogue_types::Persona;

pub use broadcast::{Broadcaster, Viewer};
pub use error::DialogueError;
pub use gate::{CompletionGate, CompletionWait, WaitOutcome};
pub use generator::{Generator, RetryPolicy};
pub use llm::{ChatModel, OpenAiChat};
pub use orchestrator::{DialogueSettings, Orchestrator, Phase};
pub use prompts::PersonaSet;
pub use summarizer::Summarizer;
pub use transcript::{SharedTranscript, Transcript, Utterance};
