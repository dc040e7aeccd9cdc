use crate::persona::Persona;

/// Messages pushed from the server to every connected viewer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Dialogue subject, sent on connect and once when the conversation starts.
    #[serde(rename = "topic")]
    Topic { text: String },
    /// The persona begins a new turn; viewers show a "thinking" state.
    #[serde(rename = "start")]
    Start { who: Persona },
    /// The persona's finished utterance, ready to render and vocalize.
    #[serde(rename = "final")]
    Final { who: Persona, text: String },
}

impl ServerMessage {
    pub fn topic(text: &str) -> Self {
        Self::Topic {
            text: text.to_string(),
        }
    }

    pub fn start(who: Persona) -> Self {
        Self::Start { who }
    }

    pub fn final_text(who: Persona, text: &str) -> Self {
        Self::Final {
            who,
            text: text.to_string(),
        }
    }
}

/// Messages a viewer sends back to the server.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ViewerMessage {
    /// The viewer finished playing back the current utterance.
    #[serde(rename = "audio-done")]
    AudioDone,
}
