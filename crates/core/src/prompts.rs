//! Fixed instruction text for the two personas and the summarizer.

use dialogue_types::Persona;

const SHARED_STYLE: &str = r#"How to write your response:
- Talk like a real person. Use natural, conversational English, as if chatting with a friend over coffee.
- Each response should be 2 to 4 sentences, around 60 to 120 words.
- If you mention a technical or scientific concept, explain it in simple words right away so anyone can follow.
- Never wrap up, never summarize, never say "in conclusion." Always leave something open for the next reply.
- Do NOT start with labels like "Rule:" or your name. Just speak naturally.
- NEVER use mathematical notation, formulas, symbols, equations, or variables. No arrows, no Greek letters, no logical operators, no set notation. Express every idea in plain conversational words.
- No emojis. No bullet points. No numbered lists. No markdown. Just plain conversational text.
- ONLY talk about building a model of time travel. Nothing else."#;

const FIRST_ROLE: &str = r#"You are having a casual but smart conversation with a colleague about how to make time travel logically possible without paradoxes. You are the "idea person": you come up with new rules and mechanisms.
Respond directly to what your colleague just said and build on their feedback. Propose one clear idea, rule, or mechanism per turn."#;

const SECOND_ROLE: &str = r#"You are having a casual but smart conversation with a colleague about how to make time travel logically possible without paradoxes. You are the "skeptic": you find problems and suggest fixes.
Respond directly to what your colleague just said. Point out one flaw or edge case, and suggest one fix. Be friendly but skeptical; you want the model to work, but you won't let bad logic slide."#;

const KICKOFF: &str = "Hey, let's get started. What's your first idea for how time travel could work without causing paradoxes?";

const SUMMARY_INSTRUCTIONS: &str = "Summarize the key rules, mechanisms, constraints, and open questions \
established so far in this time-travel model discussion. Be concise: 3 to 5 sentences. \
Focus on what has been agreed on and what remains unresolved.";

const INITIAL_SUMMARY: &str = "We are just beginning to explore how time travel could work without \
creating logical paradoxes. No rules or mechanisms have been proposed yet.";

/// Instruction text for both personas plus the summarizer. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaSet {
    pub first: String,
    pub second: String,
    /// Synthetic opening request, sent only for the very first utterance.
    pub kickoff: String,
    pub summary_instructions: String,
    /// Summary in effect before any compaction has run.
    pub initial_summary: String,
}

impl Default for PersonaSet {
    fn default() -> Self {
        Self {
            first: format!("{FIRST_ROLE}\n\n{SHARED_STYLE}"),
            second: format!("{SECOND_ROLE}\n\n{SHARED_STYLE}"),
            kickoff: KICKOFF.to_string(),
            summary_instructions: SUMMARY_INSTRUCTIONS.to_string(),
            initial_summary: INITIAL_SUMMARY.to_string(),
        }
    }
}

impl PersonaSet {
    pub fn instructions(&self, persona: Persona) -> &str {
        match persona {
            Persona::First => &self.first,
            Persona::Second => &self.second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personas_have_distinct_roles() {
        let set = PersonaSet::default();
        assert!(set.instructions(Persona::First).contains("idea person"));
        assert!(set.instructions(Persona::Second).contains("skeptic"));
        assert!(set.instructions(Persona::Second).contains("No emojis"));
    }
}
