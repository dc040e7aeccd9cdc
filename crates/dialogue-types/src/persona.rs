/// One of the two fixed dialogue participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Persona {
    #[serde(rename = "first", alias = "alpha")]
    First,
    #[serde(rename = "second", alias = "beta")]
    Second,
}

impl Persona {
    /// The persona that speaks after this one.
    pub fn other(self) -> Self {
        match self {
            Persona::First => Persona::Second,
            Persona::Second => Persona::First,
        }
    }

    /// Neutral speaker label used when a transcript is rendered as prose.
    pub fn label(self) -> &'static str {
        match self {
            Persona::First => "Person A",
            Persona::Second => "Person B",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::First => "first",
            Persona::Second => "second",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_alternates() {
        assert_eq!(Persona::First.other(), Persona::Second);
        assert_eq!(Persona::Second.other(), Persona::First);
        assert_eq!(Persona::First.other().other(), Persona::First);
    }

    #[test]
    fn accepts_legacy_names() {
        let p: Persona = serde_json::from_str("\"alpha\"").unwrap();
        assert_eq!(p, Persona::First);
        let p: Persona = serde_json::from_str("\"beta\"").unwrap();
        assert_eq!(p, Persona::Second);
        assert_eq!(serde_json::to_string(&Persona::Second).unwrap(), "\"second\"");
    }
}
