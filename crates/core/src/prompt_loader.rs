use crate::prompts::PersonaSet;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads every `.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content.trim().to_string());
        }
    }

    Ok(prompts)
}

/// Builds a persona set from the defaults, replacing any text for which the
/// directory holds a `first`, `second`, `kickoff`, `summary` or
/// `initial_summary` markdown file.
pub fn load_persona_set(dir_path: &Path) -> Result<PersonaSet> {
    let mut prompts = load_prompts(dir_path)?;
    let mut set = PersonaSet::default();

    let slots = [
        ("first", &mut set.first),
        ("second", &mut set.second),
        ("kickoff", &mut set.kickoff),
        ("summary", &mut set.summary_instructions),
        ("initial_summary", &mut set.initial_summary),
    ];
    for (key, slot) in slots {
        if let Some(text) = prompts.remove(key).filter(|t| !t.is_empty()) {
            tracing::debug!("Prompt '{}' overridden from {}", key, dir_path.display());
            *slot = text;
        }
    }

    for unused in prompts.keys() {
        tracing::warn!("Ignoring unrecognised prompt file '{}.md'", unused);
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_types::Persona;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_prompts_only_reads_markdown() -> Result<()> {
        let dir = tempdir()?;
        let dir_path = dir.path();

        let mut file1 = File::create(dir_path.join("first.md"))?;
        writeln!(file1, "You argue for {{things}}.")?;
        let mut ignored_file = File::create(dir_path.join("notes.txt"))?;
        writeln!(ignored_file, "scratch")?;
        std::fs::create_dir(dir_path.join("subdir"))?;

        let prompts = load_prompts(dir_path)?;

        assert_eq!(prompts.len(), 1, "Should only load .md files");
        assert_eq!(prompts.get("first").unwrap(), "You argue for {things}.");
        assert!(prompts.get("notes").is_none());
        Ok(())
    }

    #[test]
    fn test_persona_set_overrides_present_files_only() -> Result<()> {
        let dir = tempdir()?;
        let mut second = File::create(dir.path().join("second.md"))?;
        writeln!(second, "You are a grumpy reviewer.")?;
        File::create(dir.path().join("kickoff.md"))?;

        let set = load_persona_set(dir.path())?;
        let defaults = PersonaSet::default();

        assert_eq!(set.instructions(Persona::Second), "You are a grumpy reviewer.");
        assert_eq!(set.first, defaults.first);
        // An empty file keeps the default.
        assert_eq!(set.kickoff, defaults.kickoff);
        Ok(())
    }

    #[test]
    fn test_load_prompts_from_nonexistent_dir() {
        let dir_path = Path::new("nonexistent_dir_for_testing_prompts");
        assert!(load_prompts(dir_path).is_err());
        assert!(load_persona_set(dir_path).is_err());
    }
}
