//! Prompt-set loading.
//!
//! A prompt set is a JSON object mapping an identifier to a prompt
//! string, one file per style index. A missing or malformed file aborts
//! the whole run, so parsing validates every entry up front rather than
//! failing midway through generation.

use std::path::Path;

use crate::error::CoreError;
use crate::naming;

/// One `(id, prompt)` pair from a prompt set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEntry {
    pub id: String,
    pub text: String,
}

/// All prompts for one style index, in iteration order.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    entries: Vec<PromptEntry>,
}

impl PromptSet {
    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read and parse the prompt set at `path`.
pub async fn load_prompt_set(path: &Path) -> Result<PromptSet, CoreError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CoreError::PromptSetIo {
            path: path.to_path_buf(),
            source,
        })?;
    parse_prompt_set(path, &raw)
}

/// Parse prompt-set JSON. `path` is only used to annotate errors.
///
/// JSON objects carry no ordering, so entries are sorted numerically by
/// id where ids parse as integers (the datasets use `"0"`, `"1"`, …) and
/// lexicographically otherwise.
pub fn parse_prompt_set(path: &Path, raw: &str) -> Result<PromptSet, CoreError> {
    let parse_err = |reason: String| CoreError::PromptSetParse {
        path: path.to_path_buf(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| parse_err(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| parse_err("prompt set must be a JSON object".to_string()))?;

    let mut entries = Vec::with_capacity(object.len());
    for (id, prompt) in object {
        let text = prompt
            .as_str()
            .ok_or_else(|| parse_err(format!("prompt '{id}' is not a string")))?;
        naming::validate_prompt_text(text)
            .map_err(|e| parse_err(format!("prompt '{id}': {e}")))?;
        entries.push(PromptEntry {
            id: id.clone(),
            text: text.to_string(),
        });
    }

    entries.sort_by(|a, b| match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.id.cmp(&b.id),
    });

    Ok(PromptSet { entries })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse(raw: &str) -> Result<PromptSet, CoreError> {
        parse_prompt_set(Path::new("/data/styles/00/prompt.json"), raw)
    }

    #[test]
    fn parses_simple_prompt_set() {
        let set = parse(r#"{"0": "a cat", "1": "a dog"}"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries()[0].id, "0");
        assert_eq!(set.entries()[0].text, "a cat");
    }

    #[test]
    fn entries_sorted_numerically_by_id() {
        let set = parse(r#"{"10": "j", "2": "b", "0": "a"}"#).unwrap();
        let ids: Vec<&str> = set.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["0", "2", "10"]);
    }

    #[test]
    fn empty_object_is_an_empty_set() {
        let set = parse("{}").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert_matches!(parse("not json"), Err(CoreError::PromptSetParse { .. }));
    }

    #[test]
    fn non_object_root_rejected() {
        assert_matches!(
            parse(r#"["a cat"]"#),
            Err(CoreError::PromptSetParse { .. })
        );
    }

    #[test]
    fn non_string_prompt_rejected() {
        assert_matches!(
            parse(r#"{"0": 42}"#),
            Err(CoreError::PromptSetParse { .. })
        );
    }

    #[test]
    fn prompt_with_separator_rejected_at_parse_time() {
        assert_matches!(
            parse(r#"{"0": "a/b"}"#),
            Err(CoreError::PromptSetParse { .. })
        );
    }

    #[tokio::test]
    async fn load_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.json");
        assert_matches!(
            load_prompt_set(&path).await,
            Err(CoreError::PromptSetIo { .. })
        );
    }

    #[tokio::test]
    async fn load_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.json");
        std::fs::write(&path, r#"{"0": "a cat"}"#).unwrap();
        let set = load_prompt_set(&path).await.unwrap();
        assert_eq!(set.entries()[0].text, "a cat");
    }
}
