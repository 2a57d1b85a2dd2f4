use anyhow::Result;

use anyhow::anyhow;
use directories::ProjectDirs;

pub fn trim_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        return format!("{count} {word}");
    }
    match word.strip_suffix('y') {
        Some(stem) if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) => format!("{count} {stem}ies"),
        _ => format!("{count} {word}s"),
    }
}

/// Joins an error and its causes into one line, for status bars.
pub fn flatten_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string().replace('\n', " ")];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().replace('\n', " ");
        if !parts.iter().any(|part| part.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

pub fn get_data_dir() -> Result<std::path::PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "quiz-builder")
        .ok_or_else(|| anyhow!("Could not determine project directory"))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StoreError;

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line("  cat "), Some("cat"));
        assert_eq!(trim_line(" \t "), None);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("option", 1), "1 option");
        assert_eq!(pluralize("option", 0), "0 options");
        assert_eq!(pluralize("blank", 3), "3 blanks");
        assert_eq!(pluralize("category", 2), "2 categories");
        assert_eq!(pluralize("day", 2), "2 days");
    }

    #[test]
    fn flatten_error_without_sources() {
        let err = StoreError::from_response(500, r#"{"error":"boom"}"#);
        assert_eq!(
            flatten_error(&err),
            "Server returned an error: 500 (boom)"
        );
    }
}
