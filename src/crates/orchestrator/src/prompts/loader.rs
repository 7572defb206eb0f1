//! Prompt file loading and path resolution.

use crate::error::{OrchestratorError, Result};
use std::path::{Path, PathBuf};

/// Loads prompt template files from disk.
pub struct PromptLoader;

impl PromptLoader {
    /// Read a prompt file, trimming surrounding whitespace.
    pub fn load_from_file(path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(OrchestratorError::Prompt(format!(
                "Prompt file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(content.trim().to_string())
    }

    /// Resolve a template reference against its flow directory.
    ///
    /// Absolute references pass through; relative ones resolve under
    /// `flow_dir`. The result is normalized where the filesystem allows it so
    /// the same file always yields the same cache key.
    pub fn resolve_path(prompt_path: &str, flow_dir: &Path) -> PathBuf {
        let prompt = Path::new(prompt_path);
        if prompt.is_absolute() {
            return prompt.to_path_buf();
        }
        let joined = flow_dir.join(prompt);
        joined.canonicalize().unwrap_or(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "\n  You are helpful.  \n").unwrap();

        let content = PromptLoader::load_from_file(&path).unwrap();
        assert_eq!(content, "You are helpful.");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PromptLoader::load_from_file(&dir.path().join("nope.md")).is_err());
    }

    #[test]
    fn relative_paths_resolve_under_flow_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "x").unwrap();

        let resolved = PromptLoader::resolve_path("a.md", dir.path());
        assert!(resolved.ends_with("a.md"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn absolute_paths_pass_through() {
        let abs = if cfg!(windows) { "C:\\p.md" } else { "/tmp/p.md" };
        let resolved = PromptLoader::resolve_path(abs, Path::new("/ignored"));
        assert_eq!(resolved, PathBuf::from(abs));
    }
}
