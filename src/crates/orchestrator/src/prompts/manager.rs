//! [`PromptManager`] - template and rule-fragment caches.
//!
//! `cached_prompt` is a read-through store keyed by stable identity (the
//! template's absolute path), not a TTL cache: every call re-reads the file
//! and overwrites the entry, so a reload is just another call. Rule fragments
//! (`<flow_rule_dir>/*.md`) are loaded together, lazily, and only refreshed
//! by `clear_cache`.

use crate::error::{OrchestratorError, Result};
use crate::prompts::loader::PromptLoader;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Matches `{identifier}` substitution targets. Single braces, bare name.
pub(crate) fn placeholder_regex() -> Regex {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex")
}

/// Owner of the template cache and the rule-fragment cache.
pub struct PromptManager {
    flow_rule_dir: PathBuf,
    templates: RwLock<HashMap<String, String>>,
    fragments: RwLock<Option<HashMap<String, String>>>,
    placeholder: Regex,
}

impl PromptManager {
    /// Create a manager reading fragments from `flow_rule_dir`.
    pub fn new(flow_rule_dir: impl Into<PathBuf>) -> Self {
        Self {
            flow_rule_dir: flow_rule_dir.into(),
            templates: RwLock::new(HashMap::new()),
            fragments: RwLock::new(None),
            placeholder: placeholder_regex(),
        }
    }

    /// Load a template, inline rule fragments, cache it, return the cache key.
    ///
    /// Always reads from disk; an existing entry for the same absolute path
    /// is overwritten. After this call the cached content contains no
    /// `{name}` that names an existing rule fragment; remaining `{name}`
    /// tokens are turn-time variables.
    pub fn cached_prompt(&self, prompt_path: &str, flow_dir: &Path) -> Result<String> {
        let resolved = PromptLoader::resolve_path(prompt_path, flow_dir);
        let cache_key = resolved.to_string_lossy().to_string();

        let raw = PromptLoader::load_from_file(&resolved)?;
        let rendered = self.replace_rule_fragments(&raw);

        let mut templates = self.templates.write();
        if templates.contains_key(&cache_key) {
            tracing::debug!(key = %cache_key, "Prompt cache entry overwritten");
        } else {
            tracing::info!(key = %cache_key, "Prompt loaded and cached");
        }
        templates.insert(cache_key.clone(), rendered);

        Ok(cache_key)
    }

    /// Fetch a cached template by key. A missing key is an error: keys only
    /// come from `cached_prompt`, so a miss means the cache was cleared
    /// underneath the caller.
    pub fn get_prompt_by_key(&self, cache_key: &str) -> Result<String> {
        self.templates
            .read()
            .get(cache_key)
            .cloned()
            .ok_or_else(|| {
                OrchestratorError::Prompt(format!("Prompt not found in cache: {cache_key}"))
            })
    }

    /// Empty both caches.
    pub fn clear_cache(&self) {
        self.templates.write().clear();
        *self.fragments.write() = None;
        tracing::info!("Prompt caches cleared");
    }

    /// Number of cached templates.
    pub fn cache_size(&self) -> usize {
        self.templates.read().len()
    }

    /// Replace `{name}` for every fragment file `name.md` that exists.
    /// Unknown names stay untouched for turn-time substitution.
    fn replace_rule_fragments(&self, template: &str) -> String {
        self.ensure_fragments_loaded();
        let fragments = self.fragments.read();
        let Some(fragments) = fragments.as_ref() else {
            return template.to_string();
        };
        if fragments.is_empty() {
            return template.to_string();
        }

        self.placeholder
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                match fragments.get(name) {
                    Some(content) => content.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn ensure_fragments_loaded(&self) {
        if self.fragments.read().is_some() {
            return;
        }

        let mut loaded = HashMap::new();
        match std::fs::read_dir(&self.flow_rule_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("md") {
                        continue;
                    }
                    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    match PromptLoader::load_from_file(&path) {
                        Ok(content) => {
                            loaded.insert(stem.to_string(), content);
                        }
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "Failed to load rule fragment");
                        }
                    }
                }
                tracing::info!(count = loaded.len(), "Loaded rule fragments");
            }
            Err(_) => {
                tracing::warn!(dir = %self.flow_rule_dir.display(), "Rule fragment directory missing");
            }
        }

        *self.fragments.write() = Some(loaded);
    }
}
