//! Request path scope matching.
//!
//! # Design Decisions
//! - Patterns are compiled once at startup, immutable at runtime
//! - Full-string match: each pattern is anchored at both ends
//! - First match wins; order is the configured order
//! - A disabled gate has no scope, whatever the pattern list says

use regex::Regex;

use crate::config::ConfigError;

/// Decides whether a request path is subject to admission control.
#[derive(Debug, Clone, Default)]
pub struct ScopeMatcher {
    patterns: Vec<Regex>,
}

impl ScopeMatcher {
    /// A matcher that never matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile the configured patterns.
    ///
    /// Blank entries are skipped with a warning. Patterns are not compiled
    /// at all when admission control is disabled.
    pub fn compile<S: AsRef<str>>(patterns: &[S], enabled: bool) -> Result<Self, ConfigError> {
        if !enabled {
            return Ok(Self::empty());
        }

        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let pattern = raw.as_ref().trim();
            if pattern.is_empty() {
                tracing::warn!("Empty entry in admission URI pattern list");
                continue;
            }
            let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                tracing::error!(pattern, error = %source, "Invalid admission URI pattern");
                ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                }
            })?;
            compiled.push(regex);
        }

        if compiled.is_empty() {
            tracing::warn!("Admission URI pattern list is empty; no request will be limited");
        } else {
            tracing::info!(patterns = compiled.len(), "Admission URI patterns compiled");
        }

        Ok(Self { patterns: compiled })
    }

    /// Returns true if `path` fully matches any configured pattern.
    pub fn is_in_scope(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
