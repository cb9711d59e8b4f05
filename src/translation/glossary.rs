/*!
 * Glossary protection for terminology that must survive translation.
 *
 * Configured terms are swapped for inert placeholders before the texts reach
 * the provider and the placeholders are replaced with the terms' targets
 * afterwards. Matching is case-insensitive on word boundaries, longest term
 * first. Word boundaries follow the regex crate's `\b`, which behaves well
 * for alphanumeric terms but not for terms that start or end with
 * punctuation (e.g. "C++").
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::collections::{BTreeMap, HashMap};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{ID_\d+\}").expect("placeholder pattern is valid")
});

/// Render the placeholder token for `id`
pub fn placeholder(id: usize) -> String {
    format!("{{ID_{}}}", id)
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    term: String,
    target: String,
    pattern: Regex,
}

/// Placeholders minted during one `protect` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    /// target -> placeholder, so terms sharing a target share a placeholder
    by_target: HashMap<String, String>,
    /// (placeholder, target) in minting order
    bindings: Vec<(String, String)>,
}

impl PlaceholderMap {
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Target bound to `placeholder`, if any
    pub fn target(&self, placeholder: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(token, _)| token == placeholder)
            .map(|(_, target)| target.as_str())
    }

    fn placeholder_for(&mut self, target: &str) -> String {
        if let Some(existing) = self.by_target.get(target) {
            return existing.clone();
        }
        let token = placeholder(self.bindings.len());
        self.by_target.insert(target.to_string(), token.clone());
        self.bindings.push((token.clone(), target.to_string()));
        token
    }
}

/// Compiled glossary that protects and restores terms
#[derive(Debug, Clone, Default)]
pub struct GlossaryGuard {
    terms: Vec<CompiledTerm>,
}

impl GlossaryGuard {
    /// Compile `terms` (source term -> target), longest source term first
    pub fn new(terms: &BTreeMap<String, String>) -> Self {
        let mut compiled: Vec<CompiledTerm> = terms
            .iter()
            .filter(|(term, _)| !term.is_empty())
            .filter_map(|(term, target)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
                match Regex::new(&pattern) {
                    Ok(pattern) => Some(CompiledTerm {
                        term: term.clone(),
                        target: target.clone(),
                        pattern,
                    }),
                    Err(e) => {
                        warn!("Skipping glossary term '{}': {}", term, e);
                        None
                    }
                }
            })
            .collect();

        // BTreeMap iteration already orders equal lengths by term
        compiled.sort_by(|a, b| b.term.len().cmp(&a.term.len()));

        Self { terms: compiled }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Replace every glossary term in `texts` with its placeholder
    pub fn protect(&self, texts: &[String]) -> (Vec<String>, PlaceholderMap) {
        let mut placeholders = PlaceholderMap::default();

        let protected = texts
            .iter()
            .map(|text| {
                let mut current = text.clone();
                for term in &self.terms {
                    if term.pattern.is_match(&current) {
                        let token = placeholders.placeholder_for(&term.target);
                        current = term.pattern.replace_all(&current, NoExpand(&token)).into_owned();
                    }
                }
                current
            })
            .collect();

        if !placeholders.is_empty() {
            debug!("Protected {} glossary targets", placeholders.len());
        }
        (protected, placeholders)
    }

    /// Replace placeholders in `results` with their bound targets
    ///
    /// Placeholders the provider dropped or mangled cannot be recovered; they
    /// are logged and otherwise left alone.
    pub fn restore(&self, results: Vec<String>, placeholders: &PlaceholderMap) -> Vec<String> {
        if placeholders.is_empty() {
            return results;
        }

        results
            .into_iter()
            .map(|text| {
                let mut restored = text;
                for (token, target) in &placeholders.bindings {
                    if restored.contains(token.as_str()) {
                        restored = restored.replace(token.as_str(), target);
                    }
                }
                if PLACEHOLDER_PATTERN.is_match(&restored) {
                    warn!("Unresolved glossary placeholder left in translation: {}", restored);
                }
                restored
            })
            .collect()
    }
}
