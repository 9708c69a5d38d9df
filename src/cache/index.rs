//! Alias Index Module
//!
//! Maps secondary ids onto primary ids, with a reverse index so every alias
//! of a primary can be dropped together.

use std::collections::{HashMap, HashSet};

// == Alias Index ==
/// Many-to-one alias map.
///
/// Invariant: `alias -> primary` is in `forward` iff `alias` is in
/// `reverse[primary]`.
#[derive(Debug, Default)]
pub struct AliasIndex {
    forward: HashMap<String, String>,
    reverse: HashMap<String, HashSet<String>>,
}

impl AliasIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Bind ==
    /// Points `alias` at `primary`. A previous binding is replaced.
    pub fn bind(&mut self, alias: &str, primary: &str) {
        if let Some(previous) = self.forward.insert(alias.to_string(), primary.to_string()) {
            if previous != primary {
                self.unlink(&previous, alias);
            }
        }
        self.reverse
            .entry(primary.to_string())
            .or_default()
            .insert(alias.to_string());
    }

    // == Resolve ==
    pub fn primary_of(&self, alias: &str) -> Option<&str> {
        self.forward.get(alias).map(String::as_str)
    }

    /// Aliases bound to `primary`, in no particular order.
    #[cfg(test)]
    fn aliases_of(&self, primary: &str) -> Vec<String> {
        self.reverse
            .get(primary)
            .map(|aliases| aliases.iter().cloned().collect())
            .unwrap_or_default()
    }

    // == Remove Primary ==
    /// Drops every alias bound to `primary`. Returns how many were dropped.
    pub fn remove_primary(&mut self, primary: &str) -> usize {
        let Some(aliases) = self.reverse.remove(primary) else {
            return 0;
        };
        for alias in &aliases {
            self.forward.remove(alias);
        }
        aliases.len()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    fn unlink(&mut self, primary: &str, alias: &str) {
        if let Some(aliases) = self.reverse.get_mut(primary) {
            aliases.remove(alias);
            if aliases.is_empty() {
                self.reverse.remove(primary);
            }
        }
    }
}
