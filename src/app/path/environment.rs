//! Environment variable lookup for template expansion
//!
//! The resolver never mutates the process environment. Lookups go through an
//! [`Environment`] that layers explicit overrides, the process environment and
//! the per-release `[environment]` table of the template store.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::constants::templates::MAX_ENV_EXPANSION_DEPTH;

/// Which process variables win over release-provided definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreserveEnvVars {
    /// Release definitions replace process values (`false`)
    #[default]
    None,
    /// Process values always win (`true`)
    All,
    /// Only the named process values win
    Only(Vec<String>),
}

impl PreserveEnvVars {
    /// Build from the boolean config form
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            PreserveEnvVars::All
        } else {
            PreserveEnvVars::None
        }
    }

    pub fn keeps(&self, name: &str) -> bool {
        match self {
            PreserveEnvVars::None => false,
            PreserveEnvVars::All => true,
            PreserveEnvVars::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Layered environment used by the resolver
#[derive(Debug, Clone, Default)]
pub struct Environment {
    overrides: HashMap<String, String>,
    release: HashMap<String, String>,
    preserve: PreserveEnvVars,
    inherit: bool,
}

fn envvar_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$(\w+)").expect("static envvar pattern"))
}

impl Environment {
    /// Environment backed by the current process
    pub fn from_process() -> Self {
        Self {
            inherit: true,
            ..Self::default()
        }
    }

    /// Environment that only sees explicitly supplied variables
    pub fn isolated() -> Self {
        Self::default()
    }

    /// Builder-style override
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an override that beats every other layer
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.overrides.insert(name.into(), value.into());
    }

    /// Replace the release layer, applied when a release is (re)loaded
    pub fn set_release_layer<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.release = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
    }

    pub fn set_preserve(&mut self, preserve: PreserveEnvVars) {
        self.preserve = preserve;
    }

    pub fn preserve(&self) -> &PreserveEnvVars {
        &self.preserve
    }

    /// Raw value of a variable without nested expansion
    ///
    /// Overrides and the process environment form the caller layer; the release
    /// layer replaces caller values unless the preserve policy keeps them.
    pub fn get(&self, name: &str) -> Option<String> {
        let caller = self.overrides.get(name).cloned().or_else(|| {
            if self.inherit {
                std::env::var(name).ok()
            } else {
                None
            }
        });
        match (caller, self.release.get(name)) {
            (Some(caller), Some(_)) if self.preserve.keeps(name) => Some(caller),
            (_, Some(release)) => Some(release.clone()),
            (caller, None) => caller,
        }
    }

    /// Whether a variable is defined in any layer
    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fully expanded value of a variable, or `None` when it or a nested reference is undefined
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.resolve_at(name, 0)
    }

    /// Expand every `$VAR` in `text` left to right
    pub fn expand(&self, text: &str) -> Option<String> {
        self.expand_at(text, 0)
    }

    fn resolve_at(&self, name: &str, depth: usize) -> Option<String> {
        if depth >= MAX_ENV_EXPANSION_DEPTH {
            warn!("Environment variable ${} nests too deeply; treating as undefined", name);
            return None;
        }
        let value = self.get(name)?;
        self.expand_at(&value, depth + 1)
    }

    fn expand_at(&self, text: &str, depth: usize) -> Option<String> {
        let mut expanded = String::with_capacity(text.len());
        let mut last = 0;
        for captures in envvar_pattern().captures_iter(text) {
            let whole = captures.get(0)?;
            expanded.push_str(&text[last..whole.start()]);
            expanded.push_str(&self.resolve_at(&captures[1], depth)?);
            last = whole.end();
        }
        expanded.push_str(&text[last..]);
        Some(expanded)
    }
}
