//! Relative locations and remote URLs for resolved paths

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::templates::{TAGS_VERSION_PATTERN, VERSION_COMPONENT_PATTERN};

fn tags_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TAGS_VERSION_PATTERN).expect("static tags pattern"))
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(VERSION_COMPONENT_PATTERN).expect("static version pattern"))
}

/// Collapse runs of `/` into one
pub fn collapse_separators(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        collapsed.push(c);
    }
    collapsed
}

/// Path of `full` relative to `root`, or `None` when it lies elsewhere
pub fn relative_to(full: &str, root: &str) -> Option<String> {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return None;
    }
    let rest = full.strip_prefix(root)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let location = collapse_separators(rest.trim_start_matches('/'));
    (!location.is_empty()).then_some(location)
}

/// Remove the first `tags/` segment that precedes a version token
pub fn strip_version_tag(path: &str) -> String {
    tags_pattern().replacen(path, 1, "${1}").into_owned()
}

/// Insert `tags/` before the first version-like directory, unless already present
pub fn insert_version_tag(location: &str) -> String {
    let components: Vec<&str> = location.split('/').collect();
    let directories = &components[..components.len().saturating_sub(1)];
    let Some(index) = directories
        .iter()
        .position(|component| version_pattern().is_match(component))
    else {
        return location.to_string();
    };
    if index > 0 && components[index - 1] == "tags" {
        return location.to_string();
    }
    let mut tagged: Vec<&str> = Vec::with_capacity(components.len() + 1);
    tagged.extend_from_slice(&components[..index]);
    tagged.push("tags");
    tagged.extend_from_slice(&components[index..]);
    tagged.join("/")
}

/// Join URL parts with single slashes
pub fn join_url(base: &str, parts: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for part in parts.iter().filter(|part| !part.is_empty()) {
        url.push('/');
        url.push_str(part.trim_matches('/'));
    }
    url
}
