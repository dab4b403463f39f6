//! Parsed path templates
//!
//! A template string such as
//! `$MANGA_SPECTRO_REDUX/{drpver}/{plate}/stack/manga-{plate}-{ifu:04d}.fits.gz`
//! is split into segments once, when a release is loaded:
//!
//! - `{key}` / `{key:spec}` placeholders, with `{{` and `}}` as literal braces
//! - `$NAME` environment variable references
//! - `@name|` computed-field markers
//! - everything else as literal text
//!
//! Rendering walks the segments, so keyword values are never re-scanned for
//! variables or markers.

use std::collections::BTreeSet;

use crate::app::path::environment::Environment;
use crate::app::path::format::{format_value, FormatSpec};
use crate::app::path::functions::ComputedField;
use crate::app::path::keywords::Keywords;
use crate::constants::templates::COMPRESSION_SUFFIXES;
use crate::errors::{PathError, PathResult};

/// One parsed piece of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Placeholder {
        key: String,
        spec: Option<FormatSpec>,
    },
    EnvVar(String),
    Function(ComputedField),
}

/// A named, parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    raw: String,
    segments: Vec<Segment>,
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Template {
    /// Parse a template, failing fast on malformed placeholders and unknown computed fields
    pub fn parse(name: impl Into<String>, raw: impl Into<String>) -> PathResult<Self> {
        let raw = raw.into();
        let syntax = |reason: &str| PathError::TemplateSyntax {
            template: raw.clone(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = raw.chars().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    literal.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    literal.push('}');
                    i += 2;
                }
                '}' => return Err(syntax("single '}' encountered")),
                '{' => {
                    let close = chars[i + 1..]
                        .iter()
                        .position(|c| *c == '}')
                        .map(|offset| i + 1 + offset)
                        .ok_or_else(|| syntax("unterminated '{'"))?;
                    let body: String = chars[i + 1..close].iter().collect();
                    if body.contains('{') {
                        return Err(syntax("nested '{' in placeholder"));
                    }
                    flush(&mut literal, &mut segments);
                    segments.push(parse_placeholder(&body).map_err(|reason| syntax(&reason))?);
                    i = close + 1;
                }
                '$' => {
                    let end = word_end(&chars, i + 1);
                    if end == i + 1 {
                        literal.push('$');
                        i += 1;
                    } else {
                        flush(&mut literal, &mut segments);
                        segments.push(Segment::EnvVar(chars[i + 1..end].iter().collect()));
                        i = end;
                    }
                }
                '@' => {
                    let end = word_end(&chars, i + 1);
                    if end > i + 1 && chars.get(end) == Some(&'|') {
                        let function: String = chars[i + 1..end].iter().collect();
                        flush(&mut literal, &mut segments);
                        segments.push(Segment::Function(ComputedField::from_name(&function)?));
                        i = end + 1;
                    } else {
                        literal.push('@');
                        i += 1;
                    }
                }
                other => {
                    literal.push(other);
                    i += 1;
                }
            }
        }
        flush(&mut literal, &mut segments);

        Ok(Self {
            name: name.into(),
            raw,
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template text as stored in the release
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Keys appearing literally as placeholders, without format suffixes
    pub fn placeholder_keys(&self) -> BTreeSet<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Computed fields referenced by the template, in order
    pub fn functions(&self) -> impl Iterator<Item = ComputedField> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Function(field) => Some(*field),
            _ => None,
        })
    }

    /// Placeholder keys plus the keys computed fields require
    pub fn lookup_keys(&self) -> BTreeSet<String> {
        let mut keys = self.placeholder_keys();
        for field in self.functions() {
            keys.extend(field.required_keys().iter().map(|key| key.to_string()));
        }
        keys
    }

    /// Every required key absent from `keywords`, sorted
    pub fn missing_keys(&self, keywords: &Keywords) -> Vec<String> {
        let mut missing: BTreeSet<String> = self
            .placeholder_keys()
            .into_iter()
            .filter(|key| !keywords.contains_key(key))
            .collect();
        for field in self.functions() {
            missing.extend(field.missing_keys(keywords).into_iter().map(String::from));
        }
        missing.into_iter().collect()
    }

    /// Name of the leading environment variable, if the template starts with one
    pub fn root_envvar(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::EnvVar(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Compression suffix the template itself declares
    pub fn compression_suffix(&self) -> Option<&'static str> {
        match self.segments.last() {
            Some(Segment::Literal(text)) => COMPRESSION_SUFFIXES
                .iter()
                .copied()
                .find(|suffix| text.ends_with(suffix)),
            _ => None,
        }
    }

    /// Substitute placeholders, environment variables and computed fields
    ///
    /// Returns `Ok(None)` when an environment variable is undefined. Callers are
    /// expected to have checked [`Template::missing_keys`] first; a missing key
    /// here is still reported as [`PathError::MissingKeyword`].
    pub fn render(&self, keywords: &Keywords, env: &Environment) -> PathResult<Option<String>> {
        let mut rendered = String::with_capacity(self.raw.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder { key, spec } => {
                    let value = keywords.get(key).ok_or_else(|| PathError::MissingKeyword {
                        name: self.name.clone(),
                        keys: vec![key.clone()],
                    })?;
                    rendered.push_str(&format_value(key, value, spec.as_ref())?);
                }
                Segment::EnvVar(name) => match env.resolve(name) {
                    Some(value) => rendered.push_str(&value),
                    None => return Ok(None),
                },
                Segment::Function(field) => match field.evaluate(keywords, env)? {
                    Some(value) => rendered.push_str(&value),
                    None => return Ok(None),
                },
            }
        }
        Ok(Some(rendered))
    }
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn word_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && is_word(chars[end]) {
        end += 1;
    }
    end
}

fn parse_placeholder(body: &str) -> Result<Segment, String> {
    let (key, spec) = match body.split_once(':') {
        Some((key, spec)) => (key, Some(spec)),
        None => (body, None),
    };
    if key.is_empty() {
        return Err("empty placeholder".to_string());
    }
    if !key.chars().all(is_word) {
        return Err(format!("invalid placeholder name '{}'", key));
    }
    let spec = match spec {
        Some(spec) if !spec.is_empty() => {
            Some(FormatSpec::parse(spec).map_err(|err| err.to_string())?)
        }
        _ => None,
    };
    Ok(Segment::Placeholder {
        key: key.to_string(),
        spec,
    })
}
