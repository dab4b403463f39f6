//! Reverse extraction of keyword values from concrete paths
//!
//! A template is turned into an end-anchored regular expression: literals are
//! escaped, environment variables expanded, placeholders become non-greedy
//! capture groups and computed fields contribute their own fixed patterns.
//! Capture groups are paired with keys by position.
//!
//! Two placeholders with nothing between them (`{br}{id}`) cannot be separated
//! by a regex alone. Such pairs share one capture group and are split with
//! fixed rules for the key combinations known to occur.

use std::sync::OnceLock;

use regex::Regex;

use crate::app::path::environment::Environment;
use crate::app::path::keywords::{KeywordValue, Keywords};
use crate::app::path::template::{Segment, Template};
use crate::errors::{PathError, PathResult};

/// Keys whose values are a single character when packed against the next key
const SINGLE_CHAR_KEYS: &[&str] = &["rc", "br", "filter", "camrow"];

/// Regex building block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractPiece {
    /// Text matched literally
    Literal(String),
    /// Raw regex that captures nothing
    Pattern(String),
    /// Capture group assigned to a key
    Capture { key: String, integer: bool },
}

impl ExtractPiece {
    pub fn literal(text: impl Into<String>) -> Self {
        ExtractPiece::Literal(text.into())
    }

    pub fn pattern(regex: impl Into<String>) -> Self {
        ExtractPiece::Pattern(regex.into())
    }

    pub fn capture(key: impl Into<String>) -> Self {
        ExtractPiece::Capture {
            key: key.into(),
            integer: false,
        }
    }

    /// Capture whose text may be zero padded, recovered as an integer
    pub fn integer_capture(key: impl Into<String>) -> Self {
        ExtractPiece::Capture {
            key: key.into(),
            integer: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    key: String,
    integer: bool,
}

#[derive(Debug, Clone)]
enum Group {
    Single(Field),
    Packed(Field, Field),
}

/// Compiled extraction pattern for one template
#[derive(Debug, Clone)]
pub struct ExtractPattern {
    template: String,
    regex: Regex,
    groups: Vec<Group>,
}

fn dr_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(DR[1-9][0-9])(.*)$").expect("static release pattern"))
}

impl ExtractPattern {
    /// Build the pattern, or `None` when the template captures nothing
    pub fn build(template: &Template, env: &Environment) -> PathResult<Option<Self>> {
        let pieces = pieces_of(template, env);

        let mut source = String::new();
        let mut groups = Vec::new();
        let mut i = 0;
        while i < pieces.len() {
            match &pieces[i] {
                ExtractPiece::Literal(text) => source.push_str(&regex::escape(text)),
                ExtractPiece::Pattern(pattern) => source.push_str(pattern),
                ExtractPiece::Capture { key, integer } => {
                    let first = Field {
                        key: key.clone(),
                        integer: *integer,
                    };
                    if let Some(ExtractPiece::Capture { key, integer }) = pieces.get(i + 1) {
                        if matches!(pieces.get(i + 2), Some(ExtractPiece::Capture { .. })) {
                            return Err(PathError::TemplateSyntax {
                                template: template.raw().to_string(),
                                reason: "more than two adjacent placeholders".to_string(),
                            });
                        }
                        let second = Field {
                            key: key.clone(),
                            integer: *integer,
                        };
                        groups.push(Group::Packed(first, second));
                        i += 1;
                    } else {
                        groups.push(Group::Single(first));
                    }
                    source.push_str("(.*?)");
                }
            }
            i += 1;
        }

        if groups.is_empty() {
            return Ok(None);
        }
        source.push('$');

        Ok(Some(Self {
            template: template.raw().to_string(),
            regex: Regex::new(&source)?,
            groups,
        }))
    }

    /// Regular expression text, mostly useful for diagnostics
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Match a concrete path, returning `None` when it does not fit the template
    pub fn extract(&self, path: &str) -> PathResult<Option<Keywords>> {
        let Some(captures) = self.regex.captures(path) else {
            return Ok(None);
        };

        let mut keywords = Keywords::new();
        for (index, group) in self.groups.iter().enumerate() {
            let text = captures.get(index + 1).map_or("", |m| m.as_str());
            match group {
                Group::Single(field) => keywords.insert(field.key.clone(), value_of(field, text)),
                Group::Packed(first, second) => {
                    let (head, tail) = self.split_packed(&first.key, &second.key, text)?;
                    keywords.insert(first.key.clone(), value_of(first, head));
                    keywords.insert(second.key.clone(), value_of(second, tail));
                }
            }
        }
        Ok(Some(keywords))
    }

    fn split_packed<'a>(
        &self,
        first: &str,
        second: &str,
        text: &'a str,
    ) -> PathResult<(&'a str, &'a str)> {
        let unsplittable = |reason: &str| PathError::TemplateSyntax {
            template: self.template.clone(),
            reason: format!("cannot separate {{{}}}{{{}}}: {}", first, second, reason),
        };

        if SINGLE_CHAR_KEYS.contains(&first) {
            let split = text
                .char_indices()
                .nth(1)
                .map(|(offset, _)| offset)
                .ok_or_else(|| unsplittable("value too short"))?;
            return Ok(text.split_at(split));
        }
        if first == "dr" {
            let captures = dr_prefix()
                .captures(text)
                .ok_or_else(|| unsplittable("no DR prefix"))?;
            let head = captures.get(1).map_or("", |m| m.as_str());
            return Ok(text.split_at(head.len()));
        }
        Err(unsplittable("no splitting rule for these keys"))
    }
}

fn value_of(field: &Field, text: &str) -> KeywordValue {
    if field.integer {
        KeywordValue::parse_padded_int(text)
    } else {
        KeywordValue::parse(text)
    }
}

fn pieces_of(template: &Template, env: &Environment) -> Vec<ExtractPiece> {
    let mut pieces = Vec::new();
    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => pieces.push(ExtractPiece::literal(text.clone())),
            Segment::Placeholder { key, spec } => pieces.push(ExtractPiece::Capture {
                key: key.clone(),
                integer: spec.as_ref().map_or(false, |spec| spec.is_integer()),
            }),
            Segment::EnvVar(name) => {
                let text = env.resolve(name).unwrap_or_else(|| format!("${}", name));
                pieces.push(ExtractPiece::Literal(text));
            }
            Segment::Function(field) => pieces.extend(field.extract_pieces(env)),
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(raw: &str, env: &Environment, path: &str) -> Option<Keywords> {
        let template = Template::parse("t", raw).unwrap();
        ExtractPattern::build(&template, env)
            .unwrap()
            .unwrap()
            .extract(path)
            .unwrap()
    }

    #[test]
    fn test_simple_extraction() {
        let env = Environment::isolated().with_var("MANGA_SPECTRO_REDUX", "/sas/manga/redux");
        let kw = extract(
            "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/stack/manga-{plate}-{ifu}-{wave}CUBE.fits.gz",
            &env,
            "/sas/manga/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz",
        )
        .unwrap();
        assert_eq!(kw.get_str("drpver").as_deref(), Some("v3_1_1"));
        assert_eq!(kw.get("plate"), Some(&KeywordValue::Int(8485)));
        assert_eq!(kw.get("ifu"), Some(&KeywordValue::Int(1901)));
        assert_eq!(kw.get_str("wave").as_deref(), Some("LOG"));
    }

    #[test]
    fn test_packed_single_char_pair() {
        let kw = extract(
            "/redux/{run2d}/{plateid}/spFrame-{br}{id}-{frame:08d}.fits.gz",
            &Environment::isolated(),
            "/redux/v5_13_2/8485/spFrame-b1-00005432.fits.gz",
        )
        .unwrap();
        assert_eq!(kw.get_str("br").as_deref(), Some("b"));
        assert_eq!(kw.get("id"), Some(&KeywordValue::Int(1)));
        assert_eq!(kw.get("frame"), Some(&KeywordValue::Int(5432)));
    }

    #[test]
    fn test_packed_dr_pair() {
        let kw = extract(
            "/sas/{dr}{version}/summary.fits",
            &Environment::isolated(),
            "/sas/DR17beta/summary.fits",
        )
        .unwrap();
        assert_eq!(kw.get_str("dr").as_deref(), Some("DR17"));
        assert_eq!(kw.get_str("version").as_deref(), Some("beta"));
    }

    #[test]
    fn test_unsplittable_pair_is_error() {
        let template = Template::parse("t", "/x/{a}{b}.txt").unwrap();
        let pattern = ExtractPattern::build(&template, &Environment::isolated())
            .unwrap()
            .unwrap();
        assert!(pattern.extract("/x/12.txt").is_err());
    }

    #[test]
    fn test_computed_fields() {
        let kw = extract(
            "/plates/@platedir|/plateHoles-@plateid6|.par",
            &Environment::isolated(),
            "/plates/0084XX/008485/plateHoles-008485.par",
        )
        .unwrap();
        assert_eq!(kw.get("plateid"), Some(&KeywordValue::Int(8485)));

        let kw = extract(
            "/spectro/{run2d}/@pad_fieldid|@isplate|/spField-@pad_fieldid|-{mjd}.fits",
            &Environment::isolated(),
            "/spectro/v6_0_4/15007p/spField-15007-59187.fits",
        )
        .unwrap();
        assert_eq!(kw.get("fieldid"), Some(&KeywordValue::Int(15007)));
        assert_eq!(kw.get("mjd"), Some(&KeywordValue::Int(59187)));
    }

    #[test]
    fn test_no_match_and_no_placeholders() {
        assert!(extract("/a/{b}.fits", &Environment::isolated(), "/a/b.txt").is_none());

        let template = Template::parse("t", "/static/file.fits").unwrap();
        assert!(ExtractPattern::build(&template, &Environment::isolated())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_metacharacters_are_escaped() {
        let kw = extract(
            "/data/v1.0+x/{name}.fits",
            &Environment::isolated(),
            "/data/v1.0+x/star.fits",
        )
        .unwrap();
        assert_eq!(kw.get_str("name").as_deref(), Some("star"));
        assert!(extract("/data/v1.0+x/{name}.fits", &Environment::isolated(), "/data/v1a0+x/star.fits").is_none());
    }
}
