//! Format specifications for `{key:spec}` placeholders
//!
//! Supports the common subset of the standard format mini-language:
//! `[[fill]align][sign][#][0][width][.precision][type]` with types
//! `s d x X o b f F e E %`. Thousands grouping is rejected.

use crate::app::path::keywords::KeywordValue;
use crate::errors::{PathError, PathResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Minus,
    Plus,
    Space,
}

/// Parsed format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    raw: String,
    fill: Option<char>,
    align: Option<Align>,
    sign: Sign,
    alternate: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FormatSpec {
    /// Parse the text following `:` in a placeholder
    pub fn parse(spec: &str) -> PathResult<Self> {
        let invalid = |reason: &str| PathError::InvalidFormatSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = spec.chars().collect();
        let mut pos = 0;
        let mut fill = None;
        let mut align = None;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            fill = Some(chars[0]);
            align = align_of(chars[1]);
            pos = 2;
        } else if let Some(first) = chars.first().and_then(|c| align_of(*c)) {
            align = Some(first);
            pos = 1;
        }

        let mut sign = Sign::Minus;
        match chars.get(pos) {
            Some('+') => {
                sign = Sign::Plus;
                pos += 1;
            }
            Some('-') => pos += 1,
            Some(' ') => {
                sign = Sign::Space;
                pos += 1;
            }
            _ => {}
        }

        let alternate = chars.get(pos) == Some(&'#');
        if alternate {
            pos += 1;
        }

        let zero = chars.get(pos) == Some(&'0');
        if zero {
            pos += 1;
        }

        let width_start = pos;
        while chars.get(pos).map_or(false, |c| c.is_ascii_digit()) {
            pos += 1;
        }
        let width = if pos > width_start {
            chars[width_start..pos]
                .iter()
                .collect::<String>()
                .parse()
                .map_err(|_| invalid("width out of range"))?
        } else {
            0
        };

        if matches!(chars.get(pos), Some(',') | Some('_')) {
            return Err(invalid("digit grouping is not supported"));
        }

        let mut precision = None;
        if chars.get(pos) == Some(&'.') {
            pos += 1;
            let start = pos;
            while chars.get(pos).map_or(false, |c| c.is_ascii_digit()) {
                pos += 1;
            }
            if pos == start {
                return Err(invalid("format specifier missing precision"));
            }
            precision = Some(
                chars[start..pos]
                    .iter()
                    .collect::<String>()
                    .parse()
                    .map_err(|_| invalid("precision out of range"))?,
            );
        }

        let mut kind = None;
        if let Some(c) = chars.get(pos) {
            if !"sdxXobfFeE%".contains(*c) {
                return Err(invalid(&format!("unknown format code '{}'", c)));
            }
            kind = Some(*c);
            pos += 1;
        }

        if pos != chars.len() {
            return Err(invalid("invalid format specifier"));
        }

        Ok(Self {
            raw: spec.to_string(),
            fill,
            align,
            sign,
            alternate,
            zero,
            width,
            precision,
            kind,
        })
    }

    /// Format spec as written in the template
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the rendered value is an integer, so captured text may be zero padded
    pub fn is_integer(&self) -> bool {
        matches!(self.kind, Some('d')) || (self.kind.is_none() && self.zero)
    }

    /// Render a value according to this format spec
    pub fn apply(&self, key: &str, value: &KeywordValue) -> PathResult<String> {
        // wildcards pass through untouched so that globbing still works
        if value.is_wildcard() {
            return Ok(value.to_string());
        }

        match self.kind {
            Some('s') => Ok(self.pad_text(truncate(&value.to_string(), self.precision))),
            Some('d') | Some('x') | Some('X') | Some('o') | Some('b') => {
                let number = self.integer_of(key, value)?;
                Ok(self.render_integer(number))
            }
            Some('f') | Some('F') | Some('e') | Some('E') | Some('%') => {
                let number = self.float_of(key, value)?;
                Ok(self.render_float(number))
            }
            None => match value {
                KeywordValue::Int(number) => Ok(self.render_integer(*number)),
                KeywordValue::Float(number) if self.precision.is_some() => {
                    Ok(self.render_float(*number))
                }
                KeywordValue::Float(number) => {
                    Ok(self.pad_number(number.is_sign_negative(), "", &number.abs().to_string()))
                }
                KeywordValue::Str(text) => Ok(self.pad_text(truncate(text, self.precision))),
            },
            Some(other) => Err(PathError::InvalidFormatSpec {
                spec: self.raw.clone(),
                reason: format!("unknown format code '{}'", other),
            }),
        }
    }

    fn integer_of(&self, key: &str, value: &KeywordValue) -> PathResult<i64> {
        match value {
            KeywordValue::Float(_) => Err(PathError::InvalidKeywordValue {
                key: key.to_string(),
                value: value.to_string(),
                reason: format!("format code '{}' needs an integer", self.raw),
            }),
            other => other.require_int(key),
        }
    }

    fn float_of(&self, key: &str, value: &KeywordValue) -> PathResult<f64> {
        value.as_float().ok_or_else(|| PathError::InvalidKeywordValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("format code '{}' needs a number", self.raw),
        })
    }

    fn render_integer(&self, number: i64) -> String {
        let magnitude = number.unsigned_abs();
        let (prefix, digits) = match self.kind {
            Some('x') => ("0x", format!("{:x}", magnitude)),
            Some('X') => ("0X", format!("{:X}", magnitude)),
            Some('o') => ("0o", format!("{:o}", magnitude)),
            Some('b') => ("0b", format!("{:b}", magnitude)),
            _ => ("", magnitude.to_string()),
        };
        let prefix = if self.alternate { prefix } else { "" };
        self.pad_number(number < 0, prefix, &digits)
    }

    fn render_float(&self, number: f64) -> String {
        let precision = self.precision.unwrap_or(6);
        let magnitude = number.abs();
        let digits = match self.kind {
            Some('e') => exponent(magnitude, precision, false),
            Some('E') => exponent(magnitude, precision, true),
            Some('%') => format!("{:.*}%", precision, magnitude * 100.0),
            Some('F') => format!("{:.*}", precision, magnitude).to_uppercase(),
            _ => format!("{:.*}", precision, magnitude),
        };
        self.pad_number(number.is_sign_negative() && number != 0.0, "", &digits)
    }

    fn pad_number(&self, negative: bool, prefix: &str, digits: &str) -> String {
        let sign = match (negative, self.sign) {
            (true, _) => "-",
            (false, Sign::Plus) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Minus) => "",
        };
        let head = format!("{}{}", sign, prefix);
        let len = head.chars().count() + digits.chars().count();
        let pad = self.width.saturating_sub(len);
        let (fill, align) = self.fill_and_align(Align::Right);

        match align {
            Align::AfterSign => format!("{}{}{}", head, repeat(fill, pad), digits),
            _ => place(&format!("{}{}", head, digits), fill, align, pad),
        }
    }

    fn pad_text(&self, text: String) -> String {
        let pad = self.width.saturating_sub(text.chars().count());
        let (fill, align) = self.fill_and_align(Align::Left);
        let align = if align == Align::AfterSign {
            Align::Right
        } else {
            align
        };
        place(&text, fill, align, pad)
    }

    fn fill_and_align(&self, default_align: Align) -> (char, Align) {
        match (self.fill, self.align, self.zero) {
            (Some(fill), Some(align), _) => (fill, align),
            (None, Some(align), true) => ('0', align),
            (None, Some(align), false) => (' ', align),
            (_, None, true) if default_align == Align::Right => ('0', Align::AfterSign),
            (_, None, true) => ('0', default_align),
            (_, None, false) => (' ', default_align),
        }
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

fn truncate(text: &str, precision: Option<usize>) -> String {
    match precision {
        Some(limit) => text.chars().take(limit).collect(),
        None => text.to_string(),
    }
}

fn repeat(fill: char, count: usize) -> String {
    std::iter::repeat(fill).take(count).collect()
}

fn place(body: &str, fill: char, align: Align, pad: usize) -> String {
    match align {
        Align::Left => format!("{}{}", body, repeat(fill, pad)),
        Align::Center => {
            let left = pad / 2;
            format!("{}{}{}", repeat(fill, left), body, repeat(fill, pad - left))
        }
        _ => format!("{}{}", repeat(fill, pad), body),
    }
}

fn exponent(value: f64, precision: usize, upper: bool) -> String {
    let rendered = format!("{:.*e}", precision, value);
    let (mantissa, exp) = rendered.split_once('e').unwrap_or((rendered.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let marker = if upper { 'E' } else { 'e' };
    format!("{}{}{:+03}", mantissa, marker, exp)
}

/// Render a value with an optional format spec
pub fn format_value(key: &str, value: &KeywordValue, spec: Option<&FormatSpec>) -> PathResult<String> {
    match spec {
        Some(spec) => spec.apply(key, value),
        None => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(spec: &str, value: impl Into<KeywordValue>) -> String {
        FormatSpec::parse(spec)
            .unwrap()
            .apply("key", &value.into())
            .unwrap()
    }

    #[test]
    fn test_integer_padding() {
        assert_eq!(fmt("06d", 8485), "008485");
        assert_eq!(fmt("0>6d", 8485), "008485");
        assert_eq!(fmt("04", 12), "0012");
        assert_eq!(fmt("05d", -42), "-0042");
        assert_eq!(fmt("+d", 7), "+7");
        assert_eq!(fmt(">5", 7), "    7");
        assert_eq!(fmt("<5d", 7), "7    ");
        assert_eq!(fmt("^5d", 7), "  7  ");
    }

    #[test]
    fn test_integer_from_string() {
        assert_eq!(fmt("08d", "5432"), "00005432");
        assert!(FormatSpec::parse("d")
            .unwrap()
            .apply("plate", &KeywordValue::from("abc"))
            .is_err());
    }

    #[test]
    fn test_wildcard_passthrough() {
        assert_eq!(fmt("06d", "*"), "*");
    }

    #[test]
    fn test_bases() {
        assert_eq!(fmt("x", 255), "ff");
        assert_eq!(fmt("#X", 255), "0XFF");
        assert_eq!(fmt("#06b", 5), "0b0101");
        assert_eq!(fmt("o", 8), "10");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt(".2f", 3.14159), "3.14");
        assert_eq!(fmt("07.3f", -1.5), "-01.500");
        assert_eq!(fmt(".1%", 0.25), "25.0%");
        assert_eq!(fmt(".2e", 12345.0), "1.23e+04");
        assert_eq!(fmt("f", 2), "2.000000");
    }

    #[test]
    fn test_strings() {
        assert_eq!(fmt("s", "apo"), "apo");
        assert_eq!(fmt(">5s", "apo"), "  apo");
        assert_eq!(fmt("*<6", "apo"), "apo***");
        assert_eq!(fmt(".2s", "apogee"), "ap");
    }

    #[test]
    fn test_invalid_specs() {
        assert!(FormatSpec::parse("q").is_err());
        assert!(FormatSpec::parse(",d").is_err());
        assert!(FormatSpec::parse(".f").is_err());
        assert!(FormatSpec::parse("5dd").is_err());
    }

    #[test]
    fn test_is_integer() {
        assert!(FormatSpec::parse("06d").unwrap().is_integer());
        assert!(FormatSpec::parse("04").unwrap().is_integer());
        assert!(!FormatSpec::parse("s").unwrap().is_integer());
    }
}
