//! Computed-field functions referenced as `@name|` in templates
//!
//! The set is closed: each variant declares the keywords it reads, how it
//! renders a path segment, and which regular expression recovers that segment
//! during extraction. Unknown names are rejected when a template is parsed.

use crate::app::path::environment::Environment;
use crate::app::path::extract::ExtractPiece;
use crate::app::path::keywords::{KeywordValue, Keywords};
use crate::errors::{PathError, PathResult};

/// Reduction versions whose outputs live under `$SPECTRO_REDUX`
const SPECTRO_REDUX_RUN2D: &[&str] = &["26", "103", "104"];

/// Reduction versions that still use plate-based field directories
const PLATE_RUN2D: &[&str] = &["v6_0_1", "v6_0_2", "v6_0_3", "v6_0_4"];

/// Accepted spellings of the catalog identifier
const CATALOG_ID_KEYS: &[&str] = &["catalogid", "catid", "cat_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputedField {
    /// `NNNNXX/NNNNNN` plate directory
    Platedir,
    /// Plate id padded to six digits below 10000
    Plateid6,
    /// Spectro reduction root chosen by `run2d`
    Spectrodir,
    /// `NNNNXX` design group
    Definitiondir,
    /// `NNNNXX` configuration group
    Configgrp,
    /// `NNNXXX` field group
    Fieldgrp,
    /// Healpix thousands bucket
    Healpixgrp,
    /// `ap`/`as` file prefix by telescope or instrument
    Apgprefix,
    /// Instrument name by telescope
    Apginst,
    /// `NN/NN` catalog id buckets
    CatIdGroups,
    /// Optional component name
    ComponentDefault,
    /// `p` suffix for plate-era reductions
    Isplate,
    /// Field id padding by reduction version
    PadFieldid,
}

impl ComputedField {
    pub const ALL: [ComputedField; 13] = [
        ComputedField::Platedir,
        ComputedField::Plateid6,
        ComputedField::Spectrodir,
        ComputedField::Definitiondir,
        ComputedField::Configgrp,
        ComputedField::Fieldgrp,
        ComputedField::Healpixgrp,
        ComputedField::Apgprefix,
        ComputedField::Apginst,
        ComputedField::CatIdGroups,
        ComputedField::ComponentDefault,
        ComputedField::Isplate,
        ComputedField::PadFieldid,
    ];

    /// Look up a function by the token used in templates
    pub fn from_name(name: &str) -> PathResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name() == name)
            .ok_or_else(|| PathError::UnknownFunction {
                function: name.to_string(),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            ComputedField::Platedir => "platedir",
            ComputedField::Plateid6 => "plateid6",
            ComputedField::Spectrodir => "spectrodir",
            ComputedField::Definitiondir => "definitiondir",
            ComputedField::Configgrp => "configgrp",
            ComputedField::Fieldgrp => "fieldgrp",
            ComputedField::Healpixgrp => "healpixgrp",
            ComputedField::Apgprefix => "apgprefix",
            ComputedField::Apginst => "apginst",
            ComputedField::CatIdGroups => "cat_id_groups",
            ComputedField::ComponentDefault => "component_default",
            ComputedField::Isplate => "isplate",
            ComputedField::PadFieldid => "pad_fieldid",
        }
    }

    /// Keywords that must be supplied for the function to run
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            ComputedField::Platedir | ComputedField::Plateid6 => &["plateid"],
            ComputedField::Spectrodir | ComputedField::Isplate => &["run2d"],
            ComputedField::Definitiondir => &["designid"],
            ComputedField::Configgrp => &["configid"],
            ComputedField::Fieldgrp => &["fieldid"],
            ComputedField::Healpixgrp => &["healpix"],
            ComputedField::Apginst => &["telescope"],
            ComputedField::CatIdGroups => &["catalogid"],
            ComputedField::PadFieldid => &["fieldid", "run2d"],
            ComputedField::Apgprefix | ComputedField::ComponentDefault => &[],
        }
    }

    /// Keywords read when present but never required
    pub fn optional_keys(self) -> &'static [&'static str] {
        match self {
            ComputedField::Apgprefix => &["telescope", "instrument"],
            ComputedField::ComponentDefault => &["component"],
            _ => &[],
        }
    }

    /// Required keywords absent from `keywords`
    pub fn missing_keys(self, keywords: &Keywords) -> Vec<&'static str> {
        if self == ComputedField::CatIdGroups {
            return if catalog_id(keywords).is_some() {
                Vec::new()
            } else {
                vec!["catalogid"]
            };
        }
        self.required_keys()
            .iter()
            .copied()
            .filter(|key| !keywords.contains_key(key))
            .collect()
    }

    /// Compute the path segment
    ///
    /// Returns `Ok(None)` when an environment variable the function needs is undefined.
    pub fn evaluate(self, keywords: &Keywords, env: &Environment) -> PathResult<Option<String>> {
        let value = match self {
            ComputedField::Platedir => {
                let plateid = int_key(keywords, "plateid")?;
                format!("{:04}XX/{:06}", plateid / 100, plateid)
            }
            ComputedField::Plateid6 => {
                let plateid = int_key(keywords, "plateid")?;
                if plateid < 10000 {
                    format!("{:06}", plateid)
                } else {
                    plateid.to_string()
                }
            }
            ComputedField::Spectrodir => {
                let run2d = str_key(keywords, "run2d")?;
                let var = if SPECTRO_REDUX_RUN2D.contains(&run2d.as_str()) {
                    "SPECTRO_REDUX"
                } else {
                    "BOSS_SPECTRO_REDUX"
                };
                return Ok(env.resolve(var));
            }
            ComputedField::Definitiondir => {
                format!("{:04}XX", int_key(keywords, "designid")? / 100)
            }
            ComputedField::Configgrp => {
                format!("{:04}XX", int_key(keywords, "configid")? / 100)
            }
            ComputedField::Fieldgrp => match wildcard(keywords, "fieldid") {
                Some(pattern) => pattern,
                None => format!("{:03}XXX", int_key(keywords, "fieldid")? / 1000),
            },
            ComputedField::Healpixgrp => (int_key(keywords, "healpix")? / 1000).to_string(),
            ComputedField::Apgprefix => apogee_prefix(keywords)?,
            ComputedField::Apginst => match keywords.get_str("telescope") {
                None => String::new(),
                Some(telescope) => instrument_for(&telescope)?.to_string(),
            },
            ComputedField::CatIdGroups => {
                let (key, value) = catalog_id(keywords).ok_or_else(|| missing("catalogid"))?;
                let id = value.require_int(key)?;
                format!("{:02}/{:02}", (id / 100) % 100, id % 100)
            }
            ComputedField::ComponentDefault => keywords.get_str("component").unwrap_or_default(),
            ComputedField::Isplate => match keywords.get_str("run2d") {
                Some(run2d) if PLATE_RUN2D.contains(&run2d.as_str()) => "p".to_string(),
                _ => String::new(),
            },
            ComputedField::PadFieldid => pad_fieldid(keywords)?,
        };
        Ok(Some(value))
    }

    /// Regular expression pieces that match this function's output
    pub fn extract_pieces(self, env: &Environment) -> Vec<ExtractPiece> {
        match self {
            ComputedField::Platedir => vec![
                ExtractPiece::pattern(r"\d{4}XX"),
                ExtractPiece::literal("/"),
                ExtractPiece::integer_capture("plateid"),
            ],
            ComputedField::Plateid6 => vec![ExtractPiece::integer_capture("plateid")],
            ComputedField::Spectrodir => {
                let roots: Vec<String> = ["SPECTRO_REDUX", "BOSS_SPECTRO_REDUX"]
                    .iter()
                    .filter_map(|var| env.resolve(var))
                    .map(|root| regex::escape(&root))
                    .collect();
                if roots.is_empty() {
                    vec![ExtractPiece::pattern(".*?")]
                } else {
                    vec![ExtractPiece::pattern(format!("(?:{})", roots.join("|")))]
                }
            }
            ComputedField::Definitiondir | ComputedField::Configgrp => {
                vec![ExtractPiece::pattern(r"\d{4}XX")]
            }
            ComputedField::Fieldgrp => vec![ExtractPiece::pattern(r"\d{3}XXX")],
            ComputedField::Healpixgrp => vec![ExtractPiece::pattern(r"\d+")],
            ComputedField::Apgprefix => vec![ExtractPiece::pattern("(?:ap|as)?")],
            ComputedField::Apginst => vec![ExtractPiece::pattern("(?:apogee-n|apogee-s)?")],
            ComputedField::CatIdGroups => vec![ExtractPiece::pattern(r"\d{2}/\d{2}")],
            ComputedField::ComponentDefault => vec![ExtractPiece::capture("component")],
            ComputedField::Isplate => vec![ExtractPiece::pattern("(?:p)?")],
            ComputedField::PadFieldid => vec![ExtractPiece::integer_capture("fieldid")],
        }
    }
}

fn missing(key: &str) -> PathError {
    PathError::InvalidKeywordValue {
        key: key.to_string(),
        value: String::new(),
        reason: "keyword is required".to_string(),
    }
}

fn value_of<'a>(keywords: &'a Keywords, key: &str) -> PathResult<&'a KeywordValue> {
    keywords.get(key).ok_or_else(|| missing(key))
}

fn int_key(keywords: &Keywords, key: &str) -> PathResult<i64> {
    value_of(keywords, key)?.require_int(key)
}

fn str_key(keywords: &Keywords, key: &str) -> PathResult<String> {
    Ok(value_of(keywords, key)?.to_string())
}

fn wildcard(keywords: &Keywords, key: &str) -> Option<String> {
    keywords
        .get(key)
        .filter(|value| value.is_wildcard())
        .map(ToString::to_string)
}

fn catalog_id(keywords: &Keywords) -> Option<(&'static str, &KeywordValue)> {
    CATALOG_ID_KEYS
        .iter()
        .find_map(|key| keywords.get(key).map(|value| (*key, value)))
}

fn instrument_for(telescope: &str) -> PathResult<&'static str> {
    match telescope {
        "apo25m" | "apo1m" => Ok("apogee-n"),
        "lco25m" => Ok("apogee-s"),
        other => Err(PathError::InvalidKeywordValue {
            key: "telescope".to_string(),
            value: other.to_string(),
            reason: "expected one of apo25m, apo1m, lco25m".to_string(),
        }),
    }
}

fn apogee_prefix(keywords: &Keywords) -> PathResult<String> {
    if let Some(telescope) = keywords.get_str("telescope") {
        let prefix = match instrument_for(&telescope)? {
            "apogee-s" => "as",
            _ => "ap",
        };
        return Ok(prefix.to_string());
    }
    match keywords.get_str("instrument").as_deref() {
        None => Ok(String::new()),
        Some("apogee-n") => Ok("ap".to_string()),
        Some("apogee-s") => Ok("as".to_string()),
        Some(other) => Err(PathError::InvalidKeywordValue {
            key: "instrument".to_string(),
            value: other.to_string(),
            reason: "expected apogee-n or apogee-s".to_string(),
        }),
    }
}

fn pad_fieldid(keywords: &Keywords) -> PathResult<String> {
    let (Some(fieldid), Some(run2d)) = (keywords.get("fieldid"), keywords.get_str("run2d")) else {
        return Ok(String::new());
    };
    if fieldid.is_wildcard() {
        return Ok(fieldid.to_string());
    }
    if PLATE_RUN2D.contains(&run2d.as_str()) {
        return Ok(fieldid.to_string());
    }
    Ok(format!("{:06}", fieldid.require_int("fieldid")?))
}
