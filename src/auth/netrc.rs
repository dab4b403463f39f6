//! Minimal `.netrc` reader
//!
//! Supports `machine`, `default`, `login`, `password`, `account` and skips
//! `macdef` bodies. Add an entry like
//!
//! ```text
//! machine data.sdss.org
//!     login sdss
//!     password ***-******
//! ```
//!
//! and keep the file at mode 600.

use std::path::{Path, PathBuf};

use crate::errors::{AuthError, AuthResult};

use super::credentials::Credentials;

/// `~/.netrc`, when a home directory is known
pub fn default_netrc_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".netrc"))
}

/// Credentials for `machine`, falling back to a `default` entry
///
/// A missing file yields `Ok(None)`.
pub fn lookup(path: &Path, machine: &str) -> AuthResult<Option<Credentials>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AuthError::Netrc {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };
    parse(&content, machine).map_err(|reason| AuthError::Netrc {
        path: path.to_path_buf(),
        reason,
    })
}

#[derive(Default)]
struct Entry {
    login: Option<String>,
    password: Option<String>,
}

impl Entry {
    fn into_credentials(self) -> Option<Credentials> {
        Some(Credentials::new(self.login?, self.password?))
    }
}

/// Parse netrc text and pick the entry for `machine`
pub fn parse(content: &str, machine: &str) -> Result<Option<Credentials>, String> {
    let mut matched: Option<Entry> = None;
    let mut default: Option<Entry> = None;
    // Which entry the current tokens belong to
    enum Target {
        None,
        Matched,
        Default,
        Other,
    }
    let mut target = Target::None;

    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "machine" => {
                    let name = tokens.next().ok_or("machine without a name")?;
                    target = if name == machine && matched.is_none() {
                        matched = Some(Entry::default());
                        Target::Matched
                    } else {
                        Target::Other
                    };
                }
                "default" => {
                    default = Some(Entry::default());
                    target = Target::Default;
                }
                "login" | "password" | "account" => {
                    let value = tokens
                        .next()
                        .ok_or_else(|| format!("{} without a value", token))?
                        .to_string();
                    let entry = match target {
                        Target::Matched => matched.as_mut(),
                        Target::Default => default.as_mut(),
                        Target::Other => None,
                        Target::None => return Err(format!("{} outside of a machine entry", token)),
                    };
                    if let Some(entry) = entry {
                        match token {
                            "login" => entry.login = Some(value),
                            "password" => entry.password = Some(value),
                            _ => {}
                        }
                    }
                }
                "macdef" => {
                    // Macro body runs until the next blank line
                    for body in lines.by_ref() {
                        if body.trim().is_empty() {
                            break;
                        }
                    }
                    break;
                }
                other if other.starts_with('#') => break,
                other => return Err(format!("unexpected token {}", other)),
            }
        }
    }

    Ok(matched
        .and_then(Entry::into_credentials)
        .or_else(|| default.and_then(Entry::into_credentials)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NETRC: &str = "\
# SAS access
machine data.sdss.org
    login sdss
    password s3cret

machine dtn01.sdss.org login rsyncer password other
macdef init
cd /sas
quit

default login anonymous password guest
";

    #[test]
    fn test_machine_entry() {
        let credentials = parse(NETRC, "data.sdss.org").unwrap().unwrap();
        assert_eq!(credentials.username, "sdss");
        assert_eq!(credentials.password(), "s3cret");

        let credentials = parse(NETRC, "dtn01.sdss.org").unwrap().unwrap();
        assert_eq!(credentials.username, "rsyncer");
    }

    #[test]
    fn test_default_entry() {
        let credentials = parse(NETRC, "svn.sdss.org").unwrap().unwrap();
        assert_eq!(credentials.username, "anonymous");
        assert_eq!(parse("machine a login b password c\n", "z").unwrap(), None);
    }

    #[test]
    fn test_malformed() {
        assert!(parse("login orphan", "x").is_err());
        assert!(parse("machine", "x").is_err());
        assert!(parse("machine x bogus y", "x").is_err());
    }

    #[test]
    fn test_lookup_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(lookup(&temp.path().join(".netrc"), "data.sdss.org")
            .unwrap()
            .is_none());
    }
}
