//! Transfer command templates
//!
//! Commands are kept as a program plus argument list. Placeholders
//! `{path}`, `{source}` and `{destination}` are substituted per argument, so
//! values containing spaces never need shell quoting.

use std::fmt;

/// Values substituted into a command template for one slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandContext {
    /// Slot manifest path
    pub path: String,
    /// Transfer source root
    pub source: String,
    /// Transfer destination root
    pub destination: String,
}

/// Program and argument template of a transfer tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

/// Fully substituted command ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace separated template; returns `None` when empty
    pub fn parse(template: &str) -> Option<Self> {
        let mut words = template.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Substitute the slot context into every argument
    pub fn render(&self, context: &CommandContext) -> RenderedCommand {
        RenderedCommand {
            program: self.program.clone(),
            args: self
                .args
                .iter()
                .map(|arg| {
                    arg.replace("{path}", &context.path)
                        .replace("{source}", &context.source)
                        .replace("{destination}", &context.destination)
                })
                .collect(),
        }
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let template = CommandTemplate::parse(
            "rsync -avRK --files-from={path} {source}/dr17 {destination}/dr17/",
        )
        .unwrap();
        let rendered = template.render(&CommandContext {
            path: "/tmp/run/sas_sync_00.txt".to_string(),
            source: "rsync://sdss@dtn01.sdss.org".to_string(),
            destination: "/data with space/sas".to_string(),
        });
        assert_eq!(rendered.program, "rsync");
        assert_eq!(
            rendered.args,
            vec![
                "-avRK",
                "--files-from=/tmp/run/sas_sync_00.txt",
                "rsync://sdss@dtn01.sdss.org/dr17",
                "/data with space/sas/dr17/",
            ]
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(CommandTemplate::parse("   ").is_none());
        let template = CommandTemplate::parse("curl --create-dirs --fail -sSRLK {path}").unwrap();
        assert_eq!(template.to_string(), "curl --create-dirs --fail -sSRLK {path}");
    }
}
