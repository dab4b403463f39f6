//! Slot manifest files
//!
//! A recursive-copy tool reads a plain list of relative locations; an
//! HTTP-batch tool reads a config of `url`/`output` pairs. Manifests that carry
//! credentials are created owner-readable only.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::auth::Credentials;
use crate::errors::SubprocessResult;

use super::slot::StreamSlot;

/// Layout of a slot manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ManifestFormat {
    /// One relative location per line (`rsync --files-from`)
    #[default]
    Locations,
    /// Locations relative to an rsync module, the module prefix stripped
    ModuleLocations { module: String },
    /// curl config with `url`/`output` pairs and an optional `user` line
    CurlConfig { credentials: Option<Credentials> },
}

impl ManifestFormat {
    fn is_private(&self) -> bool {
        matches!(
            self,
            ManifestFormat::CurlConfig {
                credentials: Some(_)
            }
        )
    }

    /// Manifest text for a slot
    pub fn render(&self, slot: &StreamSlot) -> String {
        let mut lines = Vec::with_capacity(slot.len() * 2 + 1);
        match self {
            ManifestFormat::Locations => {
                lines.extend(slot.locations().into_iter().map(str::to_string));
            }
            ManifestFormat::ModuleLocations { module } => {
                let prefix = format!("{}/", module.trim_matches('/'));
                lines.extend(slot.locations().into_iter().map(|location| {
                    location
                        .trim_start_matches('/')
                        .strip_prefix(&prefix)
                        .unwrap_or(location)
                        .to_string()
                }));
            }
            ManifestFormat::CurlConfig { credentials } => {
                if let Some(credentials) = credentials {
                    lines.push(format!(
                        "user = \"{}\"",
                        quote(&format!("{}:{}", credentials.username, credentials.password()))
                    ));
                }
                for task in slot.tasks() {
                    lines.push(format!("url {}", task.source));
                    lines.push(format!("output {}", task.destination.to_string_lossy()));
                }
            }
        }
        let mut content = lines.join("\n");
        content.push('\n');
        content
    }

    /// Write the manifest for `slot` to `path`
    pub async fn write(&self, path: &Path, slot: &StreamSlot) -> SubprocessResult<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            if self.is_private() {
                options.mode(crate::constants::files::PRIVATE_FILE_PERMISSIONS);
            }
        }
        let mut file = options.open(path).await?;
        file.write_all(self.render(slot).as_bytes()).await?;
        file.flush().await?;
        debug!(
            "Wrote manifest {} with {} entries",
            path.display(),
            slot.len()
        );
        Ok(())
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
