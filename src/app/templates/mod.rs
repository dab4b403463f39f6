//! Release template stores
//!
//! A template store maps a release identifier (`dr17`, `sdsswork`, ...) to the
//! path templates and environment definitions of that release. The resolver
//! only depends on the [`TemplateStore`] trait.
//!
//! Two implementations are provided:
//!
//! - [`TomlTemplateStore`] reads `<dir>/<release>.toml` files
//! - [`InMemoryTemplateStore`] holds releases built in code
//!
//! # File format
//!
//! ```toml
//! [paths]
//! mangacube = "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/stack/manga-{plate}-{ifu}-{wave}CUBE.fits.gz"
//!
//! [environment]
//! MANGA_SPECTRO_REDUX = "$SAS_BASE_DIR/dr17/manga/spectro/redux"
//! ```

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::templates::TEMPLATE_FILE_EXTENSION;
use crate::errors::{PathError, PathResult};

/// Raw templates and environment definitions of one release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseTemplates {
    /// Release identifier, filled in by the store
    #[serde(skip)]
    pub release: String,
    /// File-type name to template string
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    /// Environment variables defined by the release
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// Source of release templates
pub trait TemplateStore: Send + Sync + Debug {
    /// Load every template of a release
    fn load(&self, release: &str) -> PathResult<ReleaseTemplates>;

    /// Releases this store can provide, sorted
    fn available_releases(&self) -> PathResult<Vec<String>>;
}

/// Store backed by one TOML file per release
#[derive(Debug, Clone)]
pub struct TomlTemplateStore {
    dir: PathBuf,
}

impl TomlTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, release: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", release.to_lowercase(), TEMPLATE_FILE_EXTENSION))
    }
}

impl TemplateStore for TomlTemplateStore {
    fn load(&self, release: &str) -> PathResult<ReleaseTemplates> {
        let path = self.file_for(release);
        let content = std::fs::read_to_string(&path).map_err(|e| PathError::Store {
            release: release.to_string(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let mut templates: ReleaseTemplates =
            toml::from_str(&content).map_err(|e| PathError::Store {
                release: release.to_string(),
                reason: format!("cannot parse {}: {}", path.display(), e),
            })?;
        templates.release = release.to_string();
        debug!(
            "Loaded {} templates for release {} from {}",
            templates.paths.len(),
            release,
            path.display()
        );
        Ok(templates)
    }

    fn available_releases(&self) -> PathResult<Vec<String>> {
        let mut releases = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_FILE_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    releases.push(stem.to_string());
                }
            }
        }
        releases.sort();
        Ok(releases)
    }
}

/// Store holding releases in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    releases: BTreeMap<String, ReleaseTemplates>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or extend a release with path templates
    pub fn with_release<I, K, V>(mut self, release: &str, paths: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.entry(release);
        entry
            .paths
            .extend(paths.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add environment definitions to a release
    pub fn with_environment<I, K, V>(mut self, release: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.entry(release);
        entry
            .environment
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn entry(&mut self, release: &str) -> &mut ReleaseTemplates {
        let key = release.to_lowercase();
        self.releases
            .entry(key.clone())
            .or_insert_with(|| ReleaseTemplates {
                release: key,
                ..ReleaseTemplates::default()
            })
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn load(&self, release: &str) -> PathResult<ReleaseTemplates> {
        self.releases
            .get(&release.to_lowercase())
            .cloned()
            .map(|mut templates| {
                templates.release = release.to_string();
                templates
            })
            .ok_or_else(|| PathError::Store {
                release: release.to_string(),
                reason: "release not available".to_string(),
            })
    }

    fn available_releases(&self) -> PathResult<Vec<String>> {
        Ok(self.releases.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toml_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("dr17.toml"),
            r#"
[paths]
mangaimage = "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/images/{ifu}.png"

[environment]
MANGA_SPECTRO_REDUX = "$SAS_BASE_DIR/dr17/manga/spectro/redux"
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("dr16.toml"), "[paths]\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = TomlTemplateStore::new(dir.path());
        assert_eq!(store.available_releases().unwrap(), vec!["dr16", "dr17"]);

        let release = store.load("DR17").unwrap();
        assert_eq!(release.release, "DR17");
        assert_eq!(
            release.paths["mangaimage"],
            "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/images/{ifu}.png"
        );
        assert!(release.environment.contains_key("MANGA_SPECTRO_REDUX"));

        assert!(matches!(store.load("dr99"), Err(PathError::Store { .. })));
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryTemplateStore::new()
            .with_release("dr17", [("a", "$X/{a}")])
            .with_release("DR17", [("b", "$X/{b}")])
            .with_environment("dr17", [("X", "/x")]);
        let release = store.load("dr17").unwrap();
        assert_eq!(release.paths.len(), 2);
        assert_eq!(release.environment["X"], "/x");
        assert!(store.load("dr16").is_err());
    }
}
