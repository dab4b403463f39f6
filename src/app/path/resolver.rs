//! Template-driven path resolver
//!
//! [`PathResolver`] owns the parsed templates of exactly one release. It turns
//! `(file type, keywords)` into local paths, relative locations and remote URLs,
//! and recovers keywords from concrete paths.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use rand::seq::SliceRandom;
use regex::Regex;
use tracing::{debug, info};

use crate::app::path::compression::adjust_compression;
use crate::app::path::environment::{Environment, PreserveEnvVars};
use crate::app::path::extract::ExtractPattern;
use crate::app::path::keywords::Keywords;
use crate::app::path::location::{insert_version_tag, join_url, relative_to, strip_version_tag};
use crate::app::path::template::Template;
use crate::app::queue::FilterMode;
use crate::app::templates::TemplateStore;
use crate::constants::{env, remote, templates};
use crate::errors::{AccessError, AccessResult, PathError, PathResult, Result};

/// Runtime configuration of a resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Release to load; `None` falls back to `$TREE_VER`, then the default release
    pub release: Option<String>,
    /// Treat the release as public even if its name does not say so
    pub public: bool,
    /// Use the mirror host instead of the primary host
    pub mirror: bool,
    /// Local root of the SAS tree; `None` reads `$SAS_BASE_DIR`
    pub base_dir: Option<PathBuf>,
    /// URL scheme
    pub scheme: String,
    /// Explicit host, overriding the mirror flag
    pub netloc: Option<String>,
    /// Directory segment between host and location in URLs; empty to omit
    pub sas_dir: String,
    /// Which caller variables survive release environment definitions
    pub preserve_envvars: PreserveEnvVars,
    /// Environment variables naming alternate product roots, searched in order
    pub product_roots: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            release: None,
            public: false,
            mirror: false,
            base_dir: None,
            scheme: remote::SCHEME.to_string(),
            netloc: None,
            sas_dir: remote::SAS_SEGMENT.to_string(),
            preserve_envvars: PreserveEnvVars::None,
            product_roots: env::PRODUCT_ROOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Whether a release name denotes a public data release (`DR17`, `dr8`, ...)
pub fn is_public_release(release: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(templates::PUBLIC_RELEASE_PATTERN).expect("static release pattern"))
        .is_match(release)
}

fn template_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static name pattern"))
}

/// Resolves named templates for the active release
#[derive(Debug)]
pub struct PathResolver {
    store: Arc<dyn TemplateStore>,
    config: ResolverConfig,
    env: Environment,
    release: String,
    templates: BTreeMap<String, Template>,
}

impl PathResolver {
    /// Create a resolver and load its initial release
    pub fn new(
        store: Arc<dyn TemplateStore>,
        config: ResolverConfig,
        env: Environment,
    ) -> PathResult<Self> {
        let release = config
            .release
            .clone()
            .or_else(|| env.get(env::RELEASE_OVERRIDE))
            .unwrap_or_else(|| templates::DEFAULT_RELEASE.to_string());

        let mut resolver = Self {
            store,
            config,
            env,
            release: String::new(),
            templates: BTreeMap::new(),
        };
        resolver.set_release(&release)?;
        Ok(resolver)
    }

    /// Switch release, discarding every loaded template including temporary ones
    pub fn set_release(&mut self, release: &str) -> PathResult<()> {
        let raw = self.store.load(release)?;
        let mut parsed = BTreeMap::new();
        for (name, template) in &raw.paths {
            parsed.insert(name.clone(), Template::parse(name.clone(), template.clone())?);
        }

        self.env.set_release_layer(raw.environment);
        self.env.set_preserve(self.config.preserve_envvars.clone());
        self.templates = parsed;
        self.release = release.to_string();
        info!(
            "Loaded {} path templates for release {}",
            self.templates.len(),
            self.release
        );
        Ok(())
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn store(&self) -> &Arc<dyn TemplateStore> {
        &self.store
    }

    pub fn is_public(&self) -> bool {
        self.config.public || is_public_release(&self.release)
    }

    /// Host serving SAS locations
    pub fn netloc(&self) -> &str {
        match &self.config.netloc {
            Some(netloc) => netloc.as_str(),
            None if self.config.mirror => remote::MIRROR_NETLOC,
            None => remote::SAS_NETLOC,
        }
    }

    /// `scheme://netloc`
    pub fn remote_base(&self) -> String {
        format!("{}://{}", self.config.scheme, self.netloc())
    }

    /// Local SAS root
    pub fn base_dir(&self) -> Option<String> {
        match &self.config.base_dir {
            Some(dir) => Some(dir.to_string_lossy().into_owned()),
            None => self.env.resolve(env::BASE_DIR),
        }
    }

    /// Names of every template in the active release
    pub fn lookup_names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn template(&self, name: &str) -> PathResult<&Template> {
        self.templates
            .get(name)
            .ok_or_else(|| PathError::UnknownFileType {
                name: name.to_string(),
                release: self.release.clone(),
            })
    }

    /// Keys a caller must supply for `name`
    pub fn lookup_keys(&self, name: &str) -> PathResult<BTreeSet<String>> {
        Ok(self.template(name)?.lookup_keys())
    }

    /// Fully resolved local path
    ///
    /// `Ok(None)` means an environment variable used by the template is undefined.
    pub fn full(&self, name: &str, keywords: &Keywords) -> PathResult<Option<String>> {
        let template = self.template(name)?;
        let missing = template.missing_keys(keywords);
        if !missing.is_empty() {
            return Err(PathError::MissingKeyword {
                name: name.to_string(),
                keys: missing,
            });
        }

        let Some(rendered) = template.render(keywords, &self.env)? else {
            debug!("Template {} references an undefined environment variable", name);
            return Ok(None);
        };
        adjust_compression(&strip_version_tag(&rendered)).map(Some)
    }

    /// Path relative to `base_dir` (default: the configured base directory)
    pub fn location(
        &self,
        name: &str,
        keywords: &Keywords,
        base_dir: Option<&str>,
    ) -> PathResult<Option<String>> {
        Ok(self
            .full(name, keywords)?
            .and_then(|full| self.location_for_path(&full, base_dir)))
    }

    /// Relative location of an already resolved path
    pub fn location_for_path(&self, full: &str, base_dir: Option<&str>) -> Option<String> {
        let base = base_dir.map(str::to_string).or_else(|| self.base_dir());
        base.and_then(|base| relative_to(full, &base))
            .or_else(|| self.product_location(full))
    }

    fn product_location(&self, full: &str) -> Option<String> {
        self.config
            .product_roots
            .iter()
            .filter_map(|var| self.env.resolve(var))
            .find_map(|root| relative_to(full, &root))
    }

    /// Remote URL of a resolved template
    pub fn url(&self, name: &str, keywords: &Keywords) -> Result<Option<String>> {
        match self.full(name, keywords)? {
            Some(full) => Ok(Some(self.url_for_path(&full)?)),
            None => Ok(None),
        }
    }

    /// Remote URL of an already resolved path
    ///
    /// Paths under the base directory map to `scheme://netloc/sas/<location>`;
    /// paths under a product root map to the subversion host with `tags/`
    /// inserted before the version component.
    pub fn url_for_path(&self, full: &str) -> AccessResult<String> {
        if let Some(location) = self.base_dir().and_then(|base| relative_to(full, &base)) {
            return Ok(join_url(
                &self.remote_base(),
                &[&self.config.sas_dir, &location],
            ));
        }

        if let Some(location) = self.product_location(full) {
            let svn_base = format!("{}://{}", self.config.scheme, remote::SVN_NETLOC);
            let scope = if self.is_public() { "public" } else { "" };
            return Ok(join_url(&svn_base, &[scope, &insert_version_tag(&location)]));
        }

        Err(AccessError::LocationUnresolvable {
            path: full.to_string(),
        })
    }

    /// Recover keyword values from a concrete path
    pub fn extract(&self, name: &str, example: &str) -> PathResult<Option<Keywords>> {
        let template = self.template(name)?;
        match ExtractPattern::build(template, &self.env)? {
            Some(pattern) => pattern.extract(example),
            None => Ok(None),
        }
    }

    /// Directory part of the resolved path
    pub fn dir(&self, name: &str, keywords: &Keywords) -> PathResult<Option<String>> {
        Ok(self.full(name, keywords)?.map(|full| {
            Path::new(&full)
                .parent()
                .map(|parent| parent.to_string_lossy().into_owned())
                .unwrap_or_default()
        }))
    }

    /// File name part of the resolved path
    pub fn name(&self, name: &str, keywords: &Keywords) -> PathResult<Option<String>> {
        Ok(self.full(name, keywords)?.and_then(|full| {
            Path::new(&full)
                .file_name()
                .map(|file| file.to_string_lossy().into_owned())
        }))
    }

    /// Whether the resolved file exists locally
    pub fn exists(&self, name: &str, keywords: &Keywords) -> PathResult<bool> {
        Ok(self
            .full(name, keywords)?
            .map_or(false, |full| Path::new(&full).exists()))
    }

    /// Local files matching a resolved path, which may contain wildcards
    pub fn expand(&self, name: &str, keywords: &Keywords) -> PathResult<Vec<String>> {
        let Some(full) = self.full(name, keywords)? else {
            return Ok(Vec::new());
        };
        let mut matches: Vec<String> = glob::glob(&full)?
            .filter_map(|entry| entry.ok())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        matches.sort();
        Ok(matches)
    }

    /// Remote URLs of every local match
    pub fn expand_urls(&self, name: &str, keywords: &Keywords) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        for path in self.expand(name, keywords)? {
            urls.push(self.url_for_path(&path)?);
        }
        Ok(urls)
    }

    /// Whether any local file matches
    pub fn any(&self, name: &str, keywords: &Keywords) -> PathResult<bool> {
        Ok(!self.expand(name, keywords)?.is_empty())
    }

    /// One random local match
    pub fn one(&self, name: &str, keywords: &Keywords) -> PathResult<Option<String>> {
        let matches = self.expand(name, keywords)?;
        Ok(matches.choose(&mut rand::thread_rng()).cloned())
    }

    /// Up to `count` random local matches
    pub fn random(&self, name: &str, keywords: &Keywords, count: usize) -> PathResult<Vec<String>> {
        let matches = self.expand(name, keywords)?;
        Ok(matches
            .choose_multiple(&mut rand::thread_rng(), count)
            .cloned()
            .collect())
    }

    /// Keep or drop entries matching `pattern`
    pub fn refine(list: &[String], pattern: &str, mode: FilterMode) -> PathResult<Vec<String>> {
        let regex = Regex::new(pattern)?;
        Ok(list
            .iter()
            .filter(|item| mode.keeps(regex.is_match(item)))
            .cloned()
            .collect())
    }

    /// Register a template for the current release only
    ///
    /// The template must start with an environment variable. `envvar_path`
    /// defines that variable when the caller's environment lacks it.
    pub fn add_temp_path(
        &mut self,
        name: &str,
        template: &str,
        envvar_path: Option<&str>,
    ) -> PathResult<()> {
        if !template_name_pattern().is_match(name) {
            return Err(PathError::InvalidTemplateName {
                name: name.to_string(),
            });
        }
        let parsed = Template::parse(name, template)?;
        let root = parsed
            .root_envvar()
            .ok_or_else(|| PathError::TemplateNotRooted {
                template: template.to_string(),
            })?
            .to_string();

        if let Some(path) = envvar_path {
            self.env.set(root.clone(), path);
        }
        if !self.env.is_defined(&root) {
            return Err(PathError::EnvVarUndefined { var: root });
        }

        debug!("Added temporary template {} = {}", name, template);
        self.templates.insert(name.to_string(), parsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::path::keywords::KeywordValue;
    use crate::app::templates::InMemoryTemplateStore;
    use crate::errors::AppError;
    use tempfile::TempDir;

    fn store() -> Arc<dyn TemplateStore> {
        Arc::new(
            InMemoryTemplateStore::new()
                .with_release(
                    "dr17",
                    [
                        (
                            "mangacube",
                            "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/stack/manga-{plate}-{ifu}-{wave}CUBE.fits.gz",
                        ),
                        ("plate", "$SAS_BASE_DIR/base/{plate}/{ifu}.fits.gz"),
                        (
                            "mangapreimg",
                            "$MANGAPREIM_DIR/data/{designgrp}/{designid}/preimage-{mangaid}_irg.jpg",
                        ),
                        ("unset", "$NOT_DEFINED_ANYWHERE/{x}.fits"),
                    ],
                )
                .with_environment(
                    "dr17",
                    [("MANGA_SPECTRO_REDUX", "$SAS_BASE_DIR/dr17/manga/spectro/redux")],
                )
                .with_release("sdsswork", [("mangacube", "$SAS_BASE_DIR/work/{plate}.fits")]),
        )
    }

    fn resolver(base: &str) -> PathResolver {
        let env = Environment::isolated()
            .with_var("SAS_BASE_DIR", base)
            .with_var("PRODUCT_ROOT", "/products")
            .with_var("MANGAPREIM_DIR", "/products/data/manga/mangapreim/tags/v2_5");
        let config = ResolverConfig {
            release: Some("DR17".to_string()),
            ..ResolverConfig::default()
        };
        PathResolver::new(store(), config, env).unwrap()
    }

    fn cube_keywords() -> Keywords {
        Keywords::new()
            .with("drpver", "v3_1_1")
            .with("plate", 8485)
            .with("ifu", 1901)
            .with("wave", "LOG")
    }

    #[test]
    fn test_full_and_url() {
        let r = resolver("/sas");
        let full = r.full("mangacube", &cube_keywords()).unwrap().unwrap();
        assert_eq!(
            full,
            "/sas/dr17/manga/spectro/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz"
        );
        assert_eq!(
            r.location("mangacube", &cube_keywords(), None).unwrap().as_deref(),
            Some("dr17/manga/spectro/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz")
        );
        assert_eq!(
            r.url("mangacube", &cube_keywords()).unwrap().as_deref(),
            Some("https://data.sdss.org/sas/dr17/manga/spectro/redux/v3_1_1/8485/stack/manga-8485-1901-LOGCUBE.fits.gz")
        );
    }

    #[test]
    fn test_missing_keys_are_all_reported() {
        let r = resolver("/sas");
        match r.full("mangacube", &Keywords::new()) {
            Err(PathError::MissingKeyword { keys, .. }) => {
                assert_eq!(keys, vec!["drpver", "ifu", "plate", "wave"])
            }
            other => panic!("expected MissingKeyword, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_and_undefined_env() {
        let r = resolver("/sas");
        assert!(matches!(
            r.full("nope", &Keywords::new()),
            Err(PathError::UnknownFileType { .. })
        ));
        assert_eq!(r.full("unset", &Keywords::new().with("x", 1)).unwrap(), None);
        assert_eq!(r.url("unset", &Keywords::new().with("x", 1)).unwrap(), None);
    }

    #[test]
    fn test_compression_follows_disk() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_string_lossy().into_owned();
        let r = resolver(&base);
        let kw = Keywords::new().with("plate", 8485).with("ifu", 1901);

        let full = r.full("plate", &kw).unwrap().unwrap();
        assert_eq!(full, format!("{}/base/8485/1901.fits.gz", base));

        std::fs::create_dir_all(dir.path().join("base/8485")).unwrap();
        std::fs::write(dir.path().join("base/8485/1901.fits"), b"data").unwrap();
        let full = r.full("plate", &kw).unwrap().unwrap();
        assert_eq!(full, format!("{}/base/8485/1901.fits", base));
        assert!(r.exists("plate", &kw).unwrap());
        assert_eq!(r.name("plate", &kw).unwrap().as_deref(), Some("1901.fits"));
        assert_eq!(r.expand("plate", &Keywords::new().with("plate", "*").with("ifu", "*")).unwrap().len(), 1);
        assert!(r.any("plate", &Keywords::new().with("plate", "*").with("ifu", "*")).unwrap());
    }

    #[test]
    fn test_product_root_urls() {
        let r = resolver("/sas");
        let kw = Keywords::new()
            .with("designgrp", "D0084XX")
            .with("designid", 8405)
            .with("mangaid", "1-42007");
        let full = r.full("mangapreimg", &kw).unwrap().unwrap();
        assert!(full.contains("mangapreim/v2_5/data"));
        assert!(!full.contains("tags/"));

        assert!(r.location("mangapreimg", &kw, None).unwrap().unwrap().starts_with("data"));

        let url = r.url("mangapreimg", &kw).unwrap().unwrap();
        assert_eq!(
            url,
            "https://svn.sdss.org/public/data/manga/mangapreim/tags/v2_5/data/D0084XX/8405/preimage-1-42007_irg.jpg"
        );
        assert_eq!(r.url_for_path(&full).unwrap(), url);
    }

    #[test]
    fn test_unresolvable_location() {
        let r = resolver("/sas");
        let err = r.url_for_path("/elsewhere/file.fits").unwrap_err();
        assert!(matches!(err, AccessError::LocationUnresolvable { .. }));
        let app: AppError = err.into();
        assert_eq!(app.category(), "access");
    }

    #[test]
    fn test_extract_roundtrip() {
        let r = resolver("/sas");
        let full = r.full("mangacube", &cube_keywords()).unwrap().unwrap();
        let extracted = r.extract("mangacube", &full).unwrap().unwrap();
        assert_eq!(extracted, cube_keywords());
        assert_eq!(extracted.get("plate"), Some(&KeywordValue::Int(8485)));
    }

    #[test]
    fn test_set_release_reloads() {
        let mut r = resolver("/sas");
        assert!(r.is_public());
        r.add_temp_path("scratch", "$SAS_BASE_DIR/scratch/{x}.txt", None).unwrap();
        assert!(r.lookup_names().contains(&"scratch"));

        r.set_release("sdsswork").unwrap();
        assert_eq!(r.release(), "sdsswork");
        assert!(!r.is_public());
        assert_eq!(r.lookup_names(), vec!["mangacube"]);
        assert_eq!(
            r.full("mangacube", &Keywords::new().with("plate", 1)).unwrap().as_deref(),
            Some("/sas/work/1.fits")
        );
        assert!(r.set_release("dr99").is_err());
        assert_eq!(r.release(), "sdsswork");
    }

    #[test]
    fn test_add_temp_path_validation() {
        let mut r = resolver("/sas");
        assert!(matches!(
            r.add_temp_path("bad name!", "$SAS_BASE_DIR/{x}", None),
            Err(PathError::InvalidTemplateName { .. })
        ));
        assert!(matches!(
            r.add_temp_path("rel", "relative/{x}", None),
            Err(PathError::TemplateNotRooted { .. })
        ));
        assert!(matches!(
            r.add_temp_path("undef", "$MYVAR/{x}", None),
            Err(PathError::EnvVarUndefined { .. })
        ));

        r.add_temp_path("mytemp", "$MYVAR/some/{key}.txt", Some("/tmp/myvar"))
            .unwrap();
        assert_eq!(
            r.full("mytemp", &Keywords::new().with("key", "a")).unwrap().as_deref(),
            Some("/tmp/myvar/some/a.txt")
        );
    }

    #[test]
    fn test_refine() {
        let list = vec!["a/1.fits".to_string(), "b/2.fits".to_string(), "a/3.txt".to_string()];
        assert_eq!(
            PathResolver::refine(&list, r"^a/", FilterMode::Include).unwrap(),
            vec!["a/1.fits", "a/3.txt"]
        );
        assert_eq!(
            PathResolver::refine(&list, r"\.txt$", FilterMode::Exclude).unwrap(),
            vec!["a/1.fits", "b/2.fits"]
        );
    }

    #[test]
    fn test_netloc_selection() {
        let mirror = PathResolver::new(
            store(),
            ResolverConfig {
                release: Some("dr17".into()),
                mirror: true,
                ..ResolverConfig::default()
            },
            Environment::isolated(),
        )
        .unwrap();
        assert_eq!(mirror.remote_base(), "https://data.mirror.sdss.org");
        assert!(is_public_release("DR8"));
        assert!(!is_public_release("mpl11"));
    }
}
