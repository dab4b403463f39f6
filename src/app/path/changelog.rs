//! Differences in path templates between releases

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::app::path::resolver::is_public_release;
use crate::app::templates::TemplateStore;
use crate::errors::PathResult;

/// A template whose text changed between releases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathChange {
    pub name: String,
    pub old: String,
    pub new: String,
}

/// Templates added or modified in `new` relative to `old`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changelog {
    pub new_release: String,
    pub old_release: String,
    pub added: BTreeMap<String, String>,
    pub updated: Vec<PathChange>,
}

impl Changelog {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path changes from {} to {}", self.old_release, self.new_release)?;
        if self.is_empty() {
            return writeln!(f, "  (none)");
        }
        if !self.added.is_empty() {
            writeln!(f, "New paths:")?;
            for (name, template) in &self.added {
                writeln!(f, "  {} = {}", name, template)?;
            }
        }
        if !self.updated.is_empty() {
            writeln!(f, "Updated paths:")?;
            for change in &self.updated {
                writeln!(f, "  {}", change.name)?;
                writeln!(f, "    old: {}", change.old)?;
                writeln!(f, "    new: {}", change.new)?;
            }
        }
        Ok(())
    }
}

/// Compare the templates of two releases
pub fn compute_changelog(store: &dyn TemplateStore, new: &str, old: &str) -> PathResult<Changelog> {
    let new_paths = store.load(new)?.paths;
    let old_paths = store.load(old)?.paths;

    let mut changelog = Changelog {
        new_release: new.to_string(),
        old_release: old.to_string(),
        ..Changelog::default()
    };
    for (name, template) in new_paths {
        match old_paths.get(&name) {
            None => {
                changelog.added.insert(name, template);
            }
            Some(previous) if *previous != template => changelog.updated.push(PathChange {
                name,
                old: previous.clone(),
                new: template,
            }),
            Some(_) => {}
        }
    }
    Ok(changelog)
}

/// Template of `name` in every available release, `None` where it is undefined
pub fn templates_by_release(
    store: &dyn TemplateStore,
    name: &str,
    public_only: bool,
) -> PathResult<BTreeMap<String, Option<String>>> {
    let mut versions = BTreeMap::new();
    for release in store.available_releases()? {
        if public_only && !is_public_release(&release) {
            continue;
        }
        let template = store.load(&release)?.paths.get(name).cloned();
        versions.insert(release, template);
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::templates::InMemoryTemplateStore;

    fn store() -> InMemoryTemplateStore {
        InMemoryTemplateStore::new()
            .with_release(
                "dr16",
                [
                    ("mangaimage", "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/{dir3d}/images/{ifu}.png"),
                    ("spec", "$BOSS/{plate}/spec.fits"),
                ],
            )
            .with_release(
                "dr17",
                [
                    ("mangaimage", "$MANGA_SPECTRO_REDUX/{drpver}/{plate}/images/{ifu}.png"),
                    ("spec", "$BOSS/{plate}/spec.fits"),
                    ("apogee_astronn", "$APOGEE_ASTRONN/apogee_astroNN-{release}.fits"),
                ],
            )
            .with_release("sdsswork", [("spec", "$BOSS/{plate}/spec.fits")])
    }

    #[test]
    fn test_compute_changelog() {
        let changelog = compute_changelog(&store(), "dr17", "dr16").unwrap();
        assert_eq!(
            changelog.added["apogee_astronn"],
            "$APOGEE_ASTRONN/apogee_astroNN-{release}.fits"
        );
        assert_eq!(changelog.updated.len(), 1);
        assert_eq!(changelog.updated[0].name, "mangaimage");
        assert!(changelog.to_string().contains("New paths:"));

        let same = compute_changelog(&store(), "dr17", "dr17").unwrap();
        assert!(same.is_empty());
    }

    #[test]
    fn test_templates_by_release() {
        let versions = templates_by_release(&store(), "mangaimage", false).unwrap();
        assert_eq!(versions["sdsswork"], None);
        assert_eq!(
            versions["dr17"].as_deref(),
            Some("$MANGA_SPECTRO_REDUX/{drpver}/{plate}/images/{ifu}.png")
        );

        let public = templates_by_release(&store(), "mangaimage", true).unwrap();
        assert!(!public.contains_key("sdsswork"));
        assert_eq!(public.len(), 2);
    }
}
