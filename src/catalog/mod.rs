//! Remote script catalog
//!
//! Entries live in a single arena and categories refer to them by [`EntryId`],
//! so the derived "Updates" category shares entries with the category they
//! were fetched under instead of copying them.

pub mod metadata;

pub use metadata::{FileSpec, FullMetadata};

use crate::error::{StoreError, StoreResult};
use crate::remote::UNKNOWN_VERSION;
use crate::versions::VersionStore;
use metadata::{clean_json, deserialize_files};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Name of the derived category listing installed scripts with newer versions
pub const UPDATES_CATEGORY: &str = "Updates";

/// Category used when the catalog is a flat array
pub const LEGACY_CATEGORY: &str = "All Scripts";

/// Category whose entries install under the themes directory
pub const THEMES_CATEGORY: &str = "Themes";

/// Identity of an installable package in the version store.
///
/// Always built through [`PackageKey::new`] so the catalog, the installer and
/// the UI agree on the exact string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageKey(String);

impl PackageKey {
    /// `owner/repo:name`, or `owner/repo` for an unnamed entry
    pub fn new(owner: &str, repo: &str, name: &str) -> Self {
        if name.is_empty() {
            Self(format!("{}/{}", owner, repo))
        } else {
            Self(format!("{}/{}:{}", owner, repo, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of an entry in the catalog arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// One installable script as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub name: String,
    pub owner: String,
    pub repo: String,
    pub description: String,
    /// Declared version, [`UNKNOWN_VERSION`] when the repo has no release
    pub version: String,
    /// Release tag from legacy catalogs (`latest_release.tag_name`)
    pub release_tag: Option<String>,
    pub category: String,
    /// Reference for the per-script metadata endpoint
    pub metadata_reference: Option<String>,
    /// File list embedded in legacy catalogs
    pub inline_files: Vec<FileSpec>,
}

impl ScriptEntry {
    pub fn key(&self) -> PackageKey {
        PackageKey::new(&self.owner, &self.repo, &self.name)
    }

    /// Whether the entry points at a tagged release
    pub fn has_known_version(&self) -> bool {
        !self.version.is_empty() && self.version != UNKNOWN_VERSION
    }

    pub fn is_theme(&self) -> bool {
        self.category == THEMES_CATEGORY
    }
}

/// Named, ordered group of entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub entries: Vec<EntryId>,
}

impl Category {
    pub fn is_updates(&self) -> bool {
        self.name == UPDATES_CATEGORY
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRelease {
    name: Option<String>,
    tag_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInlineMetadata {
    name: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "deserialize_files")]
    files: Vec<FileSpec>,
}

/// Catalog item as it appears on the wire; both the current and the legacy
/// (`latest_release` + embedded `metadata`) shapes are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    name: Option<String>,
    owner: String,
    repo: String,
    description: Option<String>,
    version: Option<String>,
    category: Option<String>,
    metadata_file: Option<String>,
    latest_release: Option<RawRelease>,
    metadata: Option<RawInlineMetadata>,
}

impl RawEntry {
    fn into_entry(self, listed_under: &str) -> ScriptEntry {
        let RawEntry {
            name,
            owner,
            repo,
            description,
            version,
            category,
            metadata_file,
            latest_release,
            metadata,
        } = self;
        let release = latest_release.unwrap_or_default();
        let inline = metadata.unwrap_or_default();

        ScriptEntry {
            name: name.or(inline.name).unwrap_or_else(|| repo.clone()),
            description: description.or(inline.description).unwrap_or_default(),
            version: version
                .or(release.name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            release_tag: release.tag_name,
            category: category.unwrap_or_else(|| listed_under.to_string()),
            metadata_reference: metadata_file.filter(|r| !r.trim().is_empty()),
            inline_files: inline.files,
            owner,
            repo,
        }
    }
}

/// Fetched category → script structure plus the derived Updates category
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<ScriptEntry>,
    categories: Vec<Category>,
}

impl Catalog {
    /// Parse a catalog document.
    ///
    /// Accepts an object keyed by category name (key order preserved) or a flat
    /// array, which becomes the single category [`LEGACY_CATEGORY`]. Entries
    /// that do not deserialize, or lack owner/repo, are skipped.
    pub fn load(raw: &[u8]) -> StoreResult<Self> {
        let value: Value = serde_json::from_str(&clean_json(raw))
            .map_err(|e| StoreError::MalformedCatalog(e.to_string()))?;

        let groups: Vec<(String, Vec<Value>)> = match value {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(name, group)| match group {
                    Value::Array(items) => Some((name, items)),
                    _ => {
                        tracing::warn!("Catalog category '{}' is not a list, skipping", name);
                        None
                    }
                })
                .collect(),
            Value::Array(items) => vec![(LEGACY_CATEGORY.to_string(), items)],
            _ => {
                return Err(StoreError::MalformedCatalog(
                    "expected an object of categories or a list of scripts".to_string(),
                ))
            }
        };

        let mut catalog = Catalog::default();
        for (name, items) in groups {
            if name == UPDATES_CATEGORY {
                tracing::warn!("Ignoring remote '{}' category, it is derived locally", name);
                continue;
            }

            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                match serde_json::from_value::<RawEntry>(item) {
                    Ok(raw) if !raw.owner.is_empty() && !raw.repo.is_empty() => {
                        catalog.entries.push(raw.into_entry(&name));
                        ids.push(EntryId(catalog.entries.len() - 1));
                    }
                    Ok(_) => tracing::warn!("Skipping entry without owner/repo in '{}'", name),
                    Err(e) => tracing::warn!("Skipping malformed entry in '{}': {}", name, e),
                }
            }
            catalog.categories.push(Category { name, entries: ids });
        }

        tracing::info!(
            "Catalog loaded: {} categories, {} scripts",
            catalog.categories.len(),
            catalog.entries.len()
        );
        Ok(catalog)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn category_index(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Number of entries in a category, 0 for an invalid index
    pub fn script_count(&self, category: usize) -> usize {
        self.category(category).map(Category::len).unwrap_or(0)
    }

    pub fn entry(&self, id: EntryId) -> Option<&ScriptEntry> {
        self.entries.get(id.0)
    }

    /// Entry at a position inside a category, `None` when either index is out of range
    pub fn entry_id_at(&self, category: usize, script: usize) -> Option<EntryId> {
        self.category(category)?.entries.get(script).copied()
    }

    pub fn entry_at(&self, category: usize, script: usize) -> Option<&ScriptEntry> {
        self.entry(self.entry_id_at(category, script)?)
    }

    /// Entries in category order, each listed once per category it appears in
    pub fn iter_category<'a>(
        &'a self,
        category: &'a Category,
    ) -> impl Iterator<Item = &'a ScriptEntry> + 'a {
        category
            .entries
            .iter()
            .filter_map(move |id| self.entries.get(id.0))
    }

    /// Look up by exact package key, then by case-insensitive script name
    pub fn find(&self, target: &str) -> Option<&ScriptEntry> {
        let target = target.trim();
        self.entries
            .iter()
            .find(|e| e.key().as_str() == target)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.name.eq_ignore_ascii_case(target))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Rebuild the Updates category from the version store.
    ///
    /// Collects every installed entry whose stored version differs from the
    /// declared one, once per package key, in catalog order. The category is
    /// placed first, or left out entirely when nothing is outdated.
    pub fn recompute_updates(&mut self, versions: &VersionStore) {
        self.categories.retain(|c| !c.is_updates());

        let mut seen = HashSet::new();
        let updates: Vec<EntryId> = self
            .categories
            .iter()
            .flat_map(|c| c.entries.iter().copied())
            .filter(|id| {
                let entry = &self.entries[id.0];
                versions.has_update(entry) && seen.insert(entry.key())
            })
            .collect();

        if !updates.is_empty() {
            tracing::debug!("{} update(s) available", updates.len());
            self.categories.insert(
                0,
                Category {
                    name: UPDATES_CATEGORY.to_string(),
                    entries: updates,
                },
            );
        }
    }
}
