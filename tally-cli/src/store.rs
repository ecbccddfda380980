//! Versioned on-disk storage: category settings plus the raw text of every
//! imported source, so the ledger can be rebuilt by replaying imports.
//!
//! Layout under the store root (default `~/.tally`):
//!   settings.json          version tag + categories
//!   sources/index.json     version tag + ordered (name, file) entries
//!   sources/NNNN.txt       raw source text, exactly as imported
//!
//! Each section carries its own format version so future changes can stay
//! backwards compatible; an unknown version is an error, not a guess.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use tally_core::Category;

const SETTINGS_VERSION: u32 = 0;
const SOURCES_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    version: u32,
    categories: Vec<Category>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SourceIndex {
    version: u32,
    /// Insertion order; replay must preserve it.
    entries: Vec<SourceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SourceEntry {
    name: String,
    file: String,
}

pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Opens the store in `$TALLY_HOME`, or `~/.tally` when unset.
    pub fn open_default() -> Result<Self> {
        let root = match std::env::var_os("TALLY_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(home).join(".tally")
            }
        };
        Self::at(root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("sources"))
            .with_context(|| format!("create {}", root.display()))?;
        Ok(Self { root })
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("sources").join("index.json")
    }

    pub fn load_categories(&self) -> Result<Vec<Category>> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let settings: SettingsFile =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        if settings.version != SETTINGS_VERSION {
            bail!(
                "unsupported settings version {} in {}",
                settings.version,
                path.display()
            );
        }
        Ok(settings.categories)
    }

    pub fn store_categories(&self, categories: &[Category]) -> Result<()> {
        let settings = SettingsFile {
            version: SETTINGS_VERSION,
            categories: categories.to_vec(),
        };
        let path = self.settings_path();
        let json = serde_json::to_string_pretty(&settings)?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn load_index(&self) -> Result<SourceIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(SourceIndex::default());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let index: SourceIndex =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        if index.version != SOURCES_VERSION {
            bail!(
                "unsupported source index version {} in {}",
                index.version,
                path.display()
            );
        }
        Ok(index)
    }

    fn store_index(&self, index: &SourceIndex) -> Result<()> {
        let path = self.index_path();
        let json = serde_json::to_string_pretty(index)?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Raw source texts in their original import order.
    pub fn list_sources(&self) -> Result<Vec<(String, String)>> {
        let index = self.load_index()?;
        let mut sources = Vec::with_capacity(index.entries.len());
        for entry in &index.entries {
            let path = self.root.join("sources").join(&entry.file);
            let text =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            sources.push((entry.name.clone(), text));
        }
        Ok(sources)
    }

    pub fn store_source(&self, name: &str, text: &str) -> Result<()> {
        let mut index = self.load_index()?;
        if index.entries.iter().any(|entry| entry.name == name) {
            bail!("source \"{name}\" is already stored");
        }

        let next = index
            .entries
            .iter()
            .filter_map(|entry| entry.file.strip_suffix(".txt")?.parse::<u32>().ok())
            .max()
            .map_or(0, |max| max + 1);
        let file = format!("{next:04}.txt");

        let path = self.root.join("sources").join(&file);
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;

        index.entries.push(SourceEntry {
            name: name.to_string(),
            file,
        });
        self.store_index(&index)
    }

    /// Removes a stored source; unknown names are a no-op, matching the
    /// ledger's removal contract.
    pub fn remove_source(&self, name: &str) -> Result<()> {
        let mut index = self.load_index()?;
        let Some(position) = index.entries.iter().position(|entry| entry.name == name) else {
            return Ok(());
        };
        let entry = index.entries.remove(position);

        let path = self.root.join("sources").join(&entry.file);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        self.store_index(&index)
    }
}
