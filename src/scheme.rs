use std::path::Path;

use uuid::Uuid;

use crate::pattern::PatternSource;

/// One entry in the scheme list: a named pattern location.
#[derive(Clone, Debug)]
pub struct SchemeEntry {
    pub id: Uuid,
    pub name: String,
    /// URL or file path of the pattern JSON.
    pub url: String,
}

impl SchemeEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// Entry for a file picked from disk, named after its stem.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        Self::new(name, path.to_string_lossy())
    }

    pub fn source(&self) -> PatternSource {
        PatternSource::parse(&self.url)
    }

    /// `name|url`, the settings-file form.
    pub fn to_config_value(&self) -> String {
        format!("{}|{}", self.name, self.url)
    }

    pub fn from_config_value(value: &str) -> Option<Self> {
        let (name, url) = value.split_once('|')?;
        let (name, url) = (name.trim(), url.trim());
        if url.is_empty() {
            return None;
        }
        let name = if name.is_empty() { url } else { name };
        Some(Self::new(name, url))
    }
}

impl PartialEq for SchemeEntry {
    /// Ids are per-session; two entries are the same scheme when they name
    /// the same location the same way.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.url == other.url
    }
}
