//! # Metadata Composition Module
//!
//! Questo modulo gestisce il template dei metadata e la composizione per singolo file.
//!
//! ## Responsabilità:
//! - Caricamento del template JSON (una volta per batch, immutabile durante il run)
//! - Contenitore ordinato chiave/valore (`TagSet`) che preserva l'ordine del file
//! - Composizione pura: template + titolo derivato dal nome file se manca `title`
//! - Derivazione deterministica del titolo dal nome base del file
//!
//! ## Regola di merge:
//! - Il template vince sempre
//! - Se il template non ha la chiave `title`, viene aggiunto un titolo derivato
//! - Il template originale non viene mai modificato (copia fresca per ogni file)
//!
//! ## Esempio:
//! ```rust,ignore
//! let template = MetadataTemplate::load(Path::new("sample_metadata.json")).await?;
//! let metadata = compose(&template, "01-holiday_trip");
//! assert_eq!(metadata.get("title"), Some("holiday trip"));
//! ```

use crate::error::TaggerError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Key that receives the derived display title
pub const TITLE_KEY: &str = "title";

/// Ordered mapping from tag key to tag value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: Vec<(String, String)>,
}

/// Per-item metadata produced by [`compose`]
pub type ComposedMetadata = TagSet;

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace a tag, keeping the position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every tag of `other` over this set
    pub fn extend_from(&mut self, other: &TagSet) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for (key, value) in iter {
            tags.insert(key, value);
        }
        tags
    }
}

/// Base tag set loaded once per batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTemplate {
    tags: TagSet,
}

impl MetadataTemplate {
    pub fn new(tags: TagSet) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Load the template from a JSON file
    pub async fn load(path: &Path) -> Result<Self, TaggerError> {
        if !path.exists() {
            return Err(TaggerError::Configuration(format!(
                "Metadata file '{}' not found",
                path.display()
            )));
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            TaggerError::Configuration(format!("Cannot read metadata file '{}': {}", path.display(), e))
        })?;

        let template = Self::from_json_str(&content).map_err(|e| match e {
            TaggerError::Configuration(msg) => {
                TaggerError::Configuration(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;

        debug!("Loaded {} template tags from {}", template.tags.len(), path.display());
        Ok(template)
    }

    /// Parse a JSON object of string values; numbers and booleans are stringified
    pub fn from_json_str(content: &str) -> Result<Self, TaggerError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| TaggerError::Configuration(format!("Invalid JSON format: {}", e)))?;

        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(TaggerError::Configuration(format!(
                    "Metadata template must be a JSON object, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mut tags = TagSet::new();
        for (key, value) in object {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(TaggerError::Configuration(format!(
                        "Tag '{}' must be a string, found {}",
                        key,
                        json_kind(&other)
                    )))
                }
            };
            tags.insert(key, text);
        }

        Ok(Self { tags })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merge the template with a title derived from `base_name` when the template has none
pub fn compose(template: &MetadataTemplate, base_name: &str) -> ComposedMetadata {
    let mut metadata = template.tags().clone();
    if !metadata.contains_key(TITLE_KEY) {
        metadata.insert(TITLE_KEY, derive_title(base_name));
    }
    metadata
}

/// Turn a file base name into a display title.
///
/// Strips a leading playlist index (`07-`, `07.`, `07_`, `07 `), replaces
/// underscores with spaces and collapses whitespace. Never returns an empty string.
pub fn derive_title(base_name: &str) -> String {
    let humanized = strip_playlist_index(base_name)
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if !humanized.is_empty() {
        return humanized;
    }

    let raw = base_name.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }

    "Untitled".to_string()
}

fn strip_playlist_index(name: &str) -> &str {
    let rest = name.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == name.len() {
        return name;
    }

    match rest.chars().next() {
        Some('-' | '.' | '_' | ' ') => {
            let title = rest.trim_start_matches(|c: char| c == '-' || c == '.' || c == '_' || c.is_whitespace());
            if title.is_empty() {
                name
            } else {
                title
            }
        }
        _ => name,
    }
}
