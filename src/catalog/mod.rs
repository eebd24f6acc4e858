use std::fs;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry as Slot;
use serde::Serialize;

use crate::error::CatalogError;

mod document;
mod keypath;

pub use keypath::KeyPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Translated,
    NeedsReview,
    New,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Translated => "translated",
            UnitState::NeedsReview => "needs_review",
            UnitState::New => "new",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "translated" => Some(UnitState::Translated),
            "needs_review" => Some(UnitState::NeedsReview),
            "new" => Some(UnitState::New),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    Stale,
    ExtractedWithValue,
    Manual,
}

impl ExtractionState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stale" => Some(ExtractionState::Stale),
            "extracted_with_value" => Some(ExtractionState::ExtractedWithValue),
            "manual" => Some(ExtractionState::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringUnit {
    pub value: String,
    pub state: UnitState,
}

impl StringUnit {
    pub fn new(value: impl Into<String>, state: UnitState) -> Self {
        Self {
            value: value.into(),
            state,
        }
    }

    fn seeded(value: Option<&str>, state: Option<UnitState>) -> Self {
        Self::new(
            value.unwrap_or_default(),
            state.unwrap_or(UnitState::NeedsReview),
        )
    }

    fn update(&mut self, value: Option<&str>, state: Option<UnitState>) {
        if let Some(value) = value {
            self.value = value.to_string();
        }
        if let Some(state) = state {
            self.state = state;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceVariation {
    pub devices: IndexMap<String, StringUnit>,
}

/// A locale's value. The kind is fixed when the document is parsed or the
/// slot is created and is never inferred again afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalizationNode {
    Unit(StringUnit),
    DeviceVariation(DeviceVariation),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub localizations: IndexMap<String, LocalizationNode>,
    pub extraction_state: Option<ExtractionState>,
    pub comment: Option<String>,
}

/// In-memory string catalog. Entries, locales and devices keep document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    source_language: String,
    #[serde(rename = "strings")]
    entries: IndexMap<String, Entry>,
    version: String,
}

impl Catalog {
    pub fn new(source_language: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            entries: IndexMap::new(),
            version: version.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &IndexMap<String, Entry> {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enumerates every addressable string in document order. A locale holding
    /// a plain unit yields one device-less path; a locale holding device
    /// variations yields one path per device. Each filter narrows its level.
    pub fn list_keys<'a>(
        &'a self,
        key: Option<&'a str>,
        locale: Option<&'a str>,
        device: Option<&'a str>,
    ) -> impl Iterator<Item = KeyPath> + 'a {
        self.entries
            .iter()
            .filter(move |(name, _)| key.is_none_or(|wanted| wanted == name.as_str()))
            .flat_map(move |(name, entry)| {
                entry
                    .localizations
                    .iter()
                    .filter(move |(code, _)| locale.is_none_or(|wanted| wanted == code.as_str()))
                    .flat_map(move |(code, node)| node_keypaths(name, code, node, device))
            })
    }

    pub fn has_entry(&self, keypath: &KeyPath) -> bool {
        match (self.node(keypath), keypath.device()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(LocalizationNode::DeviceVariation(variation)), Some(device)) => {
                variation.devices.contains_key(device)
            }
            (Some(LocalizationNode::Unit(_)), Some(_)) => false,
        }
    }

    /// Whether `set` can write at `keypath` without a kind conflict.
    pub fn accepts(&self, keypath: &KeyPath) -> bool {
        !matches!(
            (self.node(keypath), keypath.device()),
            (Some(LocalizationNode::Unit(_)), Some(_))
                | (Some(LocalizationNode::DeviceVariation(_)), None)
        )
    }

    pub fn get(&self, keypath: &KeyPath) -> Result<Option<&str>, CatalogError> {
        let Some(node) = self.node(keypath) else {
            return Ok(None);
        };
        match (node, keypath.device()) {
            (LocalizationNode::Unit(unit), None) => Ok(Some(unit.value.as_str())),
            (LocalizationNode::DeviceVariation(variation), Some(device)) => Ok(variation
                .devices
                .get(device)
                .map(|unit| unit.value.as_str())),
            (node, _) => Err(mismatch(keypath, node)),
        }
    }

    /// Writes `value` and `state` at `keypath`, creating the entry, locale or
    /// device on demand with an empty `needs_review` unit. Fields passed as
    /// `None` are left untouched on an existing unit.
    pub fn set(
        &mut self,
        keypath: &KeyPath,
        value: Option<&str>,
        state: Option<UnitState>,
    ) -> Result<(), CatalogError> {
        if !self.accepts(keypath) {
            if let Some(node) = self.node(keypath) {
                return Err(mismatch(keypath, node));
            }
        }

        let entry = self.entries.entry(keypath.key().to_string()).or_default();
        match entry.localizations.entry(keypath.locale().to_string()) {
            Slot::Vacant(slot) => {
                let unit = StringUnit::seeded(value, state);
                let node = match keypath.device() {
                    None => LocalizationNode::Unit(unit),
                    Some(device) => LocalizationNode::DeviceVariation(DeviceVariation {
                        devices: IndexMap::from([(device.to_string(), unit)]),
                    }),
                };
                slot.insert(node);
            }
            Slot::Occupied(mut slot) => match (slot.get_mut(), keypath.device()) {
                (LocalizationNode::Unit(unit), None) => unit.update(value, state),
                (LocalizationNode::DeviceVariation(variation), Some(device)) => {
                    match variation.devices.entry(device.to_string()) {
                        Slot::Occupied(mut unit) => unit.get_mut().update(value, state),
                        Slot::Vacant(unit) => {
                            unit.insert(StringUnit::seeded(value, state));
                        }
                    }
                }
                (node, _) => return Err(mismatch(keypath, node)),
            },
        }
        Ok(())
    }

    pub fn remove_locale(&mut self, locale: &str) {
        for entry in self.entries.values_mut() {
            entry.localizations.shift_remove(locale);
        }
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self).map_err(CatalogError::Encode)
    }

    /// Serializes into a temporary file next to `path` and moves it into place.
    /// An existing file keeps its permissions.
    pub fn write_to_path(&self, path: &Path) -> Result<(), CatalogError> {
        let json = self.to_json()?;
        let write_error = |source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut file = tempfile::Builder::new()
            .prefix(".xcstrings-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(write_error)?;
        if let Ok(metadata) = fs::metadata(path) {
            file.as_file()
                .set_permissions(metadata.permissions())
                .map_err(write_error)?;
        }
        file.write_all(json.as_bytes()).map_err(write_error)?;
        file.persist(path).map_err(|err| write_error(err.error))?;
        Ok(())
    }

    fn node(&self, keypath: &KeyPath) -> Option<&LocalizationNode> {
        self.entries
            .get(keypath.key())?
            .localizations
            .get(keypath.locale())
    }
}

fn node_keypaths(
    key: &str,
    locale: &str,
    node: &LocalizationNode,
    device: Option<&str>,
) -> Vec<KeyPath> {
    match node {
        LocalizationNode::Unit(_) => vec![KeyPath::new(key, locale)],
        LocalizationNode::DeviceVariation(variation) => variation
            .devices
            .keys()
            .filter(|name| device.is_none_or(|wanted| wanted == name.as_str()))
            .map(|name| KeyPath::with_device(key, locale, name.as_str()))
            .collect(),
    }
}

fn mismatch(keypath: &KeyPath, node: &LocalizationNode) -> CatalogError {
    let reason = match node {
        LocalizationNode::Unit(_) => "a device was given but the locale holds a single string unit",
        LocalizationNode::DeviceVariation(_) => {
            "no device was given but the locale holds device variations"
        }
    };
    CatalogError::TypeMismatch {
        keypath: keypath.clone(),
        reason,
    }
}
