use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::{
    Catalog, DeviceVariation, Entry, ExtractionState, LocalizationNode, StringUnit, UnitState,
};
use crate::error::CatalogError;

type Object = Map<String, Value>;

impl Catalog {
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(content).map_err(CatalogError::Decode)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, CatalogError> {
        let root = value
            .as_object()
            .ok_or_else(|| format_error("document must be an object"))?;

        let source_language = root
            .get("sourceLanguage")
            .and_then(Value::as_str)
            .ok_or_else(|| format_error("sourceLanguage must be a string"))?;

        let strings = root
            .get("strings")
            .and_then(Value::as_object)
            .ok_or_else(|| format_error("strings must be an object"))?;
        let mut entries = IndexMap::with_capacity(strings.len());
        for (key, raw) in strings {
            entries.insert(key.clone(), parse_entry(key, raw)?);
        }

        let version = root
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| format_error("version must be a string"))?;

        Ok(Catalog {
            source_language: source_language.to_string(),
            entries,
            version: version.to_string(),
        })
    }
}

fn parse_entry(key: &str, raw: &Value) -> Result<Entry, CatalogError> {
    let object = raw
        .as_object()
        .ok_or_else(|| format_error(format!("entry '{}' must be an object", key)))?;

    let localizations = object
        .get("localizations")
        .and_then(Value::as_object)
        .ok_or_else(|| format_error(format!("entry '{}': localizations must be an object", key)))?;

    let extraction_state = match optional_str(object, "extractionState", key)? {
        Some(value) => Some(ExtractionState::parse(value).ok_or_else(|| {
            format_error(format!(
                "entry '{}': invalid extractionState '{}'",
                key, value
            ))
        })?),
        None => None,
    };
    let comment = optional_str(object, "comment", key)?.map(str::to_string);

    let mut nodes = IndexMap::with_capacity(localizations.len());
    for (locale, raw_node) in localizations {
        let node = raw_node.as_object().ok_or_else(|| {
            format_error(format!(
                "entry '{}': localization '{}' must be an object",
                key, locale
            ))
        })?;
        match parse_node(key, locale, node)? {
            Some(parsed) => {
                nodes.insert(locale.clone(), parsed);
            }
            None => warn!(
                "unknown localization shape for '{}' [{}]; dropping it",
                key, locale
            ),
        }
    }

    Ok(Entry {
        localizations: nodes,
        extraction_state,
        comment,
    })
}

fn optional_str<'a>(
    object: &'a Object,
    field: &str,
    key: &str,
) -> Result<Option<&'a str>, CatalogError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(format_error(format!(
            "entry '{}': {} must be a string or null",
            key, field
        ))),
    }
}

/// Decides the node kind from its shape. `None` means neither shape matched.
fn parse_node(
    key: &str,
    locale: &str,
    node: &Object,
) -> Result<Option<LocalizationNode>, CatalogError> {
    if is_unit_shape(node) {
        let unit = parse_unit(key, locale, node)?;
        return Ok(Some(LocalizationNode::Unit(unit)));
    }
    if is_variation_shape(node) {
        let variation = parse_variation(key, locale, node)?;
        return Ok(Some(LocalizationNode::DeviceVariation(variation)));
    }
    Ok(None)
}

fn is_unit_shape(node: &Object) -> bool {
    node.get("stringUnit")
        .and_then(Value::as_object)
        .is_some_and(|unit| unit.contains_key("state") && unit.contains_key("value"))
}

fn is_variation_shape(node: &Object) -> bool {
    node.get("variations")
        .and_then(Value::as_object)
        .is_some_and(|variations| variations.contains_key("device"))
}

fn parse_unit(key: &str, locale: &str, node: &Object) -> Result<StringUnit, CatalogError> {
    let unit = node
        .get("stringUnit")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            format_error(format!(
                "'{}' [{}]: stringUnit must be an object",
                key, locale
            ))
        })?;
    let state = unit
        .get("state")
        .and_then(Value::as_str)
        .ok_or_else(|| format_error(format!("'{}' [{}]: state must be a string", key, locale)))?;
    let state = UnitState::parse(state).ok_or_else(|| {
        format_error(format!("'{}' [{}]: invalid state '{}'", key, locale, state))
    })?;
    let value = unit
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| format_error(format!("'{}' [{}]: value must be a string", key, locale)))?;
    Ok(StringUnit::new(value, state))
}

fn parse_variation(
    key: &str,
    locale: &str,
    node: &Object,
) -> Result<DeviceVariation, CatalogError> {
    let devices = node
        .get("variations")
        .and_then(|variations| variations.get("device"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            format_error(format!(
                "'{}' [{}]: variations.device must be an object",
                key, locale
            ))
        })?;

    let mut parsed = IndexMap::with_capacity(devices.len());
    for (device, raw) in devices {
        let scope = format!("{}/{}", locale, device);
        let object = raw.as_object().ok_or_else(|| {
            format_error(format!("'{}' [{}]: variation must be an object", key, scope))
        })?;
        parsed.insert(device.clone(), parse_unit(key, &scope, object)?);
    }
    Ok(DeviceVariation { devices: parsed })
}

fn format_error(message: impl Into<String>) -> CatalogError {
    CatalogError::Format(message.into())
}

impl Serialize for LocalizationNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            LocalizationNode::Unit(unit) => map.serialize_entry("stringUnit", unit)?,
            LocalizationNode::DeviceVariation(variation) => {
                map.serialize_entry("variations", &Variations { device: variation })?
            }
        }
        map.end()
    }
}

#[derive(Serialize)]
struct Variations<'a> {
    device: &'a DeviceVariation,
}

impl Serialize for DeviceVariation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.devices
                .iter()
                .map(|(device, unit)| (device, WrappedUnit { string_unit: unit })),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WrappedUnit<'a> {
    string_unit: &'a StringUnit,
}
