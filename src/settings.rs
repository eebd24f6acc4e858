use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::locales::{LocaleSample, LocaleTable};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_RETRY_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub batch_size: usize,
    pub retry_limit: usize,
    pub locales: HashMap<String, LocaleSample>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry_limit: DEFAULT_RETRY_LIMIT,
            locales: HashMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    translator: Option<TranslatorSettings>,
    locales: Option<HashMap<String, LocaleSample>>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslatorSettings {
    model: Option<String>,
    batch_size: Option<usize>,
    retry: Option<usize>,
}

/// Loads the embedded defaults, then layers every settings file that exists.
/// Later files win field by field; `extra_path` must exist when given.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings
        .merge_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded settings")?;

    let mut ordered_paths = vec![
        PathBuf::from("xcstrings-llm.toml"),
        PathBuf::from("xcstrings-llm.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_str(&content)
                .with_context(|| format!("invalid settings file: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed)
    }

    pub fn locale_table(&self) -> LocaleTable {
        LocaleTable::embedded().with_records(self.locales.clone())
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(translator) = incoming.translator {
            if let Some(model) = translator.model {
                if !model.trim().is_empty() {
                    self.model = model.trim().to_string();
                }
            }
            if let Some(size) = translator.batch_size {
                if size == 0 {
                    return Err(anyhow!("[translator] batch_size must be at least 1"));
                }
                self.batch_size = size;
            }
            if let Some(retry) = translator.retry {
                if retry == 0 {
                    return Err(anyhow!("[translator] retry must be at least 1"));
                }
                self.retry_limit = retry;
            }
        }
        if let Some(locales) = incoming.locales {
            self.locales.extend(locales);
        }
        Ok(())
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".xcstrings-llm"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locales::LocaleSupport;

    #[test]
    fn embedded_defaults_parse() {
        let mut settings = Settings::default();
        settings.merge_str(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(settings.retry_limit, DEFAULT_RETRY_LIMIT);
    }

    #[test]
    fn later_values_override_earlier_ones() {
        let mut settings = Settings::default();
        settings
            .merge_str("[translator]\nmodel = \"gpt-4o\"\nretry = 5\n")
            .unwrap();
        settings.merge_str("[translator]\nbatch_size = 200\n").unwrap();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.batch_size, 200);
        assert_eq!(settings.retry_limit, 5);
    }

    #[test]
    fn zero_batch_size_or_retry_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .merge_str("[translator]\nbatch_size = 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("batch_size must be at least 1"));
        let err = settings.merge_str("[translator]\nretry = 0\n").unwrap_err();
        assert!(err.to_string().contains("retry must be at least 1"));
    }

    #[test]
    fn invalid_values_name_the_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[translator]\nretry = 0\n").unwrap();

        let err = load_settings(Some(&path)).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("broken.toml"));
        assert!(message.contains("retry must be at least 1"));
    }

    #[test]
    fn extra_file_adds_locale_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.toml");
        fs::write(
            &path,
            "[translator]\nretry = 7\n\n[locales.nl]\nlanguage = \"Dutch\"\nsample = \"- Welkom bij de app\"\n",
        )
        .unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.retry_limit, 7);
        let nl = settings.locale_table().lookup("nl").unwrap();
        assert_eq!(nl.language, "Dutch");
        assert!(settings.locale_table().lookup("ja").is_some());
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }
}
