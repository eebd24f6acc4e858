use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

include!(concat!(env!("OUT_DIR"), "/embedded_locale_records.rs"));

/// Display name of a locale and a worked example of the bullet format in it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocaleSample {
    pub language: String,
    pub sample: String,
}

pub trait LocaleSupport {
    fn lookup(&self, locale: &str) -> Option<LocaleSample>;
}

/// Locale records from settings, backed by the records compiled in from
/// `src/locales/*.toml`.
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    records: HashMap<String, LocaleSample>,
    use_embedded: bool,
}

impl LocaleTable {
    pub fn embedded() -> Self {
        Self {
            records: HashMap::new(),
            use_embedded: true,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_records<I>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = (String, LocaleSample)>,
    {
        self.records.extend(
            records
                .into_iter()
                .map(|(code, sample)| (normalize_code(&code), sample)),
        );
        self
    }
}

impl LocaleSupport for LocaleTable {
    fn lookup(&self, locale: &str) -> Option<LocaleSample> {
        let code = normalize_code(locale);
        if let Some(sample) = self.records.get(&code) {
            return Some(sample.clone());
        }
        if !self.use_embedded {
            return None;
        }
        let raw = embedded_locale_record(&code)?;
        match toml::from_str(raw) {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!("ignoring malformed locale record '{}': {}", code, err);
                None
            }
        }
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_records_match_case_insensitively() {
        let table = LocaleTable::embedded();
        let ja = table.lookup("ja").unwrap();
        assert_eq!(ja.language, "Japanese");
        assert_eq!(ja.sample, "- アプリへようこそ\n- すべてを選択");
        assert_eq!(
            table.lookup("ZH-hans").map(|sample| sample.language),
            Some("Simplified Chinese".to_string())
        );
        assert_eq!(table.lookup("tlh"), None);
    }

    #[test]
    fn configured_records_override_embedded_ones() {
        let table = LocaleTable::embedded().with_records([(
            "JA".to_string(),
            LocaleSample {
                language: "日本語".to_string(),
                sample: "- ようこそ".to_string(),
            },
        )]);
        assert_eq!(table.lookup("ja").unwrap().language, "日本語");
    }

    #[test]
    fn empty_table_knows_nothing() {
        assert_eq!(LocaleTable::empty().lookup("ja"), None);
    }
}
