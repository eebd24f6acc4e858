use tracing::warn;

use crate::catalog::{Catalog, KeyPath};
use crate::error::CatalogError;
use crate::providers::Message;

#[derive(Debug, Clone)]
pub struct PromptBatcherConfig {
    pub system_prompt: String,
    pub source_locale: String,
    pub source_device: Option<String>,
    pub target_locale: String,
    pub batch_char_limit: usize,
    pub separator: String,
    pub prefix: Option<String>,
}

/// One translation request and the key paths it covers, in message order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBatch {
    pub keys: Vec<KeyPath>,
    pub messages: Vec<Message>,
}

/// Splits the untranslated source strings of a catalog into requests of
/// roughly `batch_char_limit` characters.
///
/// Key paths are taken from the back of the work queue, so batches cover the
/// catalog in reverse document order. The character budget counts the system
/// prompt, every separator and prefix, and every value. A batch always admits
/// at least one key and stops once the budget is reached, so it overshoots by
/// at most one value.
#[derive(Debug)]
pub struct PromptBatcher<'a> {
    catalog: &'a Catalog,
    queue: Vec<KeyPath>,
    config: PromptBatcherConfig,
}

impl<'a> PromptBatcher<'a> {
    pub fn new(catalog: &'a Catalog, config: PromptBatcherConfig) -> Self {
        let queue = catalog
            .list_keys(
                None,
                Some(config.source_locale.as_str()),
                config.source_device.as_deref(),
            )
            .filter(|keypath| is_pending(catalog, keypath, &config.target_locale))
            .collect();
        Self {
            catalog,
            queue,
            config,
        }
    }

    /// Key paths still waiting to be batched, in discovery order.
    pub fn pending(&self) -> &[KeyPath] {
        &self.queue
    }

    pub fn config(&self) -> &PromptBatcherConfig {
        &self.config
    }

    fn next_batch(&mut self) -> Result<PromptBatch, CatalogError> {
        let config = &self.config;
        let mut char_count = config.system_prompt.chars().count();
        let mut body = String::new();
        let mut keys = Vec::new();
        let mut first = true;

        while let Some(keypath) = self.queue.pop() {
            if let Some(value) = self.catalog.get(&keypath)? {
                if first {
                    first = false;
                } else {
                    body.push_str(&config.separator);
                    char_count += config.separator.chars().count();
                }
                if let Some(prefix) = &config.prefix {
                    body.push_str(prefix);
                    char_count += prefix.chars().count();
                }
                body.push_str(value);
                char_count += value.chars().count();
            }
            keys.push(keypath);

            if char_count >= config.batch_char_limit {
                break;
            }
        }

        Ok(PromptBatch {
            keys,
            messages: vec![
                Message::system(config.system_prompt.clone()),
                Message::user(body),
            ],
        })
    }
}

/// A source path needs work when its target is missing and can be written.
/// Blank source values are skipped too: a blank reply line is dropped when the
/// reply is parsed, so such a batch could never come back complete.
fn is_pending(catalog: &Catalog, source: &KeyPath, target_locale: &str) -> bool {
    let target = source.with_locale(target_locale);
    if catalog.has_entry(&target) {
        return false;
    }
    if !catalog.accepts(&target) {
        warn!(
            "skipping {}: {} holds a different kind of localization",
            source, target
        );
        return false;
    }
    if matches!(catalog.get(source), Ok(Some(value)) if value.trim().is_empty()) {
        warn!("skipping {}: source value is blank", source);
        return false;
    }
    true
}

impl Iterator for PromptBatcher<'_> {
    type Item = Result<PromptBatch, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.queue.is_empty() {
            return None;
        }
        Some(self.next_batch())
    }
}
