use tracing::{debug, info, warn};

use crate::batcher::{PromptBatch, PromptBatcher, PromptBatcherConfig};
use crate::catalog::{Catalog, KeyPath, UnitState};
use crate::error::{CatalogError, TranslateError};
use crate::locales::LocaleSupport;
use crate::prompt;
use crate::providers::ChatProvider;
use crate::settings::DEFAULT_RETRY_LIMIT;

pub const LINE_PREFIX: &str = "- ";
const LINE_SEPARATOR: &str = "\n";
const CODE_FENCE: &str = "```";

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub model: String,
    pub source_locale: String,
    pub target_locale: String,
    pub batch_char_limit: usize,
    pub retry_limit: usize,
}

impl TranslatorConfig {
    pub fn new(
        model: impl Into<String>,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
        batch_char_limit: usize,
    ) -> Self {
        Self {
            model: model.into(),
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
            batch_char_limit,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    pub fn with_retry_limit(mut self, retry_limit: usize) -> Self {
        self.retry_limit = retry_limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub source_keypath: KeyPath,
    pub target_keypath: KeyPath,
    pub translation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub handled: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct Translator<P: ChatProvider, L: LocaleSupport> {
    provider: P,
    locales: L,
    config: TranslatorConfig,
}

impl<P: ChatProvider, L: LocaleSupport> Translator<P, L> {
    pub fn new(provider: P, locales: L, config: TranslatorConfig) -> Self {
        Self {
            provider,
            locales,
            config,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> Result<String, TranslateError> {
        Ok(prompt::render_system_prompt(
            &self.config.target_locale,
            &self.locales,
        )?)
    }

    /// Translates every source string that has no target-locale counterpart.
    ///
    /// Batches run one at a time. A batch is retried until the reply holds
    /// exactly one line per key, up to `retry_limit` attempts; running out
    /// fails the whole run and no results are returned. The catalog is only
    /// read here; apply the results with [`commit_translations`].
    pub async fn translate<F>(
        &self,
        catalog: &Catalog,
        mut on_progress: F,
    ) -> Result<Vec<TranslationResult>, TranslateError>
    where
        F: FnMut(Progress),
    {
        let batcher = PromptBatcher::new(
            catalog,
            PromptBatcherConfig {
                system_prompt: self.system_prompt()?,
                source_locale: self.config.source_locale.clone(),
                source_device: None,
                target_locale: self.config.target_locale.clone(),
                batch_char_limit: self.config.batch_char_limit,
                separator: LINE_SEPARATOR.to_string(),
                prefix: Some(LINE_PREFIX.to_string()),
            },
        );

        let mut progress = Progress {
            handled: 0,
            total: batcher.pending().len(),
        };
        info!(
            "{} strings to translate from {} to {}",
            progress.total, self.config.source_locale, self.config.target_locale
        );

        let mut results = Vec::with_capacity(progress.total);
        for batch in batcher {
            let batch = batch?;
            results.extend(self.translate_batch(&batch).await?);
            progress.handled += batch.keys.len();
            on_progress(progress);
        }
        Ok(results)
    }

    async fn translate_batch(
        &self,
        batch: &PromptBatch,
    ) -> Result<Vec<TranslationResult>, TranslateError> {
        let retry_limit = self.config.retry_limit;
        for attempt in 1..=retry_limit {
            debug!(
                "requesting {} keys (attempt {}/{})",
                batch.keys.len(),
                attempt,
                retry_limit
            );
            let Some(content) = self
                .provider
                .complete(&self.config.model, &batch.messages)
                .await
            else {
                warn!(
                    "empty response from model. Retrying... (Attempt {}/{})",
                    attempt, retry_limit
                );
                continue;
            };

            let translations = parse_translation_content(&content, LINE_PREFIX);
            if translations.len() != batch.keys.len() {
                warn!(
                    "got {} translations for {} keys. Retrying... (Attempt {}/{})",
                    translations.len(),
                    batch.keys.len(),
                    attempt,
                    retry_limit
                );
                continue;
            }

            return Ok(batch
                .keys
                .iter()
                .zip(translations)
                .map(|(source, translation)| TranslationResult {
                    source_keypath: source.clone(),
                    target_keypath: source.with_locale(&self.config.target_locale),
                    translation,
                })
                .collect());
        }

        Err(TranslateError::Exhausted {
            attempts: retry_limit,
            keys: batch.keys.len(),
        })
    }
}

/// Splits a bullet-list reply into its items. A surrounding code fence is
/// removed first; blank items are dropped.
pub fn parse_translation_content(content: &str, prefix: &str) -> Vec<String> {
    let mut content = content;
    if let Some(rest) = content.strip_prefix(CODE_FENCE) {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix(CODE_FENCE) {
        content = rest;
    }
    let content = format!("\n{}\n", content.trim());
    let delimiter = format!("\n{}", prefix);

    content
        .split(delimiter.as_str())
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Writes every translation into the catalog as `needs_review`. Either all
/// results are applied or, on error, the catalog is left untouched.
pub fn commit_translations(
    catalog: &mut Catalog,
    results: &[TranslationResult],
) -> Result<(), CatalogError> {
    let mut staged = catalog.clone();
    for result in results {
        staged.set(
            &result.target_keypath,
            Some(result.translation.as_str()),
            Some(UnitState::NeedsReview),
        )?;
    }
    *catalog = staged;
    Ok(())
}
