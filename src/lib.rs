use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod batcher;
pub mod catalog;
pub mod error;
pub mod locales;
pub mod logging;
pub mod prompt;
pub mod providers;
pub mod settings;
mod translator;

pub use batcher::{PromptBatch, PromptBatcher, PromptBatcherConfig};
pub use catalog::{Catalog, KeyPath, LocalizationNode, StringUnit, UnitState};
pub use error::{CatalogError, TranslateError};
pub use locales::{LocaleSample, LocaleSupport, LocaleTable};
pub use providers::{ChatProvider, Message, MessageRole, OpenAI, ProviderFuture};
pub use translator::{
    commit_translations, parse_translation_content, Progress, TranslationResult, Translator,
    TranslatorConfig, LINE_PREFIX,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub api_key: Option<String>,
    pub source_locale: String,
    pub target_locale: String,
    pub model: Option<String>,
    pub batch_size: Option<usize>,
    pub retry_limit: Option<usize>,
    pub override_input: bool,
    pub output: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub model: String,
    pub translated: usize,
}

pub async fn run(config: Config) -> Result<RunSummary> {
    let settings = settings::load_settings(config.settings_path.as_deref())?;

    let source_locale = config.source_locale.trim();
    if source_locale.is_empty() {
        return Err(anyhow!("source locale is empty"));
    }
    let target_locale = config.target_locale.trim();
    if target_locale.is_empty() {
        return Err(anyhow!("target locale is empty"));
    }
    let model = config
        .model
        .as_deref()
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(&settings.model)
        .to_string();
    let batch_size = config.batch_size.unwrap_or(settings.batch_size);
    if batch_size == 0 {
        return Err(anyhow!("batch size must be at least 1"));
    }
    let retry_limit = config.retry_limit.unwrap_or(settings.retry_limit);
    if retry_limit == 0 {
        return Err(anyhow!("retry limit must be at least 1"));
    }
    if !config.input.is_file() {
        return Err(anyhow!("file not found: {}", config.input.display()));
    }
    let key = providers::resolve_key(config.api_key.as_deref())?;

    let output = output_path(
        &config.input,
        config.output.as_deref(),
        config.override_input,
    );
    let translator = Translator::new(
        OpenAI::new(key),
        settings.locale_table(),
        TranslatorConfig::new(model.clone(), source_locale, target_locale, batch_size)
            .with_retry_limit(retry_limit),
    );
    let translated = translate_file(&translator, &config.input, &output).await?;

    Ok(RunSummary {
        output,
        model,
        translated,
    })
}

/// Loads `input`, translates it, and writes the updated catalog to `output`.
/// Nothing is written unless every batch succeeds. Returns the number of
/// strings translated.
pub async fn translate_file<P, L>(
    translator: &Translator<P, L>,
    input: &Path,
    output: &Path,
) -> Result<usize>
where
    P: ChatProvider,
    L: LocaleSupport,
{
    let mut catalog = Catalog::from_path(input)
        .with_context(|| format!("failed to load catalog {}", input.display()))?;

    let results = translator
        .translate(&catalog, |progress| {
            info!("translated {}/{} strings", progress.handled, progress.total)
        })
        .await
        .with_context(|| "translation failed; catalog left unchanged")?;

    commit_translations(&mut catalog, &results)
        .with_context(|| "failed to apply translations")?;
    catalog.write_to_path(output)?;
    Ok(results.len())
}

/// `--override` writes back over the input; otherwise `--output`, falling back
/// to the input path with a `.translated.xcstrings` extension.
pub fn output_path(input: &Path, output: Option<&Path>, override_input: bool) -> PathBuf {
    if override_input {
        return input.to_path_buf();
    }
    match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("translated.xcstrings"),
    }
}
