use tera::{Context, Tera};

use crate::locales::LocaleSupport;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system_prompt.tera");
const GENERIC_PROMPT_TEMPLATE: &str = include_str!("prompts/generic_prompt.tera");

/// Builds the system prompt for `target_locale`. Locales without a record get
/// a generic instruction naming the raw code with a Japanese example.
pub fn render_system_prompt(
    target_locale: &str,
    locales: &impl LocaleSupport,
) -> Result<String, tera::Error> {
    let mut context = Context::new();
    let template = match locales.lookup(target_locale) {
        Some(record) => {
            context.insert("language_name", &record.language);
            context.insert("sample_translation", record.sample.trim());
            SYSTEM_PROMPT_TEMPLATE
        }
        None => {
            context.insert("target_locale", target_locale);
            GENERIC_PROMPT_TEMPLATE
        }
    };
    let rendered = Tera::one_off(template, &context, false)?;
    Ok(rendered.trim_end().to_string())
}
