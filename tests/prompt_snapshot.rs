use xcstrings_llm::prompt::render_system_prompt;
use xcstrings_llm::LocaleTable;

#[test]
fn system_prompt_snapshot() {
    let prompt = render_system_prompt("ja", &LocaleTable::embedded()).unwrap();
    insta::assert_snapshot!(prompt);
}

#[test]
fn generic_prompt_snapshot() {
    let prompt = render_system_prompt("x-klingon", &LocaleTable::embedded()).unwrap();
    insta::assert_snapshot!("generic_system_prompt", prompt);
}
