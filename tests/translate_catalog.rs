use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use xcstrings_llm::prompt::render_system_prompt;
use xcstrings_llm::{
    translate_file, Catalog, ChatProvider, KeyPath, LocaleTable, Message, ProviderFuture,
    TranslateError, Translator, TranslatorConfig,
};

type CallLog = Arc<Mutex<Vec<Vec<Message>>>>;

struct ScriptedProvider {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: CallLog,
}

impl ChatProvider for ScriptedProvider {
    fn complete<'a>(&'a self, _model: &'a str, messages: &'a [Message]) -> ProviderFuture<'a> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let reply = self.replies.lock().unwrap().pop_front().flatten();
        Box::pin(async move { reply })
    }
}

fn translator(
    replies: &[Option<&str>],
    retry_limit: usize,
) -> (Translator<ScriptedProvider, LocaleTable>, CallLog) {
    let calls = CallLog::default();
    let provider = ScriptedProvider {
        replies: Mutex::new(
            replies
                .iter()
                .map(|reply| reply.map(str::to_string))
                .collect(),
        ),
        calls: Arc::clone(&calls),
    };
    let translator = Translator::new(
        provider,
        LocaleTable::embedded(),
        TranslatorConfig::new("gpt-test", "en", "ja", 1000).with_retry_limit(retry_limit),
    );
    (translator, calls)
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Localizable.xcstrings")
}

const FULL_REPLY: &str = "```\n- タイトル\n- Macで開く\n- iPhoneで開く\n- 完了\n```";

#[tokio::test]
async fn translates_a_catalog_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Localizable.xcstrings");
    fs::copy(fixture(), &input).unwrap();
    let original = fs::read(&input).unwrap();
    let output = dir.path().join("Localizable.translated.xcstrings");

    let (translator, calls) = translator(&[Some(FULL_REPLY)], 3);
    let translated = translate_file(&translator, &input, &output).await.unwrap();
    assert_eq!(translated, 4);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0][0].content.contains("'Japanese'"));
    assert_eq!(
        calls[0][1].content,
        "- Title\n- Open on Mac\n- Open on iPhone\n- Done"
    );

    assert_eq!(fs::read(&input).unwrap(), original);

    let catalog = Catalog::from_path(&output).unwrap();
    for (keypath, value) in [
        (KeyPath::new("Title", "ja"), "タイトル"),
        (KeyPath::new("Done", "ja"), "完了"),
        (KeyPath::with_device("Open in %@", "ja", "mac"), "Macで開く"),
        (KeyPath::with_device("Open in %@", "ja", "iphone"), "iPhoneで開く"),
        (KeyPath::new("Cancel", "ja"), "キャンセル"),
    ] {
        assert_eq!(catalog.get(&keypath).unwrap(), Some(value), "{}", keypath);
    }

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"extractionState\": \"manual\""));
    assert!(written.contains("\"comment\": \"Menu item that opens the document\""));
    assert!(written.contains("\"state\": \"needs_review\""));

    let keys = catalog.entries().keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(keys, ["Cancel", "Done", "Open in %@", "Title"]);
}

#[tokio::test]
async fn translated_output_has_nothing_left_to_translate() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.xcstrings");
    let (first, _) = translator(&[Some(FULL_REPLY)], 3);
    translate_file(&first, &fixture(), &output).await.unwrap();

    let (second, calls) = translator(&[], 3);
    let rerun = dir.path().join("rerun.xcstrings");
    assert_eq!(translate_file(&second, &output, &rerun).await.unwrap(), 0);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(
        Catalog::from_path(&rerun).unwrap(),
        Catalog::from_path(&output).unwrap()
    );
}

#[tokio::test]
async fn malformed_replies_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.xcstrings");
    let (translator, calls) = translator(
        &[None, Some("- タイトル\n- 完了"), Some(FULL_REPLY)],
        3,
    );
    assert_eq!(
        translate_file(&translator, &fixture(), &output).await.unwrap(),
        4
    );
    assert_eq!(calls.lock().unwrap().len(), 3);
    let catalog = Catalog::from_path(&output).unwrap();
    assert_eq!(
        catalog.get(&KeyPath::new("Title", "ja")).unwrap(),
        Some("タイトル")
    );
}

#[tokio::test]
async fn exhausted_retries_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Localizable.xcstrings");
    fs::copy(fixture(), &input).unwrap();
    let original = fs::read(&input).unwrap();

    let (translator, calls) = translator(&[Some("- タイトル"), None], 2);
    let err = translate_file(&translator, &input, &input).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TranslateError>(),
        Some(TranslateError::Exhausted {
            attempts: 2,
            keys: 4
        })
    ));
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(fs::read(&input).unwrap(), original);
}

#[tokio::test]
async fn small_budgets_split_the_work_into_batches() {
    let catalog = Catalog::from_path(&fixture()).unwrap();
    let limit = render_system_prompt("ja", &LocaleTable::empty())
        .unwrap()
        .chars()
        .count()
        + 20;
    let calls = CallLog::default();
    let translator = Translator::new(
        ScriptedProvider {
            replies: Mutex::new(
                ["- タイトル\n- Macで開く", "- iPhoneで開く\n- 完了"]
                    .into_iter()
                    .map(|reply| Some(reply.to_string()))
                    .collect(),
            ),
            calls: Arc::clone(&calls),
        },
        LocaleTable::empty(),
        TranslatorConfig::new("gpt-test", "en", "ja", limit),
    );

    let mut seen = Vec::new();
    let results = translator
        .translate(&catalog, |progress| seen.push((progress.handled, progress.total)))
        .await
        .unwrap();

    assert_eq!(seen, [(2, 4), (4, 4)]);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0][1].content, "- Title\n- Open on Mac");
    assert_eq!(calls[1][1].content, "- Open on iPhone\n- Done");
    assert!(calls[0][0].content.contains("locale code 'ja'"));

    let pairs = results
        .iter()
        .map(|result| (result.target_keypath.to_string(), result.translation.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        [
            ("'Title' [ja]".to_string(), "タイトル"),
            ("'Open in %@' [ja/mac]".to_string(), "Macで開く"),
            ("'Open in %@' [ja/iphone]".to_string(), "iPhoneで開く"),
            ("'Done' [ja]".to_string(), "完了"),
        ]
    );
    assert!(results
        .iter()
        .all(|result| catalog.get(&result.source_keypath).unwrap().is_some()));
}
