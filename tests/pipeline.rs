use std::path::Path;

use cite_core::{App, Config};
use cite_llm::mock::MockProvider;
use cite_rag::{Document, RagError, REFUSAL};

const WORDS: [&str; 5] = ["paris", "lyon", "capital", "city", "france"];

fn keyword_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    WORDS
        .iter()
        .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
        .collect()
}

fn config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_path_buf();
    config.retry.max_retries = 0;
    config
}

fn france() -> Vec<Document> {
    vec![
        Document::new("paris.txt", "Paris is the capital of France."),
        Document::new("lyon.txt", "Lyon is a city in France."),
    ]
}

#[tokio::test]
async fn paris_lyon_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::with_responses(vec!["Paris is the capital of France [0].".into()])
        .with_embedder(keyword_embedding);
    let app = App::build(config(dir.path()), mock.clone()).unwrap();

    let report = app.pipeline.ingest(france()).await.unwrap();
    assert_eq!(report.passages, 2);

    let answer = app
        .engine
        .ask("What is the capital of France?", Some(1))
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].passage.text, "Paris is the capital of France.");
    assert_eq!(answer.sources[0].passage.source, "paris.txt");
    assert!(answer.text.contains("[0]"));
    assert!(answer.citations.is_clean());

    let prompts = mock.recorded_messages();
    let prompt = &prompts[0][0].content;
    assert!(prompt.contains("[0] Paris is the capital of France."));
    assert!(!prompt.contains("Lyon"));
}

#[tokio::test]
async fn empty_corpus_refuses_without_generation() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::default();
    let app = App::build(config(dir.path()), mock.clone()).unwrap();
    app.pipeline.ingest(Vec::new()).await.unwrap();

    let answer = app.engine.ask("Anything?", None).await.unwrap();
    assert!(answer.sources.is_empty());
    assert_eq!(answer.text, REFUSAL);
    assert_eq!(mock.chat_calls(), 0);
}

#[tokio::test]
async fn truncated_corpus_is_refused_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::default().with_embedder(keyword_embedding);
    let app = App::build(config(dir.path()), mock.clone()).unwrap();
    let report = app.pipeline.ingest(france()).await.unwrap();

    let corpus_path = dir
        .path()
        .join("generations")
        .join(&report.generation)
        .join("corpus.json");
    let mut records: Vec<serde_json::Value> =
        serde_json::from_slice(&std::fs::read(&corpus_path).unwrap()).unwrap();
    records.pop();
    std::fs::write(&corpus_path, serde_json::to_vec(&records).unwrap()).unwrap();

    let restarted = App::build(config(dir.path()), mock).unwrap();
    let err = restarted
        .engine
        .ask("What is the capital of France?", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RagError::CorpusIndexMismatch {
            index: 2,
            corpus: 1
        }
    ));
}

#[tokio::test]
async fn failed_reingestion_keeps_serving_previous_generation() {
    let dir = tempfile::tempdir().unwrap();
    let good = MockProvider::default().with_embedder(keyword_embedding);
    let app = App::build(config(dir.path()), good.clone()).unwrap();
    let first = app.pipeline.ingest(france()).await.unwrap();

    let mut broken = MockProvider::default().with_embedder(keyword_embedding);
    broken.fail_embed_after = Some(1);
    let failing = App::build(config(dir.path()), broken).unwrap();
    let err = failing.pipeline.ingest(france()).await.unwrap_err();
    assert!(matches!(err, RagError::ServiceUnavailable(_)));

    assert_eq!(failing.handle.generation(), Some(first.generation.clone()));
    let restarted = App::build(config(dir.path()), good).unwrap();
    assert_eq!(restarted.status().generation, Some(first.generation));
    assert_eq!(restarted.status().passages, 2);
    let answer = restarted
        .engine
        .ask("Which city is in France?", Some(2))
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test]
async fn reingesting_files_is_deterministic() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(
        docs.path().join("france.md"),
        "Paris is the capital of France. ".repeat(40),
    )
    .unwrap();
    std::fs::write(docs.path().join("notes.txt"), "Lyon is a city in France.").unwrap();

    let data = tempfile::tempdir().unwrap();
    let app = App::build(config(data.path()), MockProvider::default()).unwrap();
    let loaders = app.loaders();
    let paths = [docs.path().to_path_buf()];

    app.pipeline.load_and_ingest(&paths, &loaders).await.unwrap();
    let first: Vec<String> = app
        .handle
        .snapshot()
        .unwrap()
        .corpus
        .iter()
        .map(|p| p.text.clone())
        .collect();

    app.pipeline.load_and_ingest(&paths, &loaders).await.unwrap();
    let second: Vec<String> = app
        .handle
        .snapshot()
        .unwrap()
        .corpus
        .iter()
        .map(|p| p.text.clone())
        .collect();

    assert!(first.len() > 2);
    assert_eq!(first, second);
}
