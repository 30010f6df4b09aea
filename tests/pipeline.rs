mod common;

use common::{ContextOnlyGenerator, KeywordEmbedder};
use pdfrag::{
    answer, ingest, retrieve, ChunkConfig, IngestReport, MemoryStore, VectorStore,
    FALLBACK_ANSWER,
};
use pretty_assertions::assert_eq;

const VOCABULARY: &[&str] = &[
    "revenue", "2023", "million", "reais", "customers", "2024", "capital", "france",
    "headquarters", "lisbon",
];

fn ingested_store(dir: &std::path::Path) -> (KeywordEmbedder, MemoryStore) {
    let path = common::write_pdf(
        dir,
        "company.pdf",
        &[
            "Revenue in 2023 was 10 million reais.",
            "The company headquarters is located in Lisbon.",
        ],
    );
    let embedder = KeywordEmbedder::new(VOCABULARY);
    let mut store = MemoryStore::new();
    let report = ingest(&path, &ChunkConfig::default(), &embedder, &mut store).expect("ingest");
    assert_eq!(
        report,
        IngestReport {
            pages: 2,
            chunks: 2,
            removed: 0
        }
    );
    (embedder, store)
}

#[test]
fn answers_from_document_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (embedder, store) = ingested_store(dir.path());

    let reply = answer(
        "What was the revenue?",
        &embedder,
        &store,
        10,
        &ContextOnlyGenerator,
    )
    .expect("answer");
    assert!(reply.contains("10 million reais"), "{reply}");
    assert!(!reply.contains(FALLBACK_ANSWER));
}

#[test]
fn absent_data_gets_the_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (embedder, store) = ingested_store(dir.path());

    let reply = answer(
        "How many customers do we have in 2024?",
        &embedder,
        &store,
        10,
        &ContextOnlyGenerator,
    )
    .expect("answer");
    assert_eq!(reply, FALLBACK_ANSWER);
}

#[test]
fn general_knowledge_gets_the_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (embedder, store) = ingested_store(dir.path());

    let reply = answer(
        "What is the capital of France?",
        &embedder,
        &store,
        10,
        &ContextOnlyGenerator,
    )
    .expect("answer");
    assert_eq!(reply, FALLBACK_ANSWER);
}

#[test]
fn closest_chunk_ranks_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (embedder, store) = ingested_store(dir.path());

    let results = retrieve("Where are the headquarters?", &embedder, &store, 2).expect("retrieve");
    assert_eq!(results.len(), 2);
    assert!(results[0].entry.document.contains("Lisbon"));
    assert!(results[0].score <= results[1].score);
    assert_eq!(results[0].entry.metadata["page"], 1);
}

#[test]
fn reingesting_replaces_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (embedder, mut store) = ingested_store(dir.path());
    let path = dir.path().join("company.pdf");

    ingest(&path, &ChunkConfig::default(), &embedder, &mut store).expect("second ingest");
    assert_eq!(store.count().expect("count"), 2);
}

#[test]
fn shorter_document_replaces_the_old_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (embedder, mut store) = ingested_store(dir.path());
    let path = common::write_pdf(
        dir.path(),
        "company.pdf",
        &["Revenue in 2023 was 12 million reais."],
    );

    let report = ingest(&path, &ChunkConfig::default(), &embedder, &mut store).expect("reingest");
    assert_eq!(
        report,
        IngestReport {
            pages: 1,
            chunks: 1,
            removed: 1
        }
    );
    assert_eq!(store.count().expect("count"), 1);

    let reply = answer(
        "Where are the headquarters?",
        &embedder,
        &store,
        10,
        &ContextOnlyGenerator,
    )
    .expect("answer");
    assert_eq!(reply, FALLBACK_ANSWER);
}

#[test]
fn empty_store_still_answers_with_fallback() {
    let embedder = KeywordEmbedder::new(VOCABULARY);
    let store = MemoryStore::new();

    let results = retrieve("What was the revenue?", &embedder, &store, 10).expect("retrieve");
    assert!(results.is_empty());
    let reply = answer(
        "What was the revenue?",
        &embedder,
        &store,
        10,
        &ContextOnlyGenerator,
    )
    .expect("answer");
    assert_eq!(reply, FALLBACK_ANSWER);
}
