//! End-to-end retrieval scenarios across backends.

use semsearch::bench::synthetic_corpus;
use semsearch::{
    Backend, KnowledgeBase, KnowledgeChunk, RetrieverConfig, SemanticRetriever, SharedKnowledgeBase,
};

fn uniform_kb(n: usize, embedding: &[f32]) -> SharedKnowledgeBase {
    let mut kb = KnowledgeBase::new("Test KB").with_description("Test knowledge base");
    for i in 0..n {
        kb.add_chunk(
            KnowledgeChunk::new(format!("Test content {}", i), "test_source.txt")
                .with_embedding(embedding.to_vec()),
        )
        .unwrap();
    }
    kb.into_shared()
}

fn accelerated_config() -> RetrieverConfig {
    RetrieverConfig::default()
        .with_pool_workers(3)
        .with_rayon_threads(2)
}

#[test]
fn identical_embeddings_score_one() {
    let retriever = SemanticRetriever::new(uniform_kb(5, &[0.1; 10]));

    let outcome = retriever
        .semantic_search(&[0.1; 10], 3, 0.5, None)
        .unwrap();

    assert_eq!(outcome.len(), 3);
    for result in &outcome.results {
        assert!((result.score - 1.0).abs() < 1e-5, "score {}", result.score);
    }
    assert!(outcome.elapsed_ms >= 0.0);
}

#[test]
fn empty_corpus_returns_nothing_on_default_backend() {
    let retriever = SemanticRetriever::with_config(
        KnowledgeBase::new("empty").into_shared(),
        accelerated_config(),
    );

    let (results, backend, elapsed_ms) = retriever
        .semantic_search(&[0.3, 0.4], 3, 0.0, None)
        .unwrap()
        .into_parts();

    assert!(results.is_empty());
    assert_eq!(backend, Backend::Cpu);
    assert!(elapsed_ms >= 0.0);
}

#[test]
fn unembedded_corpus_never_invokes_a_backend() {
    let mut kb = KnowledgeBase::new("pending");
    for i in 0..4 {
        kb.add_chunk(KnowledgeChunk::new(format!("chunk {}", i), "doc.md")).unwrap();
    }
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    let outcome = retriever.semantic_search(&[1.0, 0.0], 3, 0.0, Some("pool")).unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.backend, Backend::Cpu);
    let metrics = retriever.metrics();
    assert_eq!(metrics.empty_searches(), 1);
    assert!(metrics.searches_by_backend().is_empty());
    assert!(!retriever.is_cached());
}

#[test]
fn explicit_cpu_preference_beats_available_accelerator() {
    let retriever = SemanticRetriever::with_config(uniform_kb(5, &[0.1; 10]), accelerated_config());
    assert!(retriever.selector().is_available(Backend::Pool));

    let outcome = retriever.semantic_search(&[0.1; 10], 3, 0.0, Some("numpy")).unwrap();
    assert_eq!(outcome.backend, Backend::Cpu);

    let outcome = retriever.semantic_search(&[0.1; 10], 3, 0.0, None).unwrap();
    assert_eq!(outcome.backend, Backend::Pool);
}

#[test]
fn unembedded_chunks_are_excluded() {
    let mut kb = KnowledgeBase::new("mixed");
    kb.add_chunk(KnowledgeChunk::new("no vector", "a.md")).unwrap();
    kb.add_chunk(KnowledgeChunk::new("opposite", "b.md").with_embedding(vec![-1.0, 0.0])).unwrap();
    let retriever = SemanticRetriever::new(kb.into_shared());

    let outcome = retriever.semantic_search(&[1.0, 0.0], 5, -1.0, None).unwrap();
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome.results[0].content, "opposite");
    assert_eq!(outcome.results[0].score, -1.0);
}

#[test]
fn ties_keep_insertion_order() {
    let mut kb = KnowledgeBase::new("ties");
    let rows = [
        ("first", vec![1.0, 1.0]),
        ("best", vec![1.0, 0.0]),
        ("second", vec![2.0, 2.0]),
        ("third", vec![0.5, 0.5]),
    ];
    for (content, embedding) in rows {
        kb.add_chunk(KnowledgeChunk::new(content, "ties.md").with_embedding(embedding)).unwrap();
    }
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    for backend in ["cpu", "rayon", "pool"] {
        let outcome = retriever.semantic_search(&[1.0, 0.0], 10, 0.0, Some(backend)).unwrap();
        let order: Vec<&str> = outcome.results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, ["best", "first", "second", "third"], "backend {}", backend);
    }
}

#[test]
fn repeated_searches_are_identical() {
    let (kb, query) = synthetic_corpus(300, 24, 11).unwrap();
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    let first = retriever.semantic_search(&query, 10, 0.0, Some("rayon")).unwrap();
    for _ in 0..5 {
        let again = retriever.semantic_search(&query, 10, 0.0, Some("rayon")).unwrap();
        assert_eq!(again.results, first.results);
        assert_eq!(again.backend, Backend::Rayon);
    }
    assert_eq!(retriever.metrics().cache_rebuilds(), 1);
}

#[test]
fn backends_agree_on_ranking_and_scores() {
    let (kb, query) = synthetic_corpus(2000, 64, 3).unwrap();
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    let cpu = retriever.semantic_search(&query, 25, -1.0, Some("cpu")).unwrap();
    assert_eq!(cpu.backend, Backend::Cpu);

    for name in ["rayon", "pool"] {
        let other = retriever.semantic_search(&query, 25, -1.0, Some(name)).unwrap();
        assert_eq!(other.backend.as_str(), name);
        assert_eq!(other.len(), cpu.len());
        for (a, b) in cpu.results.iter().zip(&other.results) {
            assert_eq!(a.content, b.content);
            assert!((a.score - b.score).abs() <= 1e-4 * a.score.abs().max(1e-6));
        }
    }
}

#[test]
fn pool_shutdown_falls_back_transparently() {
    let kb = uniform_kb(8, &[0.2, 0.4, 0.4]);
    let retriever = SemanticRetriever::with_config(kb, accelerated_config());
    retriever.selector().pool().unwrap().shutdown();

    let outcome = retriever.semantic_search(&[0.2, 0.4, 0.4], 3, 0.0, Some("pool")).unwrap();
    assert_eq!(outcome.len(), 3);
    assert_eq!(outcome.backend, Backend::Rayon);
}

#[test]
fn fewer_candidates_than_top_k() {
    let retriever = SemanticRetriever::new(uniform_kb(2, &[0.5, 0.5]));
    let outcome = retriever.semantic_search(&[0.5, 0.5], 10, 0.0, None).unwrap();
    assert_eq!(outcome.len(), 2);
}

#[test]
fn concurrent_searches_share_one_matrix() {
    let (kb, query) = synthetic_corpus(500, 32, 5).unwrap();
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10 {
                    let outcome = retriever.semantic_search(&query, 5, -1.0, None).unwrap();
                    assert_eq!(outcome.len(), 5);
                }
            });
        }
    });

    assert_eq!(retriever.metrics().total_searches(), 40);
    assert_eq!(retriever.metrics().cache_rebuilds(), 1);
}

#[test]
fn zero_norm_rows_and_queries_score_zero_on_every_backend() {
    let mut kb = KnowledgeBase::new("zeros");
    let rows = [
        ("x axis", vec![1.0, 0.0]),
        ("origin", vec![0.0, 0.0]),
        ("y axis", vec![0.0, 1.0]),
    ];
    for (content, embedding) in rows {
        kb.add_chunk(KnowledgeChunk::new(content, "zeros.md").with_embedding(embedding)).unwrap();
    }
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    let cpu = retriever.semantic_search(&[1.0, 0.0], 10, -1.0, Some("cpu")).unwrap();
    let cpu_zero = retriever.semantic_search(&[0.0, 0.0], 10, -1.0, Some("cpu")).unwrap();

    for backend in ["cpu", "rayon", "pool"] {
        let outcome = retriever.semantic_search(&[1.0, 0.0], 10, -1.0, Some(backend)).unwrap();
        assert_eq!(outcome.backend.as_str(), backend);
        let origin = outcome.results.iter().find(|r| r.content == "origin").unwrap();
        assert_eq!(origin.score, 0.0, "backend {}", backend);
        assert_eq!(outcome.results, cpu.results, "backend {}", backend);

        let zero_query = retriever.semantic_search(&[0.0, 0.0], 10, -1.0, Some(backend)).unwrap();
        assert_eq!(zero_query.len(), 3);
        assert!(zero_query.results.iter().all(|r| r.score == 0.0), "backend {}", backend);
        let order: Vec<&str> = zero_query.results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(order, ["x axis", "origin", "y axis"]);
        assert_eq!(zero_query.results, cpu_zero.results);
    }
}

#[test]
fn extreme_magnitude_embeddings_find_themselves() {
    let large = vec![2e19f32; 4];
    let tiny = vec![1e-23f32, 1e-23, -1e-23, -1e-23];

    let mut kb = KnowledgeBase::new("extremes");
    kb.add_chunk(KnowledgeChunk::new("large", "big.md").with_embedding(large.clone())).unwrap();
    kb.add_chunk(KnowledgeChunk::new("tiny", "small.md").with_embedding(tiny.clone())).unwrap();
    let retriever = SemanticRetriever::with_config(kb.into_shared(), accelerated_config());

    for backend in ["cpu", "rayon", "pool"] {
        for (query, content) in [(&large, "large"), (&tiny, "tiny")] {
            let outcome = retriever.semantic_search(query, 3, 0.5, Some(backend)).unwrap();
            assert_eq!(outcome.len(), 1, "backend {} query {}", backend, content);
            assert_eq!(outcome.results[0].content, content);
            assert!((outcome.results[0].score - 1.0).abs() < 1e-6);
        }
    }
}
