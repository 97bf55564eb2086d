//! End-to-end workflow scenarios over the full pipeline with deterministic
//! mock model backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use fabrag_backend::core::config::Settings;
use fabrag_backend::core::errors::RagError;
use fabrag_backend::embedding::Embedder;
use fabrag_backend::index::VectorIndex;
use fabrag_backend::ingest::{Chunker, Document, IngestService};
use fabrag_backend::llm::{GenerateRequest, LlmProvider};
use fabrag_backend::service::{AgentService, QueryRequest};
use fabrag_backend::workflow::WorkflowPath;

const DIM: usize = 256;
const MODEL: &str = "mock-embedder";

/// Deterministic bag-of-words embedder: every token lands in a hash
/// bucket, the vector is L2-normalized. Shared vocabulary means shared
/// direction, which is all the similarity structure these tests need.
struct HashingEmbedder {
    failures: AtomicUsize,
}

impl HashingEmbedder {
    fn new() -> Self {
        Self {
            failures: AtomicUsize::new(0),
        }
    }

    fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for b in token.bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        MODEL
    }

    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RagError::Embedding("mock backend down".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }
}

/// Scripted chat provider: per-model failure counts, plus an optional
/// sleep to exercise the timeout path.
struct ScriptedLlm {
    primary_failures: AtomicUsize,
    fallback_failures: AtomicUsize,
    sleep_primary: Option<Duration>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn healthy() -> Self {
        Self::with_failures(0, 0)
    }

    fn with_failures(primary: usize, fallback: usize) -> Self {
        Self {
            primary_failures: AtomicUsize::new(primary),
            fallback_failures: AtomicUsize::new(fallback),
            sleep_primary: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    fn set_failures(&self, primary: usize, fallback: usize) {
        self.primary_failures.store(primary, Ordering::SeqCst);
        self.fallback_failures.store(fallback, Ordering::SeqCst);
    }

    fn hanging_primary(sleep: Duration) -> Self {
        Self {
            primary_failures: AtomicUsize::new(0),
            fallback_failures: AtomicUsize::new(0),
            sleep_primary: Some(sleep),
            asked: Mutex::new(Vec::new()),
        }
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        model_id: &str,
    ) -> Result<String, RagError> {
        self.asked.lock().unwrap().push(model_id.to_string());

        let counter = if model_id == "primary" {
            &self.primary_failures
        } else {
            &self.fallback_failures
        };
        let remaining = counter.load(Ordering::SeqCst);
        if remaining > 0 {
            counter.store(remaining - 1, Ordering::SeqCst);
            return Err(RagError::LlmProvider(format!("{} unavailable", model_id)));
        }

        if model_id == "primary" {
            if let Some(sleep) = self.sleep_primary {
                tokio::time::sleep(sleep).await;
            }
        }

        // Echo enough of the prompt to assert on context plumbing.
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("[{}] answer to: {}", model_id, last_user))
    }
}

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.chunking.chunk_size = 50;
    settings.chunking.chunk_overlap = 10;
    settings.embedding.model_id = MODEL.to_string();
    settings.embedding.dimension = DIM;
    settings.retrieval.top_k = 3;
    settings.retrieval.score_threshold = 0.05;
    settings.memory.max_turns = 10;
    settings.llm.primary_model = "primary".to_string();
    settings.llm.fallback_model = "fallback".to_string();
    settings.llm.timeout_secs = 5;
    settings
}

struct Harness {
    embedder: Arc<HashingEmbedder>,
    llm: Arc<ScriptedLlm>,
    service: AgentService,
}

async fn harness_with(llm: ScriptedLlm, documents: &[(&str, &str)]) -> Harness {
    let settings = test_settings();
    let embedder = Arc::new(HashingEmbedder::new());
    let llm = Arc::new(llm);
    let index = Arc::new(VectorIndex::new(DIM, MODEL, settings.index.clone()));

    let chunker = Chunker::from_settings(&settings.chunking).unwrap();
    let ingest = IngestService::new(
        chunker,
        embedder.clone(),
        index.clone(),
        &settings.embedding,
    );
    for (uri, text) in documents {
        let document = Document::new(*uri, *text, vec!["VirtualFab".to_string()]);
        ingest.ingest(&document).await.unwrap();
    }

    let service = AgentService::new(settings, embedder.clone(), index, llm.clone()).unwrap();
    Harness {
        embedder,
        llm,
        service,
    }
}

fn fab_corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "docs/etching.txt",
            "Etching is step 4 of 8 in semiconductor fabrication.",
        ),
        (
            "docs/litho.txt",
            "Lithography projects circuit patterns onto wafers using ultraviolet light.",
        ),
        (
            "docs/cmp.txt",
            "Chemical mechanical planarization flattens each deposited layer.",
        ),
    ]
}

fn query(question: &str) -> QueryRequest {
    QueryRequest {
        session_id: "s1".to_string(),
        question: question.to_string(),
        top_k: Some(3),
        score_threshold: None,
        tag_filter: None,
    }
}

#[tokio::test]
async fn domain_question_retrieves_the_etching_chunk() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(!response.degraded);
    assert_eq!(response.path, WorkflowPath::Retrieved);
    assert!(!response.sources.is_empty());
    // The single-chunk etching document is the best hit.
    assert!(response.sources[0].text.contains("Etching is step 4 of 8"));
    for pair in response.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // The retrieved context reached the model prompt.
    assert!(response.answer.contains("Etching is step 4 of 8"));
    assert_eq!(h.llm.asked(), ["primary"]);
}

#[tokio::test]
async fn small_talk_takes_the_direct_path() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    let response = h.service.answer(query("hello")).await.unwrap();

    assert!(!response.degraded);
    assert_eq!(response.path, WorkflowPath::Direct);
    assert!(response.sources.is_empty());
    // Exchange is committed to memory.
    assert_eq!(h.service.memory().turn_count("s1"), 2);
}

#[tokio::test]
async fn empty_index_answers_without_context_not_error() {
    let h = harness_with(ScriptedLlm::healthy(), &[]).await;

    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(!response.degraded);
    assert_eq!(response.path, WorkflowPath::Retrieved);
    assert!(response.sources.is_empty());
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn double_primary_failure_falls_back_to_secondary() {
    let h = harness_with(ScriptedLlm::with_failures(2, 0), &fab_corpus()).await;

    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(!response.degraded);
    assert!(response.answer.starts_with("[fallback]"));
    assert_eq!(h.llm.asked(), ["primary", "primary", "fallback"]);
    // A successful fallback still commits memory.
    assert_eq!(h.service.memory().turn_count("s1"), 2);
}

#[tokio::test]
async fn exhausted_retries_degrade_and_leave_memory_untouched() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    // Seed one exchange so there is memory that must not change.
    let seeded = h.service.answer(query("hello")).await.unwrap();
    assert!(!seeded.degraded);
    let turns_before = h.service.memory().turn_count("s1");
    assert_eq!(turns_before, 2);

    // Primary fails twice, the single fallback attempt fails too.
    h.llm.set_failures(2, 1);
    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(response.degraded);
    assert!(response.sources.is_empty());
    assert!(!response.answer.is_empty());
    // Degraded responses never mutate conversation memory.
    assert_eq!(h.service.memory().turn_count("s1"), turns_before);
    // Fallback was attempted exactly once for the failing request.
    let fallback_calls = h
        .llm
        .asked()
        .iter()
        .filter(|m| m.as_str() == "fallback")
        .count();
    assert_eq!(fallback_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_primary_times_out_and_falls_back() {
    let h = harness_with(
        ScriptedLlm::hanging_primary(Duration::from_secs(60)),
        &fab_corpus(),
    )
    .await;

    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(!response.degraded);
    assert!(response.answer.starts_with("[fallback]"));
    assert_eq!(h.llm.asked(), ["primary", "primary", "fallback"]);
}

#[tokio::test]
async fn embedder_outage_on_query_is_retried_once() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    h.embedder.fail_next(1);
    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(!response.degraded);
    assert!(!response.sources.is_empty());
}

#[tokio::test]
async fn persistent_embedder_outage_degrades() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    h.embedder.fail_next(10);
    let response = h.service.answer(query("what is etching")).await.unwrap();

    assert!(response.degraded);
    assert_eq!(h.service.memory().turn_count("s1"), 0);
}

#[tokio::test]
async fn conversation_memory_carries_across_turns() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    h.service.answer(query("hello")).await.unwrap();
    h.service.answer(query("what is etching")).await.unwrap();

    let turns = h.service.memory().get("s1");
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].content, "hello");
    assert_eq!(turns[2].content, "what is etching");

    h.service.clear_session("s1");
    assert_eq!(h.service.memory().turn_count("s1"), 0);
}

#[tokio::test]
async fn sessions_do_not_share_memory() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    h.service.answer(query("hello")).await.unwrap();
    let mut other = query("hello");
    other.session_id = "s2".to_string();
    h.service.answer(other).await.unwrap();

    assert_eq!(h.service.memory().turn_count("s1"), 2);
    assert_eq!(h.service.memory().turn_count("s2"), 2);
}

#[tokio::test]
async fn invalid_overrides_are_rejected_up_front() {
    let h = harness_with(ScriptedLlm::healthy(), &fab_corpus()).await;

    let mut bad_k = query("what is etching");
    bad_k.top_k = Some(0);
    assert!(matches!(
        h.service.answer(bad_k).await,
        Err(RagError::Configuration(_))
    ));

    let mut bad_threshold = query("what is etching");
    bad_threshold.score_threshold = Some(2.0);
    assert!(matches!(
        h.service.answer(bad_threshold).await,
        Err(RagError::Configuration(_))
    ));

    // Nothing reached the pipeline.
    assert!(h.llm.asked().is_empty());
}

#[tokio::test]
async fn tag_filter_limits_sources() {
    let settings = test_settings();
    let embedder = Arc::new(HashingEmbedder::new());
    let llm = Arc::new(ScriptedLlm::healthy());
    let index = Arc::new(VectorIndex::new(DIM, MODEL, settings.index.clone()));
    let chunker = Chunker::from_settings(&settings.chunking).unwrap();
    let ingest = IngestService::new(
        chunker,
        embedder.clone(),
        index.clone(),
        &settings.embedding,
    );

    let tagged = Document::new(
        "docs/etching.txt",
        "Etching is step 4 of 8 in semiconductor fabrication.",
        vec!["Etch".to_string()],
    );
    let other = Document::new(
        "docs/litho.txt",
        "Etching chemistry also matters during lithography rework.",
        vec!["Litho".to_string()],
    );
    ingest.ingest(&tagged).await.unwrap();
    ingest.ingest(&other).await.unwrap();

    let service = AgentService::new(settings, embedder, index, llm).unwrap();

    let mut request = query("what is etching");
    request.tag_filter = Some("Etch".to_string());
    let response = service.answer(request).await.unwrap();

    assert!(!response.sources.is_empty());
    for source in &response.sources {
        assert!(source.tags.iter().any(|t| t == "Etch"));
    }
}
