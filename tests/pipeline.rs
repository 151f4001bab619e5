//! End-to-end pipeline behaviour with in-process collaborators.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tldw::audio::{discover_segments, segment_file_name, TranscodeOutcome, Transcoder};
use tldw::audio_source::{AudioFormat, AudioStream, ResolvedSource, SourceResolver};
use tldw::backend::{Credential, StaticBackend};
use tldw::config::Settings;
use tldw::metadata::{MetadataRegistrar, SqliteRecordStore, Table};
use tldw::orchestrator::{Components, Orchestrator};
use tldw::pipeline::upload_segments;
use tldw::storage::{MemoryObjectStore, Namespace, ObjectEntry, ObjectStore};
use tldw::summary::{Summarizer, SummaryStatus};
use tldw::transcription::Recognizer;
use tldw::{Result, TldwError};
use tokio_test::{assert_err, assert_ok};

// === Fakes ===

struct FakeResolver {
    video_id: String,
}

#[async_trait]
impl SourceResolver for FakeResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedSource> {
        if url.contains("missing") {
            return Err(TldwError::SourceResolution(format!("{} unavailable", url)));
        }
        Ok(ResolvedSource {
            video_id: self.video_id.clone(),
            title: Some("Test video".to_string()),
            format: AudioFormat {
                format_id: "251".to_string(),
                acodec: Some("opus".to_string()),
                ..AudioFormat::default()
            },
        })
    }

    async fn stream_audio(&self, _format: &AudioFormat) -> Result<AudioStream> {
        let chunks: Vec<Result<Vec<u8>>> = vec![Ok(vec![0u8; 512]), Ok(vec![1u8; 512])];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Writes one segment file per entry of `segments`; `None` leaves a gap.
struct FakeTranscoder {
    segments: Vec<Option<&'static str>>,
    success: bool,
}

impl FakeTranscoder {
    fn writing(texts: &[&'static str]) -> Self {
        Self {
            segments: texts.iter().map(|t| Some(*t)).collect(),
            success: true,
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, mut input: AudioStream, output_dir: &Path) -> Result<TranscodeOutcome> {
        let started = Instant::now();
        tokio::fs::create_dir_all(output_dir).await?;

        let mut bytes_piped = 0u64;
        while let Some(chunk) = input.next().await {
            bytes_piped += chunk?.len() as u64;
        }

        for (index, text) in self.segments.iter().enumerate() {
            if let Some(text) = text {
                tokio::fs::write(output_dir.join(segment_file_name(index, "mp3")), text).await?;
            }
        }

        Ok(TranscodeOutcome {
            exit_code: Some(if self.success { 0 } else { 1 }),
            success: self.success,
            bytes_piped,
            elapsed: started.elapsed(),
        })
    }

    fn extension(&self) -> &str {
        "mp3"
    }
}

/// Returns the segment bytes as text and counts calls.
#[derive(Default)]
struct EchoRecognizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Recognizer for EchoRecognizer {
    async fn transcribe(&self, audio: Vec<u8>, _file_name: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        String::from_utf8(audio).map_err(|e| TldwError::Recognition(e.to_string()))
    }
}

/// Records every chunk it is asked to summarize.
#[derive(Default)]
struct RecordingSummarizer {
    chunks: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl RecordingSummarizer {
    fn calls(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, chunk: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut chunks = self.chunks.lock().unwrap();
        chunks.push(chunk.to_string());
        Ok(format!("key points #{}", chunks.len()))
    }
}

/// Memory store that counts upload calls.
#[derive(Default)]
struct CountingStore {
    inner: MemoryObjectStore,
    uploads: AtomicUsize,
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn upload(&self, namespace: Namespace, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(namespace, key, bytes).await
    }

    async fn download(&self, namespace: Namespace, key: &str) -> Result<Vec<u8>> {
        self.inner.download(namespace, key).await
    }

    async fn list(&self, namespace: Namespace, prefix: &str) -> Result<Vec<ObjectEntry>> {
        self.inner.list(namespace, prefix).await
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<()> {
        self.inner.delete(namespace, key).await
    }
}

// === Harness ===

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<MemoryObjectStore>,
    records: Arc<SqliteRecordStore>,
    recognizer: Arc<EchoRecognizer>,
    summarizer: Arc<RecordingSummarizer>,
    work_dir: tempfile::TempDir,
}

fn harness(transcoder: FakeTranscoder) -> Harness {
    harness_with(transcoder, RecordingSummarizer::default(), |_| {})
}

fn harness_with(
    transcoder: FakeTranscoder,
    summarizer: RecordingSummarizer,
    configure: impl FnOnce(&mut Settings),
) -> Harness {
    let work_dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.general.work_dir = work_dir.path().to_string_lossy().into_owned();
    configure(&mut settings);

    let store = Arc::new(MemoryObjectStore::new());
    let records = Arc::new(SqliteRecordStore::in_memory().unwrap());
    let recognizer = Arc::new(EchoRecognizer::default());
    let summarizer = Arc::new(summarizer);

    let orchestrator = Orchestrator::with_components(
        &settings,
        Components {
            resolver: Arc::new(FakeResolver {
                video_id: "abc123".to_string(),
            }),
            transcoder: Arc::new(transcoder),
            backend: Arc::new(StaticBackend::new(store.clone(), records.clone())),
            recognizer: recognizer.clone(),
            summarizer: summarizer.clone(),
        },
    )
    .unwrap();

    Harness {
        orchestrator,
        store,
        records,
        recognizer,
        summarizer,
        work_dir,
    }
}

fn credential() -> Credential {
    Credential::new("test-token")
}

// === Properties ===

#[tokio::test]
async fn end_to_end_ingest_transcribe_summarize() {
    let h = harness(FakeTranscoder::writing(&["hello ", "world"]));

    let ack = h
        .orchestrator
        .ingest("https://youtu.be/abc123", credential(), "u1", "u1@example.com");
    assert_eq!(ack.message, "done");

    let report = assert_ok!(ack.task.await.unwrap());
    assert_eq!(report.video_id, "abc123");
    assert_eq!(report.segments_found, 2);
    assert_eq!(report.upload.uploaded, 2);
    assert_eq!(report.upload.deleted, 2);
    assert_eq!(report.transcode.bytes_piped, 1024);
    assert!(h.store.contains(Namespace::Chunks, "chunks/abc123/output000.mp3"));
    assert!(h.store.contains(Namespace::Chunks, "chunks/abc123/output001.mp3"));
    assert!(!h.work_dir.path().join("chunks/abc123/output000.mp3").exists());

    let transcribed = assert_ok!(h.orchestrator.transcribe("abc123", &credential()).await);
    assert_eq!(transcribed.transcript, "hello \nworld\n");
    assert_eq!(
        h.store.download(Namespace::Transcriptions, "abc123.txt").await.unwrap(),
        b"hello \nworld\n"
    );
    assert_eq!(transcribed.chunks_deleted, 2);
    assert_eq!(h.store.count(Namespace::Chunks), 0);

    let summarized = assert_ok!(h.orchestrator.summarize("abc123", &credential()).await);
    assert_eq!(summarized.status, SummaryStatus::Done);
    assert_eq!(summarized.summary, "key points #1\n");
    assert_eq!(h.summarizer.calls(), 1);
    assert_eq!(h.summarizer.chunks.lock().unwrap()[0], "hello \nworld\n");
    assert!(h.store.contains(Namespace::Summaries, "abc123.txt"));
}

#[tokio::test]
async fn cached_summary_skips_all_external_calls() {
    let h = harness(FakeTranscoder::writing(&["a"]));
    h.store
        .upload(Namespace::Transcriptions, "abc123.txt", b"a\n".to_vec())
        .await
        .unwrap();

    let first = assert_ok!(h.orchestrator.summarize("abc123", &credential()).await);
    let recognizer_calls = h.recognizer.calls.load(Ordering::SeqCst);
    let summarizer_calls = h.summarizer.calls();

    let second = assert_ok!(h.orchestrator.summarize("abc123", &credential()).await);
    let third = assert_ok!(h.orchestrator.summarize("abc123", &credential()).await);

    assert_eq!(second.status, SummaryStatus::Cached);
    assert_eq!(second.summary, first.summary);
    assert_eq!(third.summary, first.summary);
    assert_eq!(h.recognizer.calls.load(Ordering::SeqCst), recognizer_calls);
    assert_eq!(h.summarizer.calls(), summarizer_calls);
}

#[tokio::test]
async fn transcript_follows_segment_order() {
    let h = harness(FakeTranscoder::writing(&["a", "b", "c"]));

    let ack = h.orchestrator.ingest("https://youtu.be/abc123", credential(), "u1", "e");
    assert_ok!(ack.task.await.unwrap());

    let outcome = assert_ok!(h.orchestrator.transcribe("abc123", &credential()).await);
    assert_eq!(outcome.transcript, "a\nb\nc\n");
}

#[tokio::test]
async fn discovery_stops_at_first_gap() {
    let h = harness(FakeTranscoder {
        segments: vec![Some("0"), Some("1"), Some("2"), Some("3"), Some("4"), None, Some("6")],
        success: true,
    });

    let ack = h.orchestrator.ingest("https://youtu.be/abc123", credential(), "u1", "e");
    let report = assert_ok!(ack.task.await.unwrap());

    assert_eq!(report.segments_found, 5);
    assert_eq!(h.store.count(Namespace::Chunks), 5);
    assert!(!h.store.contains(Namespace::Chunks, "chunks/abc123/output006.mp3"));
}

#[tokio::test]
async fn failed_transcoder_still_collects_partial_output() {
    let h = harness(FakeTranscoder {
        segments: vec![Some("partial")],
        success: false,
    });

    let ack = h.orchestrator.ingest("https://youtu.be/abc123", credential(), "u1", "e");
    let report = assert_ok!(ack.task.await.unwrap());

    assert!(!report.transcode.success);
    assert_eq!(report.segments_found, 1);
    assert_eq!(report.upload.uploaded, 1);
}

#[tokio::test]
async fn unresolvable_source_fails_the_background_task() {
    let h = harness(FakeTranscoder::writing(&["never"]));

    let ack = h.orchestrator.ingest("https://youtu.be/missing", credential(), "u1", "e");
    assert_eq!(ack.message, "done");

    let err = assert_err!(ack.task.await.unwrap());
    assert!(matches!(err, TldwError::SourceResolution(_)));
    assert_eq!(h.store.count(Namespace::Chunks), 0);
    assert_eq!(h.records.count(Table::Videos).unwrap(), 0);
}

#[tokio::test]
async fn upload_fan_out_issues_one_upload_per_segment() {
    for n in [0usize, 1, 3, 8] {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..n {
            std::fs::write(dir.path().join(segment_file_name(i, "mp3")), [i as u8]).unwrap();
        }
        let segments = discover_segments(dir.path(), "vid", "mp3", 1000);
        let store = CountingStore::default();

        let report = upload_segments(&store, &segments, Some(2), None).await;

        assert_eq!(store.uploads.load(Ordering::SeqCst), n);
        assert_eq!(report.attempted, n);
        assert!(report.deleted <= n);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

#[tokio::test]
async fn repeated_ingest_registers_once() {
    let h = harness(FakeTranscoder::writing(&["a"]));

    for _ in 0..2 {
        let ack = h.orchestrator.ingest("https://youtu.be/abc123", credential(), "u1", "u1@example.com");
        assert_ok!(ack.task.await.unwrap());
    }

    assert_eq!(h.records.count(Table::Users).unwrap(), 1);
    assert_eq!(h.records.count(Table::Videos).unwrap(), 1);
    assert_eq!(h.records.count(Table::UserVideos).unwrap(), 1);
}

#[tokio::test]
async fn registrar_second_call_inserts_nothing() {
    let records = Arc::new(SqliteRecordStore::in_memory().unwrap());
    let registrar = MetadataRegistrar::new(records.clone());

    let first = assert_ok!(registrar.register("u1", "u1@example.com", "abc123").await);
    let second = assert_ok!(registrar.register("u1", "u1@example.com", "abc123").await);

    assert!(first.user_created && first.video_created && first.association_created);
    assert!(!second.created_any());
    assert_eq!(records.count(Table::UserVideos).unwrap(), 1);
}

#[tokio::test]
async fn summarize_without_transcript_is_an_error() {
    let h = harness(FakeTranscoder::writing(&[]));

    let err = assert_err!(h.orchestrator.summarize("abc123", &credential()).await);
    assert!(matches!(err, TldwError::TranscriptMissing(_)));
    assert_eq!(h.summarizer.calls(), 0);
}

#[tokio::test]
async fn long_transcript_is_summarized_in_order() {
    let h = harness(FakeTranscoder::writing(&[]));
    let transcript: String = (0..3000).map(|i| format!("word{:04} ", i)).collect();
    h.store
        .upload(Namespace::Transcriptions, "abc123.txt", transcript.into_bytes())
        .await
        .unwrap();

    let outcome = assert_ok!(h.orchestrator.summarize("abc123", &credential()).await);

    assert_eq!(h.summarizer.calls(), 3);
    assert_eq!(outcome.summary, "key points #1\nkey points #2\nkey points #3\n");
    assert!(h.summarizer.chunks.lock().unwrap()[0].starts_with("word0000"));
}

#[tokio::test]
async fn summarizer_timeout_is_reported() {
    let h = harness_with(
        FakeTranscoder::writing(&[]),
        RecordingSummarizer {
            delay: Some(Duration::from_secs(30)),
            ..RecordingSummarizer::default()
        },
        |settings| settings.timeouts.summarizer_secs = Some(1),
    );
    h.store
        .upload(Namespace::Transcriptions, "abc123.txt", b"slow".to_vec())
        .await
        .unwrap();

    let err = assert_err!(h.orchestrator.summarize("abc123", &credential()).await);
    assert!(matches!(err, TldwError::Timeout { seconds: 1, .. }));
    assert!(!h.store.contains(Namespace::Summaries, "abc123.txt"));
}

#[tokio::test]
async fn http_api_round_trip() {
    let h = harness(FakeTranscoder::writing(&["hello ", "world"]));
    let app = tldw::cli::commands::router(h.orchestrator.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let missing = client
        .post(format!("{}/api/summarize", base))
        .json(&serde_json::json!({ "videoId": "abc123", "token": "t" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let ack: serde_json::Value = client
        .post(format!("{}/api/video", base))
        .json(&serde_json::json!({
            "video": "https://youtu.be/abc123",
            "token": "t",
            "userId": "u1",
            "userEmail": "u1@example.com",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ack["message"], "done");
    assert!(ack["jobId"].is_string());

    // The ingest runs in the background; wait for its segments to land.
    for _ in 0..100 {
        if h.records.count(Table::UserVideos).unwrap() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let transcribed: serde_json::Value = client
        .post(format!("{}/api/transcribe", base))
        .json(&serde_json::json!({ "videoId": "abc123", "token": "t" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(transcribed["transcript"], "hello \nworld\n");

    let summarized: serde_json::Value = client
        .post(format!("{}/api/summarize", base))
        .json(&serde_json::json!({ "videoId": "abc123", "token": "t" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summarized["message"], "done");

    let cached: serde_json::Value = client
        .post(format!("{}/api/summarize", base))
        .json(&serde_json::json!({ "videoId": "abc123", "token": "t" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cached["message"], "summary already exists");
    assert_eq!(cached["summary"], summarized["summary"]);
}
