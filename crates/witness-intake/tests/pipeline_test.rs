//! # Intake pipeline integration tests
//!
//! Drives [`IntakePipeline`] end to end over an in-memory content store and
//! ledger, wrapped in fault-injecting fakes, and checks ordering, retry,
//! ambiguity handling, and staging cleanup for every terminal outcome.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use witness_core::{
    CommittedRecord, ContentId, Record, RegistryId, SubmissionFields, SubmissionToken,
    ValidationError,
};
use witness_intake::{
    CommitDisposition, IntakeError, IntakeOutcome, IntakePipeline, PipelineConfig, RetryPolicy,
    Stage, StagingArea, SubmitReport,
};
use witness_registry::{MemoryLedger, RegistryClient, RegistryError};
use witness_store::{ContentStore, MemoryContentStore, StoreError};

// ── Fakes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    Healthy,
    FailTimes(u32),
    AlwaysUnavailable,
    Corrupt,
}

#[derive(Debug)]
struct FaultyStore {
    inner: MemoryContentStore,
    mode: Mutex<StoreMode>,
    puts: AtomicU32,
}

impl FaultyStore {
    fn new(mode: StoreMode) -> Self {
        Self {
            inner: MemoryContentStore::new(),
            mode: Mutex::new(mode),
            puts: AtomicU32::new(0),
        }
    }

    fn puts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for FaultyStore {
    async fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let failure = {
            let mut mode = self.mode.lock().unwrap();
            match *mode {
                StoreMode::Healthy => None,
                StoreMode::FailTimes(0) => None,
                StoreMode::FailTimes(n) => {
                    *mode = StoreMode::FailTimes(n - 1);
                    Some(StoreError::unavailable("injected transient failure"))
                }
                StoreMode::AlwaysUnavailable => Some(StoreError::unavailable("node down")),
                StoreMode::Corrupt => Some(StoreError::Corrupt {
                    expected: ContentId::digest(bytes),
                    actual: ContentId::digest(b"garbage"),
                }),
            }
        };
        match failure {
            Some(e) => Err(e),
            None => self.inner.put(bytes).await,
        }
    }

    async fn get(&self, id: &ContentId) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(id).await
    }

    async fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        self.inner.contains(id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerMode {
    Healthy,
    TimeoutAfterLanding,
    TimeoutWithoutLanding,
    Reject,
    Unreachable,
    Hang,
    SlowLanding,
    TimeoutWithBrokenLookup,
}

#[derive(Debug)]
struct ScriptedLedger {
    inner: MemoryLedger,
    mode: Mutex<LedgerMode>,
    commits: AtomicU32,
    lookups: AtomicU32,
}

impl ScriptedLedger {
    fn new(mode: LedgerMode) -> Self {
        Self {
            inner: MemoryLedger::new(),
            mode: Mutex::new(mode),
            commits: AtomicU32::new(0),
            lookups: AtomicU32::new(0),
        }
    }

    fn set_mode(&self, mode: LedgerMode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn commits(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for ScriptedLedger {
    async fn commit(&self, record: &Record) -> Result<RegistryId, RegistryError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        match mode {
            LedgerMode::Healthy => self.inner.commit(record).await,
            LedgerMode::TimeoutAfterLanding => {
                self.inner.commit(record).await?;
                Err(RegistryError::SubmissionTimedOut {
                    tx_hash: Some("0xfeed".into()),
                    detail: "confirmation deadline passed".into(),
                })
            }
            LedgerMode::TimeoutWithoutLanding | LedgerMode::TimeoutWithBrokenLookup => {
                Err(RegistryError::SubmissionTimedOut {
                    tx_hash: None,
                    detail: "connection reset".into(),
                })
            }
            LedgerMode::Reject => Err(RegistryError::SubmissionRejected {
                reason: "execution reverted".into(),
            }),
            LedgerMode::Unreachable => Err(RegistryError::unavailable("connection refused")),
            LedgerMode::Hang => std::future::pending().await,
            LedgerMode::SlowLanding => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                self.inner.commit(record).await
            }
        }
    }

    async fn fetch(&self, id: RegistryId) -> Result<CommittedRecord, RegistryError> {
        self.inner.fetch(id).await
    }

    async fn find_by_token(
        &self,
        token: &SubmissionToken,
    ) -> Result<Option<RegistryId>, RegistryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if *self.mode.lock().unwrap() == LedgerMode::TimeoutWithBrokenLookup {
            return Err(RegistryError::Protocol {
                endpoint: "find_by_token".into(),
                detail: "malformed answer".into(),
            });
        }
        self.inner.find_by_token(token).await
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    _tmp: TempDir,
    staging: StagingArea,
    store: Arc<FaultyStore>,
    ledger: Arc<ScriptedLedger>,
    pipeline: IntakePipeline,
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        store_timeout: Duration::from_secs(2),
        store_retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        commit_timeout: Duration::from_millis(200),
        lookup_timeout: Duration::from_millis(200),
        lookup_retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
    }
}

fn harness(store_mode: StoreMode, ledger_mode: LedgerMode) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let staging = StagingArea::new(tmp.path().join("staging"));
    std::fs::create_dir_all(staging.dir()).unwrap();
    let store = Arc::new(FaultyStore::new(store_mode));
    let ledger = Arc::new(ScriptedLedger::new(ledger_mode));
    let pipeline = IntakePipeline::new(store.clone(), ledger.clone(), fast_config());
    Harness {
        _tmp: tmp,
        staging,
        store,
        ledger,
        pipeline,
    }
}

fn scenario_fields() -> SubmissionFields {
    SubmissionFields {
        category: Some("theft".into()),
        subcategory: Some("bicycle".into()),
        occurred_date: Some("2024-01-05".into()),
        occurred_time: Some("14:30".into()),
        reporter_name: Some("A. Citizen".into()),
        nearest_facility: Some("Central Station".into()),
        reporter_address: Some("12 Main St".into()),
    }
}

const DOCUMENT: &[u8] = b"%PDF-1.7 photo of the stolen bicycle";
const IDENTITY: &[u8] = b"identity card scan";

impl Harness {
    async fn request(&self, key: Option<&str>) -> SubmitReport {
        self.request_with(scenario_fields(), DOCUMENT, IDENTITY, key).await
    }

    async fn request_with(
        &self,
        fields: SubmissionFields,
        document: &[u8],
        identity: &[u8],
        key: Option<&str>,
    ) -> SubmitReport {
        SubmitReport {
            fields,
            document: Some(self.staging.stage_bytes(document).await.unwrap()),
            identity: Some(self.staging.stage_bytes(identity).await.unwrap()),
            idempotency_key: key.map(str::to_string),
        }
    }

    fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging.dir()).unwrap().next().is_none()
    }
}

// ── Success path ─────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_submission_commits_and_reads_back() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let outcome = h.pipeline.submit(h.request(None).await).await;

    let IntakeOutcome::Succeeded(receipt) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(receipt.disposition, CommitDisposition::Committed);
    assert_eq!(receipt.document_content_id, ContentId::digest(DOCUMENT));
    assert_eq!(receipt.identity_content_id, ContentId::digest(IDENTITY));

    let committed = h.pipeline.get_report(receipt.registry_id).await.unwrap();
    let m = &committed.record.metadata;
    assert_eq!(m.category, "theft");
    assert_eq!(m.subcategory, "bicycle");
    assert_eq!(m.occurred_date, "2024-01-05");
    assert_eq!(m.occurred_time, "14:30");
    assert_eq!(m.reporter_name, "A. Citizen");
    assert_eq!(m.nearest_facility, "Central Station");
    assert_eq!(m.reporter_address, "12 Main St");
    assert_eq!(committed.record.document_content_id, receipt.document_content_id);
    assert_eq!(committed.record.identity_content_id, receipt.identity_content_id);
    assert_eq!(committed.record.submission_token, receipt.submission_token);
}

#[tokio::test]
async fn success_implies_content_is_retrievable() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let IntakeOutcome::Succeeded(receipt) = h.pipeline.submit(h.request(None).await).await else {
        panic!("expected success");
    };
    let committed = h.pipeline.get_report(receipt.registry_id).await.unwrap();
    for id in committed.record.content_ids() {
        assert!(h.store.get(&id).await.unwrap().is_some());
    }
    assert_eq!(
        h.store.get(&receipt.document_content_id).await.unwrap().unwrap(),
        DOCUMENT
    );
}

#[tokio::test]
async fn get_report_is_idempotent() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let IntakeOutcome::Succeeded(receipt) = h.pipeline.submit(h.request(None).await).await else {
        panic!("expected success");
    };
    let first = h.pipeline.get_report(receipt.registry_id).await.unwrap();
    let second = h.pipeline.get_report(receipt.registry_id).await.unwrap();
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn independent_resubmission_reuses_content_ids_with_new_registry_id() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let IntakeOutcome::Succeeded(a) = h.pipeline.submit(h.request(None).await).await else {
        panic!("expected success");
    };
    let IntakeOutcome::Succeeded(b) = h.pipeline.submit(h.request(None).await).await else {
        panic!("expected success");
    };
    assert_eq!(a.document_content_id, b.document_content_id);
    assert_eq!(a.identity_content_id, b.identity_content_id);
    assert_ne!(a.registry_id, b.registry_id);
    assert_ne!(a.submission_token, b.submission_token);
}

#[tokio::test]
async fn get_missing_report_is_not_found() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    assert!(matches!(
        h.pipeline.get_report(RegistryId(404)).await,
        Err(RegistryError::NotFound(RegistryId(404)))
    ));
}

// ── Validation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_identity_fails_before_any_store_call() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let request = SubmitReport {
        fields: scenario_fields(),
        document: Some(h.staging.stage_bytes(DOCUMENT).await.unwrap()),
        identity: None,
        idempotency_key: None,
    };
    let outcome = h.pipeline.submit(request).await;

    let IntakeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.stage, Stage::Validating);
    assert!(matches!(
        failure.error,
        IntakeError::InvalidRequest(ValidationError::EmptyFields(ref parts)) if parts == &vec!["identityDocument"]
    ));
    assert_eq!(h.store.puts(), 0);
    assert_eq!(h.ledger.commits(), 0);
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn blank_fields_are_all_named() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let mut fields = scenario_fields();
    fields.category = Some(" ".into());
    fields.nearest_facility = None;
    let outcome = h
        .pipeline
        .submit(h.request_with(fields, DOCUMENT, IDENTITY, None).await)
        .await;
    let IntakeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    let message = failure.error.to_string();
    assert!(message.contains("category"));
    assert!(message.contains("nearestFacility"));
    assert!(!failure.error.retry_safe());
    assert_eq!(h.store.puts(), 0);
}

// ── Storage failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn transient_store_failures_are_retried() {
    let h = harness(StoreMode::FailTimes(2), LedgerMode::Healthy);
    let outcome = h.pipeline.submit(h.request(None).await).await;
    assert!(matches!(outcome, IntakeOutcome::Succeeded(_)), "{outcome:?}");
    assert_eq!(h.store.puts(), 4);
    assert_eq!(h.ledger.commits(), 1);
}

#[tokio::test]
async fn permanent_store_failure_never_commits() {
    let h = harness(StoreMode::AlwaysUnavailable, LedgerMode::Healthy);
    let outcome = h.pipeline.submit(h.request(None).await).await;

    let IntakeOutcome::Failed(failure) = &outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.stage, Stage::Storing);
    assert!(!failure.content_stored);
    assert!(!outcome.may_have_landed());
    assert!(outcome.retry_safe());
    assert!(matches!(
        failure.error,
        IntakeError::StorageFailure { attempts: 4, .. }
    ));
    assert_eq!(h.ledger.commits(), 0);
    assert!(h.ledger.inner.is_empty());
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn corrupt_store_error_is_not_retried() {
    let h = harness(StoreMode::Corrupt, LedgerMode::Healthy);
    let outcome = h.pipeline.submit(h.request(None).await).await;
    let IntakeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert!(matches!(
        failure.error,
        IntakeError::StorageFailure { attempts: 1, .. }
    ));
    assert!(!failure.error.retry_safe());
    assert!(h.store.puts() <= 2);
    assert_eq!(h.ledger.commits(), 0);
}

// ── Commit failures and ambiguity ────────────────────────────────────────

#[tokio::test]
async fn timeout_with_nothing_landed_is_ambiguous() {
    let h = harness(StoreMode::Healthy, LedgerMode::TimeoutWithoutLanding);
    let outcome = h.pipeline.submit(h.request(None).await).await;

    let IntakeOutcome::Ambiguous(ambiguous) = &outcome else {
        panic!("expected ambiguous, got {outcome:?}");
    };
    assert_eq!(ambiguous.document_content_id, ContentId::digest(DOCUMENT));
    assert_eq!(ambiguous.identity_content_id, ContentId::digest(IDENTITY));
    assert!(outcome.may_have_landed());
    assert_eq!(h.ledger.commits(), 1, "ambiguous commits are never resubmitted");
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn permanent_lookup_error_stops_disambiguation() {
    let h = harness(StoreMode::Healthy, LedgerMode::TimeoutWithBrokenLookup);
    let outcome = h.pipeline.submit(h.request(None).await).await;
    assert!(matches!(outcome, IntakeOutcome::Ambiguous(_)), "{outcome:?}");
    assert_eq!(h.ledger.lookups(), 1);
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn timeout_that_landed_is_recovered_with_one_entry() {
    let h = harness(StoreMode::Healthy, LedgerMode::TimeoutAfterLanding);
    let outcome = h.pipeline.submit(h.request(None).await).await;

    let IntakeOutcome::Succeeded(receipt) = outcome else {
        panic!("expected recovered success, got {outcome:?}");
    };
    assert_eq!(receipt.disposition, CommitDisposition::Recovered);
    assert_eq!(h.ledger.commits(), 1);
    assert_eq!(h.ledger.inner.len(), 1);
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn hung_commit_times_out_into_ambiguity() {
    let h = harness(StoreMode::Healthy, LedgerMode::Hang);
    let outcome = h.pipeline.submit(h.request(None).await).await;
    let IntakeOutcome::Ambiguous(ambiguous) = outcome else {
        panic!("expected ambiguous, got {outcome:?}");
    };
    assert!(ambiguous.detail.contains("commit exceeded"));
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn commit_finishes_after_caller_goes_away() {
    let h = harness(StoreMode::Healthy, LedgerMode::SlowLanding);
    let request = h.request(None).await;
    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), h.pipeline.submit(request)).await;
    assert!(abandoned.is_err(), "caller should give up before the commit lands");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.ledger.commits(), 1);
    assert_eq!(h.ledger.inner.len(), 1);
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn rejection_is_terminal() {
    let h = harness(StoreMode::Healthy, LedgerMode::Reject);
    let outcome = h.pipeline.submit(h.request(None).await).await;
    let IntakeOutcome::Failed(failure) = &outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.stage, Stage::Committing);
    assert!(failure.content_stored);
    assert!(matches!(failure.error, IntakeError::SubmissionRejected { .. }));
    assert!(!outcome.retry_safe());
    assert_eq!(h.ledger.commits(), 1);
    assert!(h.staging_is_empty());
}

#[tokio::test]
async fn unreachable_registry_fails_retry_safe() {
    let h = harness(StoreMode::Healthy, LedgerMode::Unreachable);
    let outcome = h.pipeline.submit(h.request(None).await).await;
    let IntakeOutcome::Failed(failure) = &outcome else {
        panic!("expected failure");
    };
    assert!(matches!(failure.error, IntakeError::RegistryUnavailable { .. }));
    assert!(!outcome.may_have_landed());
    assert!(outcome.retry_safe());
}

#[tokio::test]
async fn ambiguous_then_retry_with_same_key_replays() {
    let h = harness(StoreMode::Healthy, LedgerMode::TimeoutWithoutLanding);
    let first = h.pipeline.submit(h.request(Some("client-key-1")).await).await;
    assert!(matches!(first, IntakeOutcome::Ambiguous(_)));

    // The retry lands; a third attempt must replay rather than append.
    h.ledger.set_mode(LedgerMode::Healthy);
    let second = h.pipeline.submit(h.request(Some("client-key-1")).await).await;
    let IntakeOutcome::Succeeded(committed) = second else {
        panic!("expected success");
    };
    assert_eq!(committed.disposition, CommitDisposition::Committed);

    let third = h.pipeline.submit(h.request(Some("client-key-1")).await).await;
    let IntakeOutcome::Succeeded(replayed) = third else {
        panic!("expected replay");
    };
    assert_eq!(replayed.disposition, CommitDisposition::Replayed);
    assert_eq!(replayed.registry_id, committed.registry_id);
    assert_eq!(h.ledger.inner.len(), 1);
    assert_eq!(h.ledger.commits(), 2);
}

#[tokio::test]
async fn reused_key_with_different_content_conflicts() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let first = h.pipeline.submit(h.request(Some("shared-key")).await).await;
    assert!(matches!(first, IntakeOutcome::Succeeded(_)));

    let other = h
        .pipeline
        .submit(
            h.request_with(scenario_fields(), b"another document", IDENTITY, Some("shared-key"))
                .await,
        )
        .await;
    let IntakeOutcome::Failed(failure) = other else {
        panic!("expected conflict");
    };
    assert!(matches!(failure.error, IntakeError::IdempotencyConflict { .. }));
    assert!(!failure.error.retry_safe());
    assert_eq!(h.ledger.inner.len(), 1);
}

#[tokio::test]
async fn find_report_resolves_token() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let IntakeOutcome::Succeeded(receipt) = h.pipeline.submit(h.request(None).await).await else {
        panic!("expected success");
    };
    let found = h
        .pipeline
        .find_report(&receipt.submission_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.registry_id, receipt.registry_id);

    let unknown = SubmissionToken::from_key("never-used").unwrap();
    assert!(h.pipeline.find_report(&unknown).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_ids() {
    let h = harness(StoreMode::Healthy, LedgerMode::Healthy);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let pipeline = h.pipeline.clone();
        let request = h.request(None).await;
        handles.push(tokio::spawn(async move { pipeline.submit(request).await }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            IntakeOutcome::Succeeded(receipt) => ids.push(receipt.registry_id),
            other => panic!("expected success, got {other:?}"),
        }
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert!(h.staging_is_empty());
}
