//! # Intake Pipeline
//!
//! Drives one submission through `Validating → Storing → Committing →
//! CleaningUp` and into a terminal [`IntakeOutcome`].
//!
//! ## Ordering
//!
//! Both attachments are stored, concurrently, before the registry is
//! touched. A record is only built from the content ids those stores
//! returned, so a committed record never references missing content.
//!
//! ## Ambiguous commits
//!
//! A commit that times out is never resubmitted. The pipeline polls the
//! registry for the submission token instead: found and identical means the
//! commit landed; otherwise the outcome stays [`IntakeOutcome::Ambiguous`].
//!
//! ## Cancellation
//!
//! Dropping the `submit` future before the commit starts releases the
//! staged files through their drop guards. The commit phase runs on its own
//! task which owns the staged files, so once started it always reaches a
//! terminal state and cleans up even if the caller goes away.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout;
use tracing::Instrument;
use witness_core::{CommittedRecord, ContentId, Record, RegistryId, SubmissionToken};
use witness_registry::{RegistryClient, RegistryError};
use witness_store::{ContentStore, StoreError};

use crate::config::PipelineConfig;
use crate::outcome::{
    AmbiguousCommit, CommitDisposition, IntakeError, IntakeFailure, IntakeOutcome, Stage,
    SubmissionReceipt,
};
use crate::request::{SubmitReport, ValidatedSubmission, DOCUMENT_PART, IDENTITY_PART};
use crate::staging::StagedUpload;
use crate::telemetry;

/// A validated submission whose attachments are durably stored.
struct StoredSubmission {
    record: Record,
    caller_supplied_token: bool,
    uploads: [StagedUpload; 2],
}

/// Orchestrates report intake over a content store and a registry.
#[derive(Debug, Clone)]
pub struct IntakePipeline {
    store: Arc<dyn ContentStore>,
    registry: Arc<dyn RegistryClient>,
    config: Arc<PipelineConfig>,
}

impl IntakePipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        registry: Arc<dyn RegistryClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one submission to a terminal outcome.
    pub async fn submit(&self, request: SubmitReport) -> IntakeOutcome {
        let started = Instant::now();
        let validated = match request.validate() {
            Ok(validated) => validated,
            Err(e) => {
                tracing::info!(error = %e, "submission rejected during validation");
                let outcome = IntakeOutcome::Failed(IntakeFailure {
                    stage: Stage::Validating,
                    content_stored: false,
                    may_have_landed: false,
                    submission_token: None,
                    error: e.into(),
                });
                telemetry::record_outcome(&outcome, started);
                return outcome;
            }
        };

        let span = tracing::info_span!("intake", token = %validated.token);
        let outcome = self.run(validated).instrument(span).await;
        telemetry::record_outcome(&outcome, started);
        outcome
    }

    async fn run(&self, validated: ValidatedSubmission) -> IntakeOutcome {
        tracing::debug!(stage = %Stage::Storing, "storing attachments");
        let token = validated.token.clone();
        let stored = match self.store_attachments(validated).await {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(stage = %Stage::Storing, %error, "attachment storage failed");
                return IntakeOutcome::Failed(IntakeFailure {
                    stage: Stage::Storing,
                    content_stored: false,
                    may_have_landed: false,
                    submission_token: Some(token),
                    error,
                });
            }
        };

        let [document_content_id, identity_content_id] = stored.record.content_ids();
        tracing::info!(
            stage = %Stage::Committing,
            document = %document_content_id,
            identity = %identity_content_id,
            "attachments stored, committing record"
        );

        let committer = Committer {
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
        };
        let task = tokio::spawn(committer.run(stored).in_current_span());
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "commit task terminated abnormally");
                IntakeOutcome::Ambiguous(AmbiguousCommit {
                    submission_token: token,
                    document_content_id,
                    identity_content_id,
                    tx_hash: None,
                    detail: format!("commit task terminated: {e}"),
                })
            }
        }
    }

    async fn store_attachments(
        &self,
        validated: ValidatedSubmission,
    ) -> Result<StoredSubmission, IntakeError> {
        let ValidatedSubmission {
            metadata,
            document,
            identity,
            token,
            caller_supplied_token,
        } = validated;

        let (document_id, identity_id) = tokio::try_join!(
            self.put_with_retry(DOCUMENT_PART, &document),
            self.put_with_retry(IDENTITY_PART, &identity),
        )?;

        Ok(StoredSubmission {
            record: Record::new(metadata, document_id, identity_id, token),
            caller_supplied_token,
            uploads: [document, identity],
        })
    }

    async fn put_with_retry(
        &self,
        part: &'static str,
        upload: &StagedUpload,
    ) -> Result<ContentId, IntakeError> {
        let bytes = upload.read().await.map_err(|e| IntakeError::Staging {
            part,
            reason: e.to_string(),
        })?;
        let policy = self.config.store_retry;

        let mut attempt = 0;
        loop {
            let result = match timeout(self.config.store_timeout, self.store.put(&bytes)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::unavailable(format!(
                    "put timed out after {:?}",
                    self.config.store_timeout
                ))),
            };

            match result {
                Ok(id) => {
                    tracing::debug!(part, content_id = %id, size = bytes.len(), "attachment stored");
                    return Ok(id);
                }
                Err(e) if e.is_transient() && attempt < policy.max_retries => {
                    let delay = policy.delay(attempt);
                    telemetry::record_store_retry(part);
                    tracing::warn!(
                        part,
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        "store put failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(IntakeError::StorageFailure {
                        part,
                        attempts: attempt + 1,
                        source,
                    });
                }
            }
        }
    }

    /// Read a committed report.
    pub async fn get_report(&self, id: RegistryId) -> Result<CommittedRecord, RegistryError> {
        self.registry.fetch(id).await
    }

    /// Resolve a submission token to its committed report, if any.
    pub async fn find_report(
        &self,
        token: &SubmissionToken,
    ) -> Result<Option<CommittedRecord>, RegistryError> {
        match self.registry.find_by_token(token).await? {
            Some(id) => self.registry.fetch(id).await.map(Some),
            None => Ok(None),
        }
    }
}

/// The commit phase. Owned by a spawned task.
struct Committer {
    registry: Arc<dyn RegistryClient>,
    config: Arc<PipelineConfig>,
}

impl Committer {
    async fn run(self, stored: StoredSubmission) -> IntakeOutcome {
        let StoredSubmission {
            record,
            caller_supplied_token,
            uploads,
        } = stored;

        let outcome = self.commit(&record, caller_supplied_token).await;

        tracing::debug!(stage = %Stage::CleaningUp, outcome = outcome.label(), "releasing staged uploads");
        for upload in uploads {
            upload.release();
        }
        outcome
    }

    async fn commit(&self, record: &Record, caller_supplied_token: bool) -> IntakeOutcome {
        let token = &record.submission_token;

        if caller_supplied_token {
            match self.lookup(token).await {
                Ok(Some(existing)) => {
                    tracing::info!(registry_id = %existing, "token already committed, replaying");
                    return self.replay(record, existing).await;
                }
                Ok(None) => {}
                Err(e) => return self.failed(record, e.into(), false),
            }
        }

        let started = Instant::now();
        let result = match timeout(self.config.commit_timeout, self.registry.commit(record)).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::SubmissionTimedOut {
                tx_hash: None,
                detail: format!("commit exceeded {:?}", self.config.commit_timeout),
            }),
        };
        telemetry::record_commit_latency(started);

        match result {
            Ok(registry_id) => {
                tracing::info!(%registry_id, "record committed");
                self.succeeded(record, registry_id, CommitDisposition::Committed)
            }
            Err(RegistryError::DuplicateSubmission { existing }) => {
                tracing::info!(registry_id = %existing, "ledger already holds this token");
                self.replay(record, existing).await
            }
            Err(e @ RegistryError::SubmissionRejected { .. }) => {
                tracing::warn!(error = %e, "registry rejected submission");
                self.failed(record, e.into(), false)
            }
            Err(e @ RegistryError::Unavailable { .. }) => {
                tracing::warn!(error = %e, "registry unreachable, nothing submitted");
                self.failed(record, e.into(), false)
            }
            Err(RegistryError::SubmissionTimedOut { tx_hash, detail }) => {
                tracing::warn!(tx_hash = ?tx_hash, %detail, "commit outcome unknown, disambiguating");
                self.disambiguate(record, tx_hash, detail).await
            }
            Err(other) => {
                tracing::warn!(error = %other, "unexpected commit error, disambiguating");
                self.disambiguate(record, None, other.to_string()).await
            }
        }
    }

    /// Resolve a timed-out commit by token lookup. Never resubmits. Lookups
    /// are repeated only while their errors are transient.
    async fn disambiguate(
        &self,
        record: &Record,
        tx_hash: Option<String>,
        detail: String,
    ) -> IntakeOutcome {
        let policy = self.config.lookup_retry;
        for attempt in 0..policy.attempts() {
            match self.lookup(&record.submission_token).await {
                Ok(Some(found)) => match self.fetch(found).await {
                    Ok(committed) if committed.record == *record => {
                        tracing::info!(registry_id = %found, "timed-out commit found on ledger");
                        return self.succeeded(record, found, CommitDisposition::Recovered);
                    }
                    Ok(_) => {
                        return self.failed(
                            record,
                            IntakeError::IdempotencyConflict {
                                token: record.submission_token.clone(),
                                existing: found,
                            },
                            true,
                        );
                    }
                    Err(e) => tracing::warn!(registry_id = %found, error = %e, "fetch during disambiguation failed"),
                },
                Ok(None) => tracing::debug!(attempt = attempt + 1, "token not on ledger yet"),
                Err(e) if !e.is_transient() => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "token lookup cannot succeed, giving up");
                    break;
                }
                Err(e) => tracing::warn!(attempt = attempt + 1, error = %e, "token lookup failed"),
            }
            if attempt + 1 < policy.attempts() {
                tokio::time::sleep(policy.delay(attempt)).await;
            }
        }

        tracing::warn!(tx_hash = ?tx_hash, "commit remains ambiguous");
        let [document_content_id, identity_content_id] = record.content_ids();
        IntakeOutcome::Ambiguous(AmbiguousCommit {
            submission_token: record.submission_token.clone(),
            document_content_id,
            identity_content_id,
            tx_hash,
            detail,
        })
    }

    /// Answer for a token the ledger already holds.
    async fn replay(&self, record: &Record, existing: RegistryId) -> IntakeOutcome {
        match self.fetch(existing).await {
            Ok(committed) if committed.record == *record => {
                self.succeeded(record, existing, CommitDisposition::Replayed)
            }
            Ok(_) => self.failed(
                record,
                IntakeError::IdempotencyConflict {
                    token: record.submission_token.clone(),
                    existing,
                },
                true,
            ),
            Err(e) => self.failed(record, e.into(), true),
        }
    }

    async fn lookup(&self, token: &SubmissionToken) -> Result<Option<RegistryId>, RegistryError> {
        match timeout(self.config.lookup_timeout, self.registry.find_by_token(token)).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::unavailable("token lookup timed out")),
        }
    }

    async fn fetch(&self, id: RegistryId) -> Result<CommittedRecord, RegistryError> {
        match timeout(self.config.lookup_timeout, self.registry.fetch(id)).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::unavailable("fetch timed out")),
        }
    }

    fn succeeded(
        &self,
        record: &Record,
        registry_id: RegistryId,
        disposition: CommitDisposition,
    ) -> IntakeOutcome {
        IntakeOutcome::Succeeded(SubmissionReceipt {
            registry_id,
            document_content_id: record.document_content_id,
            identity_content_id: record.identity_content_id,
            submission_token: record.submission_token.clone(),
            disposition,
        })
    }

    fn failed(&self, record: &Record, error: IntakeError, may_have_landed: bool) -> IntakeOutcome {
        IntakeOutcome::Failed(IntakeFailure {
            stage: Stage::Committing,
            content_stored: true,
            may_have_landed,
            submission_token: Some(record.submission_token.clone()),
            error,
        })
    }
}
