//! Bounded buffer, producer discipline, and flush workers for log ingestion.
//!
//! Single and batch submissions validate and stamp each entry, then enqueue
//! it onto a bounded in-memory buffer; one or more flush workers drain the
//! buffer on a timer or once it crosses half capacity and commit each batch
//! to the store in one transaction.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::ConfigHandle;
use crate::error::{Result, StoreError};
use crate::model::{ExceptionInfo, LogEntry, LogLevel};
use crate::realtime::{topics, FanOut};
use crate::store::Store;

use super::validate::{validate, ValidationIssue};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLogRequest {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: u8,
    pub message: String,
    pub job_id: Option<String>,
    pub job_execution_id: Option<u64>,
    pub server_name: String,
    pub category: Option<String>,
    pub source_context: Option<String>,
    pub correlation_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub exception: Option<ExceptionInfo>,
    pub properties: Option<Json>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub environment: Option<String>,
    pub application_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogIngestionResult {
    pub id: u64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogRejection {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchLogResult {
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub rejections: Vec<LogRejection>,
}

/// Bounded FIFO queue. A `Semaphore` initialized with `capacity` permits
/// tracks free slots: acquiring a permit reserves a slot, `add_permits`
/// releases one back once a flush worker drains the corresponding entry.
struct Buffer {
    queue: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    semaphore: Semaphore,
    half_full: Notify,
}

impl Buffer {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            semaphore: Semaphore::new(capacity),
            half_full: Notify::new(),
        }
    }

    async fn enqueue_blocking(&self, entry: LogEntry, deadline: Duration) -> Result<()> {
        let permit = tokio::time::timeout(deadline, self.semaphore.acquire())
        .await
        .map_err(|_| StoreError::Overloaded)?
        .map_err(|_| StoreError::Internal("ingestion buffer closed".into()))?;
        permit.forget();
        self.push(entry);
        Ok(())
    }

    /// Non-blocking variant used by batch ingest's "accept a prefix" rule.
    fn try_enqueue(&self, entry: LogEntry) -> std::result::Result<(), LogEntry> {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.push(entry);
                Ok(())
            }
            Err(_) => Err(entry),
        }
    }

    fn push(&self, entry: LogEntry) {
        let mut queue = self.queue.lock().expect("ingestion buffer lock poisoned");
        queue.push_back(entry);
        if queue.len() * 2 >= self.capacity {
            self.half_full.notify_one();
        }
    }

    fn drain(&self, max: usize) -> Vec<LogEntry> {
        let mut queue = self.queue.lock().expect("ingestion buffer lock poisoned");
        let n = max.min(queue.len());
        let drained: Vec<_> = queue.drain(..n).collect();
        drop(queue);
        self.semaphore.add_permits(drained.len());
        drained
    }

    fn len(&self) -> usize {
        self.queue.lock().expect("ingestion buffer lock poisoned").len()
    }
}

pub struct IngestionPipeline {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: ConfigHandle,
    fan_out: Arc<FanOut>,
    buffer: Buffer,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        config: ConfigHandle,
        fan_out: Arc<FanOut>,
    ) -> Arc<Self> {
        let capacity = config.current().ingestion.max_queue_size;
        Arc::new(Self {
            store,
            clock,
            config,
            fan_out,
            buffer: Buffer::new(capacity),
        })
    }

    pub fn queued_len(&self) -> usize {
        self.buffer.len()
    }

    fn stamp(&self, req: CreateLogRequest, client_ip: Option<String>) -> std::result::Result<LogEntry, ValidationIssue> {
        validate(&req)?;
        let now = self.clock.now_utc();
        Ok(LogEntry {
            id: self.store.log_ids.next_id(),
            timestamp: req.timestamp.unwrap_or(now),
            level: LogLevel::from_u8(req.level).expect("validated above"),
            message: req.message,
            job_id: req.job_id,
            job_execution_id: req.job_execution_id,
            server_name: req.server_name,
            category: req.category,
            source_context: req.source_context,
            correlation_id: req.correlation_id,
            trace_id: req.trace_id,
            span_id: req.span_id,
            parent_span_id: req.parent_span_id,
            exception: req.exception,
            properties: req.properties,
            tags: req.tags,
            environment: req.environment,
            application_version: req.application_version,
            received_at: now,
            client_ip,
        })
    }

    /// Single-entry ingest: blocks up to `enqueueDeadline`
    /// waiting for buffer space, else `Overloaded`.
    pub async fn ingest_single(
        &self,
        req: CreateLogRequest,
        client_ip: Option<String>,
    ) -> Result<LogIngestionResult> {
        let entry = self.stamp(req, client_ip).map_err(|issue| StoreError::Validation(issue.0))?;
        let id = entry.id;
        let received_at = entry.received_at;
        let deadline = self.config.current().ingestion.enqueue_deadline;
        self.buffer.enqueue_blocking(entry, deadline).await?;
        Ok(LogIngestionResult { id, received_at })
    }

    /// Batch ingest: validates every entry, then enqueues
    /// non-blockingly so a batch that would overrun capacity accepts a
    /// prefix and reports the rest as rejected rather than blocking.
    pub async fn ingest_batch(
        &self,
        reqs: Vec<CreateLogRequest>,
        client_ip: Option<String>,
    ) -> BatchLogResult {
        let config = self.config.current();
        let max_batch_size = config.ingestion.max_batch_size;
        let absolute_cap = config.ingestion.absolute_batch_cap;
        let mut rejections = Vec::new();
        let mut accepted = 0u64;

        for (index, req) in reqs.into_iter().enumerate() {
            if index >= absolute_cap {
                rejections.push(LogRejection {
                    index,
                    reason: format!("batch exceeds absolute cap of {absolute_cap}"),
                });
                continue;
            }
            if index >= max_batch_size {
                rejections.push(LogRejection {
                    index,
                    reason: format!("batch exceeds configured max batch size of {max_batch_size}"),
                });
                continue;
            }
            match self.stamp(req, client_ip.clone()) {
                Ok(entry) => match self.buffer.try_enqueue(entry) {
                    Ok(()) => accepted += 1,
                    Err(_entry) => rejections.push(LogRejection {
                        index,
                        reason: "ingestion buffer at capacity".into(),
                    }),
                },
                Err(issue) => rejections.push(LogRejection { index, reason: issue.0 }),
            }
        }

        BatchLogResult {
            accepted_count: accepted,
            rejected_count: rejections.len() as u64,
            rejections,
        }
    }

    async fn flush_once(&self) {
        let max_batch = self.config.current().ingestion.max_batch_size;
        loop {
            let batch = self.buffer.drain(max_batch);
            let drained = batch.len();
            if drained == 0 {
                break;
            }
            self.commit_batch(batch).await;
            if drained < max_batch {
                break;
            }
        }
    }

    /// One write-lock critical section inserts every log in the batch,
    /// autovivifies any unknown jobId/serverName, and reconciles execution
    /// log counters before the lock is released; events publish only after
    /// the commit is visible.
    async fn commit_batch(&self, batch: Vec<LogEntry>) {
        let now = self.clock.now_utc();
        let mut committed = Vec::with_capacity(batch.len());
        {
            let mut data = self.store.data.write().await;
            for entry in batch {
                if let Some(job_id) = &entry.job_id {
                    Store::ensure_job_locked(&mut data, job_id, now);
                }
                if !data.servers.contains_key(&entry.server_name) {
                    data.servers.insert(
                        entry.server_name.clone(),
                        crate::model::Server::stub(&entry.server_name, now),
                    );
                }
                if let Some(execution_id) = entry.job_execution_id {
                    Store::record_log_on_execution(&mut data, execution_id, entry.level);
                }
                committed.push(entry.clone());
                Store::insert_log_locked(&mut data, entry);
            }
        }
        for entry in &committed {
            self.publish_log_event(entry);
        }
    }

    fn publish_log_event(&self, entry: &LogEntry) {
        let payload = serde_json::to_value(entry).unwrap_or(Json::Null);
        self.fan_out.publish(topics::LOGS_ALL, payload.clone());
        if entry.level >= LogLevel::Warning {
            self.fan_out.publish(topics::LOGS_ERRORS, payload.clone());
        }
        if let Some(job_id) = &entry.job_id {
            self.fan_out.publish(&topics::logs_job(job_id), payload.clone());
        }
        if let Some(execution_id) = entry.job_execution_id {
            self.fan_out.publish(&topics::logs_execution(execution_id), payload);
        }
    }

    /// Spawns the flush worker: wakes on whichever comes first of the
    /// periodic tick or the buffer crossing half capacity, draining up to
    /// `maxBatchSize` per commit.
    pub fn spawn_flush_worker(self: &Arc<Self>) -> FlushWorkerHandle {
        let pipeline = Arc::clone(self);
        let interval = pipeline.config.current().ingestion.processing_interval;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let join_handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => {}
                        _ = pipeline.buffer.half_full.notified() => {}
                    }
                    pipeline.flush_once().await;
                }
                pipeline.flush_once().await;
        });
        FlushWorkerHandle {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }
}

pub struct FlushWorkerHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl FlushWorkerHandle {
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(jh) = self.join_handle.take() {
            let _ = jh.await;
        }
    }
}

impl Drop for FlushWorkerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(jh) = self.join_handle.take() {
            jh.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn sample_request(level: u8, msg: &str) -> CreateLogRequest {
        CreateLogRequest {
            timestamp: None,
            level,
            message: msg.into(),
            job_id: None,
            job_execution_id: None,
            server_name: "S".into(),
            category: None,
            source_context: None,
            correlation_id: None,
            trace_id: None,
            span_id: None,
            parent_span_id: None,
            exception: None,
            properties: None,
            tags: vec![],
            environment: None,
            application_version: None,
        }
    }

    fn new_pipeline(capacity: usize) -> Arc<IngestionPipeline> {
        let store = Store::new(Arc::new(SystemClock));
        let mut config = crate::config::AppConfig::default();
        config.ingestion.max_queue_size = capacity;
        IngestionPipeline::new(store, Arc::new(SystemClock), ConfigHandle::new(config), Arc::new(FanOut::default()))
    }

    #[tokio::test]
    async fn single_ingest_rejects_invalid_payload() {
        let pipeline = new_pipeline(10);
        let err = pipeline.ingest_single(sample_request(9, "x"), None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn batch_ingest_reports_per_item_rejections() {
        let pipeline = new_pipeline(10);
        let reqs = vec![sample_request(2, "ok"), sample_request(9, "bad")];
        let result = pipeline.ingest_batch(reqs, None).await;
        assert_eq!(result.accepted_count, 1);
        assert_eq!(result.rejected_count, 1);
        assert_eq!(result.rejections[0].index, 1);
    }

    #[tokio::test]
    async fn batch_ingest_accepts_a_prefix_when_buffer_is_full() {
        let pipeline = new_pipeline(2);
        let reqs = vec![sample_request(2, "a"), sample_request(2, "b"), sample_request(2, "c")];
        let result = pipeline.ingest_batch(reqs, None).await;
        assert_eq!(result.accepted_count, 2);
        assert_eq!(result.rejected_count, 1);
    }

    #[tokio::test]
    async fn flush_moves_queued_entries_into_the_store() {
        let pipeline = new_pipeline(10);
        pipeline.ingest_batch(vec![sample_request(2, "a"), sample_request(4, "b")], None).await;
        assert_eq!(pipeline.queued_len(), 2);
        pipeline.flush_once().await;
        assert_eq!(pipeline.queued_len(), 0);
        assert_eq!(pipeline.store.log_count().await, 2);
    }
}
