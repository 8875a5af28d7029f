//! Transactional persistence over the log/job/execution/server/alert tables.
//!
//! Every table lives behind one coarse-grained `tokio::sync::RwLock`, and
//! every multi-row mutation (`start_execution`, `complete_execution`, alert
//! firing, ...) is implemented as a single write-lock critical section that
//! validates before it mutates, so no operation can fail partway through.

mod alerts;
mod cache;
mod executions;
mod jobs;
mod logs;
mod search;
mod servers;

pub use alerts::{CreateAlertFields, NewAlertInstance};
pub use executions::{CompleteExecutionRequest, StartExecutionRequest, StartedExecution};
pub use jobs::UpsertJobFields;
pub use logs::{LogRetentionCounts, LogRetentionCutoffs};
pub use search::{LogSearchFilter, SearchPage, SortColumn, SortDirection};
pub use servers::HeartbeatFields;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::ids::IdGenerator;
use crate::model::*;

/// All tables live behind one lock (see module docs for why).
#[derive(Default)]
pub(crate) struct StoreData {
    pub logs: BTreeMap<u64, LogEntry>,
    pub log_partitions: BTreeMap<(i32, u32), BTreeSet<u64>>,
    pub idx_by_timestamp: BTreeSet<(chrono::DateTime<chrono::Utc>, u64)>,
    pub idx_by_job: HashMap<String, BTreeSet<(chrono::DateTime<chrono::Utc>, u64)>>,
    pub idx_by_execution: HashMap<u64, BTreeSet<(chrono::DateTime<chrono::Utc>, u64)>>,
    pub idx_by_server: HashMap<String, BTreeSet<(chrono::DateTime<chrono::Utc>, u64)>>,
    pub idx_by_correlation: HashMap<String, Vec<u64>>,
    pub idx_by_trace: HashMap<String, Vec<u64>>,
    pub idx_warnings_plus: BTreeSet<(chrono::DateTime<chrono::Utc>, u64)>,
    pub idx_by_exception_type: HashMap<String, BTreeSet<(chrono::DateTime<chrono::Utc>, u64)>>,

    pub jobs: HashMap<String, Job>,
    pub executions: BTreeMap<u64, JobExecution>,
    pub executions_by_job: HashMap<String, BTreeSet<u64>>,

    pub servers: HashMap<String, Server>,

    pub alerts: BTreeMap<u64, Alert>,
    pub alert_instances: BTreeMap<u64, AlertInstance>,
    pub instances_by_alert: HashMap<u64, BTreeSet<u64>>,

    pub dashboard_cache: HashMap<String, DashboardCacheEntry>,
    pub audit_log: BTreeMap<u64, AuditLogEntry>,
    pub refresh_tokens: Vec<RefreshToken>,
}

pub struct Store {
    pub(crate) data: RwLock<StoreData>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) log_ids: IdGenerator,
    pub(crate) execution_ids: IdGenerator,
    pub(crate) alert_ids: IdGenerator,
    pub(crate) instance_ids: IdGenerator,
    pub(crate) audit_ids: IdGenerator,
}

impl Store {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            data: RwLock::new(StoreData::default()),
            clock,
            log_ids: IdGenerator::new(),
            execution_ids: IdGenerator::new(),
            alert_ids: IdGenerator::new(),
            instance_ids: IdGenerator::new(),
            audit_ids: IdGenerator::new(),
        })
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now_utc()
    }

    pub(crate) async fn record_audit(
        &self,
        data: &mut StoreData,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        detail: Option<serde_json::Value>,
    ) {
        let id = self.audit_ids.next_id();
        data.audit_log.insert(
            id,
            AuditLogEntry {
                id,
                at: self.now(),
                actor: actor.to_string(),
                action: action.to_string(),
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
                detail,
            },
        );
    }
}

fn month_key(ts: chrono::DateTime<chrono::Utc>) -> (i32, u32) {
    use chrono::Datelike;
    (ts.year(), ts.month())
}
