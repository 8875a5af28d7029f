use chrono::{DateTime, Utc};

use super::{month_key, Store, StoreData};
use crate::model::{LogEntry, LogLevel};

/// Age cutoffs from 's `Retention.*` configuration keys.
#[derive(Debug, Clone, Copy)]
pub struct LogRetentionCutoffs {
    pub trace_debug_days: i64,
    pub default_days: i64,
    pub error_days: i64,
    pub critical_days: i64,
}

/// Per-category row counts from a retention sweep, matching the category
/// labels of scenario 3 ("Trace/Debug (>7 days)", "Information (>90
/// days)",...).
#[derive(Debug, Clone, Default)]
pub struct LogRetentionCounts {
    pub trace_debug: u64,
    pub information: u64,
    pub warning_error: u64,
    pub critical: u64,
}

impl LogRetentionCounts {
    fn add(&mut self, level: LogLevel) {
        match level {
            LogLevel::Trace | LogLevel::Debug => self.trace_debug += 1,
            LogLevel::Info => self.information += 1,
            LogLevel::Warning | LogLevel::Error => self.warning_error += 1,
            LogLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.trace_debug + self.information + self.warning_error + self.critical
    }
}

impl Store {
    /// Inserts a single, already-validated `LogEntry`, maintaining every
    /// secondary index of Called under the caller's own write
    /// guard so batched flushes commit as one critical section.
    pub(crate) fn insert_log_locked(data: &mut StoreData, entry: LogEntry) {
        let id = entry.id;
        let ts = entry.timestamp;

        data.log_partitions.entry(month_key(ts)).or_default().insert(id);
        data.idx_by_timestamp.insert((ts, id));

        if let Some(job_id) = &entry.job_id {
            data.idx_by_job.entry(job_id.clone()).or_default().insert((ts, id));
        }
        if let Some(exec_id) = entry.job_execution_id {
            data.idx_by_execution.entry(exec_id).or_default().insert((ts, id));
        }
        data.idx_by_server
        .entry(entry.server_name.clone())
        .or_default()
        .insert((ts, id));
        if let Some(corr) = &entry.correlation_id {
            data.idx_by_correlation.entry(corr.clone()).or_default().push(id);
        }
        if let Some(trace) = &entry.trace_id {
            data.idx_by_trace.entry(trace.clone()).or_default().push(id);
        }
        if entry.level >= LogLevel::Warning {
            data.idx_warnings_plus.insert((ts, id));
        }
        if let Some(exc) = &entry.exception {
            data.idx_by_exception_type
            .entry(exc.exception_type.clone())
            .or_default()
            .insert((ts, id));
        }

        data.logs.insert(id, entry);
    }

    pub(crate) fn remove_log_locked(data: &mut StoreData, id: u64) {
        let Some(entry) = data.logs.remove(&id) else {
            return;
        };
        let ts = entry.timestamp;
        data.idx_by_timestamp.remove(&(ts, id));
        if let Some(job_id) = &entry.job_id {
            if let Some(set) = data.idx_by_job.get_mut(job_id) {
                set.remove(&(ts, id));
            }
        }
        if let Some(exec_id) = entry.job_execution_id {
            if let Some(set) = data.idx_by_execution.get_mut(&exec_id) {
                set.remove(&(ts, id));
            }
        }
        if let Some(set) = data.idx_by_server.get_mut(&entry.server_name) {
            set.remove(&(ts, id));
        }
        if let Some(corr) = &entry.correlation_id {
            if let Some(v) = data.idx_by_correlation.get_mut(corr) {
                v.retain(|x| *x != id);
            }
        }
        if let Some(trace) = &entry.trace_id {
            if let Some(v) = data.idx_by_trace.get_mut(trace) {
                v.retain(|x| *x != id);
            }
        }
        data.idx_warnings_plus.remove(&(ts, id));
        if let Some(exc) = &entry.exception {
            if let Some(set) = data.idx_by_exception_type.get_mut(&exc.exception_type) {
                set.remove(&(ts, id));
            }
        }
        let key = month_key(ts);
        if let Some(ids) = data.log_partitions.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                data.log_partitions.remove(&key);
            }
        }
    }

    pub async fn get_log(&self, id: u64) -> Option<LogEntry> {
        self.data.read().await.logs.get(&id).cloned()
    }

    /// Logs sharing a correlation id, for `GetLogDetail`'s "correlated siblings".
    pub async fn logs_by_correlation(&self, correlation_id: &str) -> Vec<LogEntry> {
        let data = self.data.read().await;
        data.idx_by_correlation
        .get(correlation_id)
        .map(|ids| ids.iter().filter_map(|id| data.logs.get(id).cloned()).collect())
        .unwrap_or_default()
    }

    /// Rows with `level >= Warning` in a timestamp window (used by the
    /// ErrorThreshold alert condition, ).
    pub async fn count_logs_since(
        &self,
        since: DateTime<Utc>,
        min_level: LogLevel,
        job_id: Option<&str>,
        server_name: Option<&str>,
    ) -> u64 {
        let data = self.data.read().await;
        let ids: Box<dyn Iterator<Item = u64>> = if min_level >= LogLevel::Warning {
            Box::new(
                data.idx_warnings_plus
                .range((since, 0)..)
                .map(|(_, id)| *id),
            )
        } else {
            Box::new(data.idx_by_timestamp.range((since, 0)..).map(|(_, id)| *id))
        };

        ids.filter(|id| {
                let Some(entry) = data.logs.get(id) else {
                    return false;
                };
                if entry.level < min_level {
                    return false;
                }
                if let Some(j) = job_id {
                    if entry.job_id.as_deref() != Some(j) {
                        return false;
                    }
                }
                if let Some(s) = server_name {
                    if entry.server_name != s {
                        return false;
                    }
                }
                true
        })
        .count() as u64
    }

    /// `≥1 matching log in window` for the PatternMatch alert condition.
    pub async fn any_log_matches_since(
        &self,
        since: DateTime<Utc>,
        regex: &regex::Regex,
        min_level: Option<LogLevel>,
    ) -> bool {
        let data = self.data.read().await;
        data.idx_by_timestamp
        .range((since, 0)..)
        .filter_map(|(_, id)| data.logs.get(id))
        .any(|entry| {
                min_level.map_or(true, |lvl| entry.level >= lvl) && regex.is_match(&entry.message)
        })
    }

    /// Top exception types in a window, for the dashboard's "top exceptions" view.
    pub async fn top_exceptions_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Vec<(String, u64)> {
        let data = self.data.read().await;
        let mut counts: std::collections::HashMap<String, u64> = std::collections::HashMap::new();
        for (_, id) in data.idx_by_timestamp.range((since, 0)..) {
            if let Some(entry) = data.logs.get(id) {
                if let Some(exc) = &entry.exception {
                    *counts.entry(exc.exception_type.clone()).or_insert(0) += 1;
                }
            }
        }
        let mut v: Vec<_> = counts.into_iter().collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        v.truncate(limit);
        v
    }

    /// Hourly count trend over a window, for the dashboard's "hourly trend" view.
    pub async fn hourly_trend_since(&self, since: DateTime<Utc>) -> Vec<(DateTime<Utc>, u64)> {
        let data = self.data.read().await;
        let mut buckets: std::collections::BTreeMap<DateTime<Utc>, u64> =
        std::collections::BTreeMap::new();
        for (ts, _) in data.idx_by_timestamp.range((since, 0)..) {
            use chrono::Timelike;
            let bucket = ts
            .date_naive()
            .and_hms_opt(ts.hour(), 0, 0)
            .expect("valid hour")
            .and_utc();
            *buckets.entry(bucket).or_insert(0) += 1;
        }
        buckets.into_iter().collect()
    }

    pub async fn log_count(&self) -> usize {
        self.data.read().await.logs.len()
    }

    /// level-specific retention sweep, oldest partitions first.
    /// Runs in batches of `batch_size`; when `dry_run` is set, counts
    /// matching rows without deleting them.
    pub async fn retain_logs(
        &self,
        now: DateTime<Utc>,
        cutoffs: &LogRetentionCutoffs,
        batch_size: usize,
        dry_run: bool,
    ) -> LogRetentionCounts {
        self.retain_logs_with_pacing(now, cutoffs, batch_size, dry_run, std::time::Duration::ZERO)
        .await
    }

    /// Same as `retain_logs`, with a sleep between partitions so a large
    /// sweep doesn't saturate the store ("small inter-batch sleep").
    pub async fn retain_logs_with_pacing(
        &self,
        now: DateTime<Utc>,
        cutoffs: &LogRetentionCutoffs,
        batch_size: usize,
        dry_run: bool,
        inter_batch_sleep: std::time::Duration,
    ) -> LogRetentionCounts {
        let mut counts = LogRetentionCounts::default();
        let partition_keys: Vec<_> = {
            let data = self.data.read().await;
            data.log_partitions.keys().copied().collect()
        };

        for key in partition_keys {
            let ids: Vec<u64> = {
                let data = self.data.read().await;
                data.log_partitions
                .get(&key)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
            };

            let mut to_delete = Vec::new();
            {
                let data = self.data.read().await;
                for id in ids {
                    let Some(entry) = data.logs.get(&id) else {
                        continue;
                    };
                    let age = now - entry.timestamp;
                    let matched = match entry.level {
                        LogLevel::Trace | LogLevel::Debug => {
                            age > chrono::Duration::days(cutoffs.trace_debug_days)
                        }
                        LogLevel::Info => age > chrono::Duration::days(cutoffs.default_days),
                        LogLevel::Warning | LogLevel::Error => {
                            age > chrono::Duration::days(cutoffs.error_days)
                        }
                        LogLevel::Critical => age > chrono::Duration::days(cutoffs.critical_days),
                    };
                    if matched {
                        counts.add(entry.level);
                        to_delete.push(id);
                    }
                    if to_delete.len() >= batch_size {
                        break;
                    }
                }
            }

            if !dry_run {
                let mut data = self.data.write().await;
                for id in to_delete {
                    Store::remove_log_locked(&mut data, id);
                }
                drop(data);
                if !inter_batch_sleep.is_zero() {
                    tokio::time::sleep(inter_batch_sleep).await;
                }
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use std::sync::Arc;

    fn sample(id: u64, ts: DateTime<Utc>, level: LogLevel, server: &str) -> LogEntry {
        LogEntry {
            id,
            timestamp: ts,
            level,
            message: "m".into(),
            job_id: None,
            job_execution_id: None,
            server_name: server.into(),
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
            received_at: ts,
            client_ip: None,
        }
    }

    #[tokio::test]
    async fn count_logs_since_filters_by_level_and_server() {
        let store = Store::new(Arc::new(SystemClock));
        let now = Utc::now();
        {
            let mut data = store.data.write().await;
            Store::insert_log_locked(&mut data, sample(1, now, LogLevel::Info, "S"));
            Store::insert_log_locked(&mut data, sample(2, now, LogLevel::Error, "S"));
            Store::insert_log_locked(&mut data, sample(3, now, LogLevel::Error, "T"));
        }
        let count = store
        .count_logs_since(now - chrono::Duration::seconds(1), LogLevel::Error, None, Some("S"))
        .await;
        assert_eq!(count, 1);
    }
}
