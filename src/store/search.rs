use chrono::{DateTime, Utc};

use super::Store;
use crate::model::{LogEntry, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Timestamp,
    Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Input filters of all optional and AND-combined.
#[derive(Debug, Clone)]
pub struct LogSearchFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub job_id: Option<String>,
    pub job_execution_id: Option<u64>,
    pub server_name: Option<String>,
    pub min_level: Option<LogLevel>,
    pub max_level: Option<LogLevel>,
    pub search_text: Option<String>,
    pub exception_type: Option<String>,
    pub correlation_id: Option<String>,
    pub has_exception: Option<bool>,
    pub tag: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
}

impl Default for LogSearchFilter {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            job_id: None,
            job_execution_id: None,
            server_name: None,
            min_level: None,
            max_level: None,
            search_text: None,
            exception_type: None,
            correlation_id: None,
            has_exception: None,
            tag: None,
            page: 1,
            page_size: 50,
            sort_column: SortColumn::Timestamp,
            sort_direction: SortDirection::Desc,
        }
    }
}

pub struct SearchPage {
    pub items: Vec<LogEntry>,
    pub total_count: usize,
}

impl Store {
    pub async fn search_logs(&self, filter: &LogSearchFilter) -> SearchPage {
        let now = self.now();
        let start = filter.start.unwrap_or(now - chrono::Duration::hours(24));
        let end = filter.end.unwrap_or(now);
        let page = filter.page.max(1);
        let page_size = filter.page_size.clamp(1, 1000);

        let data = self.data.read().await;

        // Narrow via the most selective index available before filtering.
        let candidate_ids: Vec<u64> = if let Some(job_id) = &filter.job_id {
            data.idx_by_job
            .get(job_id)
            .map(|set| {
                    set.range((start, 0)..=(end, u64::MAX))
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default()
        } else if let Some(exec_id) = filter.job_execution_id {
            data.idx_by_execution
            .get(&exec_id)
            .map(|set| {
                    set.range((start, 0)..=(end, u64::MAX))
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default()
        } else if let Some(server_name) = &filter.server_name {
            data.idx_by_server
            .get(server_name)
            .map(|set| {
                    set.range((start, 0)..=(end, u64::MAX))
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default()
        } else {
            data.idx_by_timestamp
            .range((start, 0)..=(end, u64::MAX))
            .map(|(_, id)| id)
            .copied()
            .collect()
        };

        let mut matched: Vec<&LogEntry> = candidate_ids
        .iter()
        .filter_map(|id| data.logs.get(id))
        .filter(|entry| matches_filter(entry, filter))
        .collect();

        match (filter.sort_column, filter.sort_direction) {
            (SortColumn::Timestamp, SortDirection::Asc) => {
                matched.sort_by_key(|e| (e.timestamp, e.id))
            }
            (SortColumn::Timestamp, SortDirection::Desc) => {
                matched.sort_by_key(|e| std::cmp::Reverse((e.timestamp, e.id)))
            }
            (SortColumn::Level, SortDirection::Asc) => matched.sort_by_key(|e| (e.level, e.id)),
            (SortColumn::Level, SortDirection::Desc) => {
                matched.sort_by_key(|e| std::cmp::Reverse((e.level, e.id)))
            }
        }

        let total_count = matched.len();
        let offset = (page as usize - 1) * page_size as usize;
        let items = matched
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .cloned()
        .collect();

        SearchPage { items, total_count }
    }
}

fn matches_filter(entry: &LogEntry, filter: &LogSearchFilter) -> bool {
    if let Some(job_id) = &filter.job_id {
        if entry.job_id.as_deref() != Some(job_id.as_str()) {
            return false;
        }
    }
    if let Some(exec_id) = filter.job_execution_id {
        if entry.job_execution_id != Some(exec_id) {
            return false;
        }
    }
    if let Some(server_name) = &filter.server_name {
        if &entry.server_name != server_name {
            return false;
        }
    }
    if let Some(min) = filter.min_level {
        if entry.level < min {
            return false;
        }
    }
    if let Some(max) = filter.max_level {
        if entry.level > max {
            return false;
        }
    }
    if let Some(text) = &filter.search_text {
        if !entry.message.to_lowercase().contains(&text.to_lowercase()) {
            return false;
        }
    }
    if let Some(exc) = &filter.exception_type {
        match &entry.exception {
            Some(e) if e.exception_type.to_lowercase().contains(&exc.to_lowercase()) => {}
            _ => return false,
        }
    }
    if let Some(corr) = &filter.correlation_id {
        if entry.correlation_id.as_deref() != Some(corr.as_str()) {
            return false;
        }
    }
    if let Some(want) = filter.has_exception {
        if entry.has_exception() != want {
            return false;
        }
    }
    if let Some(tag) = &filter.tag {
        if !entry.tags.iter().any(|t| t.to_lowercase().contains(&tag.to_lowercase())) {
            return false;
        }
    }
    true
}
