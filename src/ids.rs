//! Sequential-unique identifier generator (component B).
//!
//! LogEntry, JobExecution, Alert, and AlertInstance identity are all
//! "sequential id" — a single process-wide monotone counter per
//! entity kind, cheap to generate and strictly ordered, which doubles as the
//! Store's persisted-order tiebreaker ("persisted order uses the
//! sequential id").

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// 12 hex character correlation id, used when a caller omits one
pub fn generate_correlation_id() -> String {
    let raw = uuid::Uuid::new_v4();
    raw.simple().to_string()[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_unique() {
        let gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        let c = gen.next_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn correlation_id_is_twelve_hex_chars() {
        let id = generate_correlation_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
