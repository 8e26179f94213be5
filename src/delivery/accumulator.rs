//! Per-job batch accumulation and size-aware splitting

use crate::core::Entry;
use std::collections::HashMap;

/// Fixed per-record overhead added to the payload estimate, in bytes
pub const RECORD_OVERHEAD: usize = 100;

/// Estimated contribution of one entry to an outgoing payload
#[inline]
pub fn estimated_size(entry: &Entry) -> usize {
    entry.payload_len() + RECORD_OVERHEAD
}

/// Groups entries by job until a group is full or a flush takes it
///
/// Owned by a single worker; never shared.
#[derive(Debug)]
pub struct BatchAccumulator {
    groups: HashMap<String, Vec<Entry>>,
    batch_size: usize,
    len: usize,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            groups: HashMap::new(),
            batch_size: batch_size.max(1),
            len: 0,
        }
    }

    /// Add an entry; returns its job's group once it reaches `batch_size`
    pub fn push(&mut self, entry: Entry) -> Option<(String, Vec<Entry>)> {
        let group = self.groups.entry(entry.job.clone()).or_default();
        group.push(entry);
        self.len += 1;

        if group.len() >= self.batch_size {
            let job = group[0].job.clone();
            let full = std::mem::take(group);
            self.groups.remove(&job);
            self.len -= full.len();
            Some((job, full))
        } else {
            None
        }
    }

    /// Take every non-empty group
    pub fn drain_all(&mut self) -> Vec<(String, Vec<Entry>)> {
        self.len = 0;
        self.groups
            .drain()
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }

    /// Number of entries held across all groups
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Split a job's group into chunks whose estimated size stays within
/// `max_payload_size`
///
/// A record is never split; one larger than the limit travels alone. Order
/// within the group is kept.
pub fn split_by_size(entries: Vec<Entry>, max_payload_size: usize) -> Vec<Vec<Entry>> {
    let mut chunks = Vec::new();
    let mut current: Vec<Entry> = Vec::new();
    let mut current_size = 0usize;

    for entry in entries {
        let size = estimated_size(&entry);
        if !current.is_empty() && current_size + size > max_payload_size {
            chunks.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(entry);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    fn entry(job: &str, payload_len: usize) -> Entry {
        Entry::new(job, LogLevel::Info, "m").with_payload(vec![b'x'; payload_len])
    }

    #[test]
    fn test_group_released_at_batch_size() {
        let mut acc = BatchAccumulator::new(3);
        assert!(acc.push(entry("api", 1)).is_none());
        assert!(acc.push(entry("api", 1)).is_none());
        assert!(acc.push(entry("db", 1)).is_none());
        assert_eq!(acc.len(), 3);

        let (job, group) = acc.push(entry("api", 1)).expect("api group is full");
        assert_eq!(job, "api");
        assert_eq!(group.len(), 3);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_drain_all_empties_accumulator() {
        let mut acc = BatchAccumulator::new(10);
        acc.push(entry("api", 1));
        acc.push(entry("db", 1));
        acc.push(entry("db", 1));

        let mut groups = acc.drain_all();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].1.len(), 2);
        assert!(acc.is_empty());
        assert!(acc.drain_all().is_empty());
    }

    #[test]
    fn test_split_respects_limit() {
        // Each record is estimated at 100 + 100 = 200 bytes.
        let entries: Vec<_> = (0..5).map(|_| entry("api", 100)).collect();
        let chunks = split_by_size(entries, 450);

        assert_eq!(
            chunks.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
    }

    #[test]
    fn test_oversized_record_travels_alone() {
        let entries = vec![entry("api", 10), entry("api", 1000), entry("api", 10)];
        let chunks = split_by_size(entries, 300);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1][0].payload_len(), 1000);
    }

    #[test]
    fn test_split_keeps_order() {
        let entries: Vec<_> = (0..4)
            .map(|i| Entry::new("api", LogLevel::Info, i.to_string()).with_payload(vec![0; 50]))
            .collect();
        let chunks = split_by_size(entries, 320);

        let order: Vec<_> = chunks
            .into_iter()
            .flatten()
            .map(|e| e.message)
            .collect();
        assert_eq!(order, vec!["0", "1", "2", "3"]);
    }
}
