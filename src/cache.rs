use crate::protocol::{Record, RecordType};
use std::collections::HashMap;

/// Cache of every resource record seen so far, keyed by (name, type).
///
/// Records live for the whole process; the resolver relies on entries from
/// earlier hops (glue, CNAME targets) staying visible to later lookups, and
/// `dump` prints the full contents. TTLs are stored for display but never
/// drive expiry.
#[derive(Default)]
pub struct RecordCache {
    entries: HashMap<CacheKey, Vec<Record>>,
}

#[derive(Clone, Eq, Hash, PartialEq)]
struct CacheKey {
    rtype: RecordType,
    // All comparisons of domain names must be case-insensitive per the
    // official DNS protocol, so the name is lowercased before being used as
    // a key. Original casing is preserved on the records themselves.
    // See https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.3
    name_ascii_lowercase: String,
}

impl CacheKey {
    fn new(name: &str, rtype: RecordType) -> CacheKey {
        CacheKey {
            rtype,
            name_ascii_lowercase: name.to_ascii_lowercase(),
        }
    }
}

impl RecordCache {
    pub fn new() -> RecordCache {
        RecordCache {
            entries: HashMap::new(),
        }
    }

    /// Adds a record to the set for its (name, type) pair. A record with the
    /// same identity replaces the old one in place, so a refreshed TTL wins
    /// without disturbing insertion order.
    pub fn insert(&mut self, record: Record) {
        let key = CacheKey::new(record.name(), record.rtype());
        let records = self.entries.entry(key).or_default();

        match records.iter().position(|r| r.same_identity(&record)) {
            Some(i) => records[i] = record,
            None => records.push(record),
        }
    }

    /// Returns the stored set for (name, type), in insertion order. The name
    /// is matched case-insensitively.
    pub fn lookup(&self, name: &str, rtype: RecordType) -> Vec<Record> {
        self.entries
            .get(&CacheKey::new(name, rtype))
            .cloned()
            .unwrap_or_default()
    }

    /// Visits every cached entry, in no particular order. Used by `dump`.
    pub fn for_each(&self, mut f: impl FnMut(&str, RecordType, &[Record])) {
        for (key, records) in &self.entries {
            f(&key.name_ascii_lowercase, key.rtype, records);
        }
    }
}
