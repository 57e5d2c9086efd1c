//! The hash-chained decision ledger.
//!
//! Appends are serialized through a single lock around the chain head:
//! read head -> hash -> persist -> advance. Two concurrent `log` calls can
//! therefore never link to the same `previous_hash`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::export::{self, ExportFormat};
use crate::hash::{entry_hash, hash_matches};
use crate::store::{LedgerStore, MemoryStore, StorageError};
use crate::types::{
    ChainView, LedgerEntry, LedgerStats, NewEntry, QueryFilter, VerificationReport, GENESIS_HASH,
};

/// Storage key prefix for entries.
pub(crate) const ENTRY_PREFIX: &str = "entry/";

fn entry_key(sequence: u64) -> String {
    format!("{ENTRY_PREFIX}{sequence:020}")
}

fn sequence_from_key(key: &str) -> Result<u64> {
    key.strip_prefix(ENTRY_PREFIX)
        .and_then(|seq| seq.parse().ok())
        .ok_or_else(|| StorageError::Backend(format!("malformed ledger key: {key}")).into())
}

/// Logging callback for components that record decisions.
#[async_trait]
pub trait DecisionLogger: Send + Sync {
    /// Append a decision and return its entry ID.
    ///
    /// An `Err` means the decision was not persisted.
    async fn log(&self, entry: NewEntry) -> Result<String>;
}

/// Where the next append links to.
#[derive(Debug, Clone)]
struct ChainHead {
    last_hash: String,
    next_sequence: u64,
    /// A write failed or timed out; reload from storage before the next append
    stale: bool,
}

impl ChainHead {
    fn genesis() -> Self {
        Self {
            last_hash: GENESIS_HASH.to_string(),
            next_sequence: 0,
            stale: false,
        }
    }
}

/// A persisted record, parsed if possible.
struct StoredRecord {
    key: String,
    entry: std::result::Result<LedgerEntry, serde_json::Error>,
}

/// Append-only, tamper-evident decision ledger.
pub struct Ledger {
    /// Durable storage
    store: Arc<dyn LedgerStore>,
    /// Configuration
    config: LedgerConfig,
    /// Chain head, also the append lock
    head: Mutex<ChainHead>,
}

impl Ledger {
    /// Open a ledger over a store, recovering the chain head from it.
    pub async fn open(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let ledger = Self {
            store,
            config,
            head: Mutex::new(ChainHead::genesis()),
        };

        let head = ledger.load_head().await?;
        info!(
            store = ledger.store.name(),
            entries = head.next_sequence,
            "Ledger opened"
        );
        *ledger.head.lock().await = head;

        Ok(ledger)
    }

    /// Open an empty ledger over a fresh [`MemoryStore`].
    pub async fn in_memory() -> Result<Self> {
        Self::open(Arc::new(MemoryStore::new()), LedgerConfig::default()).await
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Append a decision.
    ///
    /// Returns the new entry's ID only once the entry is durable. Any storage
    /// failure is returned to the caller.
    pub async fn log(&self, new_entry: NewEntry) -> Result<String> {
        let mut head = self.head.lock().await;

        if head.stale {
            warn!("Chain head stale after failed write, reloading from storage");
            *head = self.load_head().await?;
        }

        let mut entry = LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            sequence: head.next_sequence,
            timestamp: Utc::now(),
            actor: new_entry.actor,
            decision: new_entry.decision,
            rationale: new_entry.rationale,
            outcome: new_entry.outcome,
            coherence_score: new_entry.coherence_score,
            context: new_entry.context,
            parent_entry: new_entry.parent_entry,
            hash: String::new(),
            previous_hash: head.last_hash.clone(),
            signature: new_entry.signature,
        };
        entry.hash = entry_hash(&entry)?;

        let bytes = serde_json::to_vec(&entry)?;
        let key = entry_key(entry.sequence);

        if let Err(e) = self.timed("put", self.store.put(&key, bytes)).await {
            head.stale = true;
            error!(entry_id = %entry.id, sequence = entry.sequence, error = %e, "Ledger append failed");
            return Err(e);
        }

        head.last_hash = entry.hash.clone();
        head.next_sequence += 1;

        debug!(
            entry_id = %entry.id,
            sequence = entry.sequence,
            actor = %entry.actor,
            outcome = %entry.outcome,
            "Ledger entry appended"
        );

        Ok(entry.id)
    }

    /// Get an entry by ID.
    pub async fn get(&self, entry_id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .find(|e| e.id == entry_id))
    }

    /// Entries matching a filter, in append order.
    ///
    /// `limit` keeps the most recent matches. An empty ledger yields an
    /// empty list.
    pub async fn query(&self, filter: &QueryFilter) -> Result<Vec<LedgerEntry>> {
        let mut matches: Vec<LedgerEntry> = self
            .entries()
            .await?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();

        if let Some(limit) = filter.limit.or(self.config.default_query_limit) {
            if matches.len() > limit {
                matches.drain(..matches.len() - limit);
            }
        }

        Ok(matches)
    }

    /// Reconstruct the causal path to an entry and check its integrity.
    pub async fn get_chain(&self, entry_id: &str) -> Result<ChainView> {
        let entries = self.entries().await?;
        let by_id: HashMap<&str, &LedgerEntry> =
            entries.iter().map(|e| (e.id.as_str(), e)).collect();
        let by_sequence: HashMap<u64, &LedgerEntry> =
            entries.iter().map(|e| (e.sequence, e)).collect();

        let target = *by_id
            .get(entry_id)
            .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))?;

        let mut path = vec![target];
        let mut visited: HashSet<&str> = HashSet::from([target.id.as_str()]);
        let mut missing_parent = None;
        let mut cycle = false;
        let mut cursor = target;

        while let Some(parent_id) = cursor.parent_entry.as_deref() {
            if !visited.insert(parent_id) {
                warn!(entry_id = %cursor.id, parent = %parent_id, "Parent cycle in ledger chain");
                cycle = true;
                break;
            }
            match by_id.get(parent_id) {
                Some(&parent) => {
                    path.push(parent);
                    cursor = parent;
                }
                None => {
                    missing_parent = Some(parent_id.to_string());
                    break;
                }
            }
        }
        path.reverse();

        let mut integrity_valid = missing_parent.is_none() && !cycle;
        for entry in &path {
            if !hash_matches(entry) {
                warn!(entry_id = %entry.id, "Chain entry hash mismatch");
                integrity_valid = false;
            }
            let expected_previous = match entry.sequence.checked_sub(1) {
                None => Some(GENESIS_HASH),
                Some(prior) => by_sequence.get(&prior).map(|p| p.hash.as_str()),
            };
            if expected_previous != Some(entry.previous_hash.as_str()) {
                warn!(entry_id = %entry.id, "Chain entry previous_hash link broken");
                integrity_valid = false;
            }
        }

        let entries: Vec<LedgerEntry> = path.into_iter().cloned().collect();
        let root = entries[0].clone();
        let depth = entries.len();

        Ok(ChainView {
            entries,
            root,
            depth,
            integrity_valid,
            missing_parent,
        })
    }

    /// Scan the whole ledger in append order and report integrity problems.
    ///
    /// Problems are reported, never repaired.
    pub async fn verify(&self) -> Result<VerificationReport> {
        let records = self.records().await?;
        let mut report = VerificationReport {
            total_entries: records.len(),
            ..Default::default()
        };

        let mut expected_previous: Option<String> = Some(GENESIS_HASH.to_string());
        for record in records {
            match record.entry {
                Ok(entry) => {
                    if !hash_matches(&entry) {
                        report.tampered_entries.push(entry.id.clone());
                    }
                    if let Some(expected) = &expected_previous {
                        if &entry.previous_hash != expected {
                            report.broken_chains += 1;
                        }
                    }
                    expected_previous = Some(entry.hash);
                }
                Err(e) => {
                    warn!(key = %record.key, error = %e, "Unreadable ledger record");
                    report.unreadable_entries.push(record.key);
                    expected_previous = None;
                }
            }
        }

        report.valid = report.broken_chains == 0
            && report.tampered_entries.is_empty()
            && report.unreadable_entries.is_empty();

        if report.valid {
            debug!(entries = report.total_entries, "Ledger verified");
        } else {
            warn!(
                entries = report.total_entries,
                broken_chains = report.broken_chains,
                tampered = report.tampered_entries.len(),
                unreadable = report.unreadable_entries.len(),
                "Ledger integrity violations detected"
            );
        }

        Ok(report)
    }

    /// Render entries in an export format.
    pub fn export(&self, entries: &[LedgerEntry], format: ExportFormat) -> Result<String> {
        export::export(entries, format)
    }

    /// Summary statistics.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let entries = self.entries().await?;
        let mut by_outcome: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &entries {
            *by_outcome.entry(entry.outcome.as_str().to_string()).or_insert(0) += 1;
        }

        Ok(LedgerStats {
            total_entries: entries.len(),
            by_outcome,
            head_hash: self.head.lock().await.last_hash.clone(),
        })
    }

    /// Readable entries in append order.
    async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter_map(|record| match record.entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(key = %record.key, error = %e, "Skipping unreadable ledger record");
                    None
                }
            })
            .collect())
    }

    async fn records(&self) -> Result<Vec<StoredRecord>> {
        let raw = self.timed("list", self.store.list(ENTRY_PREFIX)).await?;
        Ok(raw
            .into_iter()
            .map(|(key, bytes)| StoredRecord {
                key,
                entry: serde_json::from_slice(&bytes),
            })
            .collect())
    }

    /// Chain head as persisted: last readable hash and the next free sequence.
    async fn load_head(&self) -> Result<ChainHead> {
        let records = self.records().await?;
        let Some(last) = records.last() else {
            return Ok(ChainHead::genesis());
        };

        let next_sequence = match &last.entry {
            Ok(entry) => entry.sequence + 1,
            Err(_) => {
                warn!(key = %last.key, "Last ledger record unreadable; appending after it");
                sequence_from_key(&last.key)? + 1
            }
        };
        let last_hash = records
            .iter()
            .rev()
            .find_map(|record| record.entry.as_ref().ok().map(|e| e.hash.clone()))
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        Ok(ChainHead {
            last_hash,
            next_sequence,
            stale: false,
        })
    }

    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StorageError>>,
    {
        let timeout_ms = self.config.storage_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
            Ok(result) => result.map_err(LedgerError::from),
            Err(_) => Err(LedgerError::Timeout {
                operation,
                timeout_ms,
            }),
        }
    }
}

#[async_trait]
impl DecisionLogger for Ledger {
    async fn log(&self, entry: NewEntry) -> Result<String> {
        Ledger::log(self, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    fn decision(actor: &str, decision: &str) -> NewEntry {
        NewEntry::new(actor, decision, "because", Outcome::Success)
    }

    /// Store that can be told to reject writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl LedgerStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn put(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("disk full".to_string()));
            }
            self.inner.put(key, value).await
        }

        async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key).await
        }

        async fn list(
            &self,
            prefix: &str,
        ) -> std::result::Result<Vec<(String, Vec<u8>)>, StorageError> {
            self.inner.list(prefix).await
        }
    }

    /// Store whose writes stall. A late write is either abandoned with the
    /// caller's future or finished by a detached task after the caller gave up.
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore,
        delay_ms: AtomicU64,
        land_late: AtomicBool,
    }

    impl SlowStore {
        fn stall(&self, delay_ms: u64, land_late: bool) {
            self.delay_ms.store(delay_ms, Ordering::SeqCst);
            self.land_late.store(land_late, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LedgerStore for SlowStore {
        fn name(&self) -> &str {
            "slow"
        }

        async fn put(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), StorageError> {
            let delay = Duration::from_millis(self.delay_ms.load(Ordering::SeqCst));
            if delay.is_zero() {
                return self.inner.put(key, value).await;
            }

            if self.land_late.load(Ordering::SeqCst) {
                let inner = self.inner.clone();
                let key = key.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = inner.put(&key, value).await;
                });
                return std::future::pending().await;
            }

            tokio::time::sleep(delay).await;
            self.inner.put(key, value).await
        }

        async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key).await
        }

        async fn list(
            &self,
            prefix: &str,
        ) -> std::result::Result<Vec<(String, Vec<u8>)>, StorageError> {
            self.inner.list(prefix).await
        }
    }

    async fn slow_ledger() -> (Arc<SlowStore>, Ledger) {
        let store = Arc::new(SlowStore::default());
        let config = LedgerConfig {
            storage_timeout_ms: 50,
            ..Default::default()
        };
        let ledger = Ledger::open(store.clone(), config).await.unwrap();
        (store, ledger)
    }

    #[tokio::test]
    async fn test_empty_ledger() {
        let ledger = Ledger::in_memory().await.unwrap();
        assert!(ledger.query(&QueryFilter::default()).await.unwrap().is_empty());

        let report = ledger.verify().await.unwrap();
        assert!(report.valid);
        assert_eq!(report.total_entries, 0);
    }

    #[tokio::test]
    async fn test_log_links_entries() {
        let ledger = Ledger::in_memory().await.unwrap();
        let first = ledger.log(decision("alice", "one")).await.unwrap();
        let second = ledger.log(decision("bob", "two")).await.unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[0].previous_hash, GENESIS_HASH);
        assert_eq!(entries[1].id, second);
        assert_eq!(entries[1].previous_hash, entries[0].hash);
        assert_eq!(entries[1].sequence, 1);
    }

    #[tokio::test]
    async fn test_query_filter_and_limit() {
        let ledger = Ledger::in_memory().await.unwrap();
        for i in 0..5 {
            let actor = if i % 2 == 0 { "alice" } else { "bob" };
            ledger.log(decision(actor, &format!("d{i}"))).await.unwrap();
        }
        ledger
            .log(NewEntry::new("alice", "d5", "r", Outcome::Failure))
            .await
            .unwrap();

        let alice = ledger.query(&QueryFilter::actor("alice")).await.unwrap();
        let decisions: Vec<_> = alice.iter().map(|e| e.decision.as_str()).collect();
        assert_eq!(decisions, vec!["d0", "d2", "d4", "d5"]);

        let recent = ledger
            .query(&QueryFilter::actor("alice").with_limit(2))
            .await
            .unwrap();
        let decisions: Vec<_> = recent.iter().map(|e| e.decision.as_str()).collect();
        assert_eq!(decisions, vec!["d4", "d5"]);

        let failures = ledger
            .query(&QueryFilter::default().with_outcome(Outcome::Failure))
            .await
            .unwrap();
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_query_is_repeatable() {
        let ledger = Ledger::in_memory().await.unwrap();
        for i in 0..3 {
            ledger.log(decision("alice", &format!("d{i}"))).await.unwrap();
        }
        let first = ledger.query(&QueryFilter::default()).await.unwrap();
        let second = ledger.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_chain_follows_parents() {
        let ledger = Ledger::in_memory().await.unwrap();
        let e1 = ledger.log(decision("alice", "root")).await.unwrap();
        ledger.log(decision("carol", "unrelated")).await.unwrap();
        let e2 = ledger
            .log(decision("bob", "child").with_parent(e1.clone()))
            .await
            .unwrap();

        let chain = ledger.get_chain(&e2).await.unwrap();
        let ids: Vec<_> = chain.entries.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![e1.clone(), e2]);
        assert_eq!(chain.depth, 2);
        assert_eq!(chain.root.id, e1);
        assert!(chain.integrity_valid);
        assert!(chain.missing_parent.is_none());
    }

    #[tokio::test]
    async fn test_get_chain_missing_entry() {
        let ledger = Ledger::in_memory().await.unwrap();
        let result = ledger.get_chain("nope").await;
        assert!(matches!(result, Err(LedgerError::EntryNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_chain_dangling_parent() {
        let ledger = Ledger::in_memory().await.unwrap();
        let id = ledger
            .log(decision("alice", "orphan").with_parent("ghost"))
            .await
            .unwrap();

        let chain = ledger.get_chain(&id).await.unwrap();
        assert_eq!(chain.depth, 1);
        assert_eq!(chain.missing_parent.as_deref(), Some("ghost"));
        assert!(!chain.integrity_valid);
    }

    #[tokio::test]
    async fn test_tampering_detected() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::open(store.clone(), LedgerConfig::default())
            .await
            .unwrap();
        ledger.log(decision("alice", "one")).await.unwrap();
        let target = ledger.log(decision("bob", "two")).await.unwrap();
        ledger.log(decision("carol", "three")).await.unwrap();

        let key = entry_key(1);
        let bytes = store.get(&key).await.unwrap().unwrap();
        let mut entry: LedgerEntry = serde_json::from_slice(&bytes).unwrap();
        entry.decision = "rewritten".to_string();
        store
            .put(&key, serde_json::to_vec(&entry).unwrap())
            .await
            .unwrap();

        let report = ledger.verify().await.unwrap();
        assert!(!report.valid);
        assert_eq!(report.tampered_entries, vec![target.clone()]);
        assert_eq!(report.broken_chains, 0);

        let chain = ledger.get_chain(&target).await.unwrap();
        assert!(!chain.integrity_valid);

        // Still readable after detection
        assert_eq!(ledger.query(&QueryFilter::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rewritten_hash_breaks_chain() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::open(store.clone(), LedgerConfig::default())
            .await
            .unwrap();
        ledger.log(decision("alice", "one")).await.unwrap();
        ledger.log(decision("bob", "two")).await.unwrap();

        let key = entry_key(0);
        let bytes = store.get(&key).await.unwrap().unwrap();
        let mut entry: LedgerEntry = serde_json::from_slice(&bytes).unwrap();
        entry.decision = "forged".to_string();
        entry.hash = entry_hash(&entry).unwrap();
        store
            .put(&key, serde_json::to_vec(&entry).unwrap())
            .await
            .unwrap();

        let report = ledger.verify().await.unwrap();
        assert!(report.tampered_entries.is_empty());
        assert_eq!(report.broken_chains, 1);
        assert!(!report.valid);
    }

    #[tokio::test]
    async fn test_unreadable_record_reported() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::open(store.clone(), LedgerConfig::default())
            .await
            .unwrap();
        ledger.log(decision("alice", "one")).await.unwrap();
        store.put(&entry_key(0), b"{garbage".to_vec()).await.unwrap();

        let report = ledger.verify().await.unwrap();
        assert_eq!(report.unreadable_entries, vec![entry_key(0)]);
        assert!(!report.valid);
        assert!(ledger.query(&QueryFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_propagates_and_recovers() {
        let store = Arc::new(FlakyStore::default());
        let ledger = Ledger::open(store.clone(), LedgerConfig::default())
            .await
            .unwrap();
        ledger.log(decision("alice", "one")).await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let result = ledger.log(decision("alice", "lost")).await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));

        store.fail_writes.store(false, Ordering::SeqCst);
        ledger.log(decision("alice", "two")).await.unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        let decisions: Vec<_> = entries.iter().map(|e| e.decision.as_str()).collect();
        assert_eq!(decisions, vec!["one", "two"]);
        assert!(ledger.verify().await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_write_timeout_marks_head_stale() {
        let (store, ledger) = slow_ledger().await;
        ledger.log(decision("alice", "one")).await.unwrap();

        store.stall(500, false);
        let result = ledger.log(decision("alice", "lost")).await;
        assert!(matches!(
            result,
            Err(LedgerError::Timeout { operation: "put", timeout_ms: 50 })
        ));
        assert!(ledger.head.lock().await.stale);

        store.stall(0, false);
        ledger.log(decision("alice", "two")).await.unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        let decisions: Vec<_> = entries.iter().map(|e| e.decision.as_str()).collect();
        assert_eq!(decisions, vec!["one", "two"]);
        assert_eq!(entries[1].sequence, 1);
        assert_eq!(entries[1].previous_hash, entries[0].hash);
        assert!(ledger.verify().await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_timed_out_write_that_lands_late_is_chained() {
        let (store, ledger) = slow_ledger().await;
        ledger.log(decision("alice", "one")).await.unwrap();

        store.stall(100, true);
        let result = ledger.log(decision("alice", "late")).await;
        assert!(matches!(result, Err(LedgerError::Timeout { operation: "put", .. })));

        tokio::time::sleep(Duration::from_millis(300)).await;
        store.stall(0, false);
        ledger.log(decision("bob", "after")).await.unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        let decisions: Vec<_> = entries.iter().map(|e| e.decision.as_str()).collect();
        assert_eq!(decisions, vec!["one", "late", "after"]);
        assert_eq!(entries[2].sequence, 2);
        assert_eq!(entries[2].previous_hash, entries[1].hash);
        assert!(ledger.verify().await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_reopen_continues_chain() {
        let store = Arc::new(MemoryStore::new());
        {
            let ledger = Ledger::open(store.clone(), LedgerConfig::default())
                .await
                .unwrap();
            ledger.log(decision("alice", "one")).await.unwrap();
        }

        let ledger = Ledger::open(store.clone(), LedgerConfig::default())
            .await
            .unwrap();
        ledger.log(decision("bob", "two")).await.unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(entries[1].sequence, 1);
        assert_eq!(entries[1].previous_hash, entries[0].hash);
        assert!(ledger.verify().await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_reopen_after_unreadable_tail() {
        let store = Arc::new(MemoryStore::new());
        {
            let ledger = Ledger::open(store.clone(), LedgerConfig::default())
                .await
                .unwrap();
            ledger.log(decision("alice", "one")).await.unwrap();
            ledger.log(decision("alice", "two")).await.unwrap();
        }
        store.put(&entry_key(1), b"{garbage".to_vec()).await.unwrap();

        let ledger = Ledger::open(store.clone(), LedgerConfig::default())
            .await
            .unwrap();
        ledger.log(decision("bob", "three")).await.unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sequence, 2);
        assert_eq!(entries[1].previous_hash, entries[0].hash);
        assert_eq!(ledger.verify().await.unwrap().unreadable_entries, vec![entry_key(1)]);
    }

    #[tokio::test]
    async fn test_float_fields_verify_after_reload() {
        let ledger = Ledger::in_memory().await.unwrap();
        let score = 0.1 + 0.2;
        ledger
            .log(
                decision("gate:coherence", "scored")
                    .with_coherence_score(score)
                    .with_context(serde_json::json!({"curl": 2.0 / 7.0, "divergence": -1.0 / 3.0})),
            )
            .await
            .unwrap();

        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(entries[0].coherence_score, Some(score));
        assert!(ledger.verify().await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_chain_intact() {
        let ledger = Arc::new(Ledger::in_memory().await.unwrap());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    ledger
                        .log(decision(&format!("worker-{worker}"), &format!("d{i}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let report = ledger.verify().await.unwrap();
        assert!(report.valid);
        assert_eq!(report.total_entries, 80);
    }

    #[tokio::test]
    async fn test_stats() {
        let ledger = Ledger::in_memory().await.unwrap();
        ledger.log(decision("alice", "one")).await.unwrap();
        ledger
            .log(NewEntry::new("gate:origin", "Gate ORIGIN FAIL", "no source", Outcome::Fail))
            .await
            .unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.by_outcome.get("fail"), Some(&1));
        let entries = ledger.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(stats.head_hash, entries[1].hash);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = LedgerConfig {
            storage_timeout_ms: 0,
            ..Default::default()
        };
        let result = Ledger::open(Arc::new(MemoryStore::new()), config).await;
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}
