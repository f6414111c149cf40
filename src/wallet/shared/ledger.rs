use super::records::{TxRecord, TxDetails};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The authoritative per-wallet transaction ledger.
///
/// Records are indexed by internal id and by both chain-level ids, so a
/// malleated transaction resolves to the same logical entry. Entries are
/// never removed, only marked superseded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxLedger {
    records: HashMap<String, TxRecord>,
    /// chain_id / mal_chain_id -> internal_id; rebuilt after load.
    #[serde(skip)]
    chain_index: HashMap<String, String>,
}

impl TxLedger {
    /// Restores the chain-id index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.chain_index.clear();
        for record in self.records.values() {
            if let Some(id) = &record.chain_id {
                self.chain_index.insert(id.clone(), record.internal_id.clone());
            }
            if let Some(id) = &record.mal_chain_id {
                self.chain_index.insert(id.clone(), record.internal_id.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up by internal id first, then by either chain-level id.
    pub fn get(&self, id: &str) -> Option<&TxRecord> {
        if let Some(record) = self.records.get(id) {
            return Some(record);
        }
        self.chain_index.get(id).and_then(|i| self.records.get(i))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TxRecord> {
        let internal = if self.records.contains_key(id) {
            id.to_string()
        } else {
            self.chain_index.get(id)?.clone()
        };
        self.records.get_mut(&internal)
    }

    /// Resolves a chain observation to an existing record by matching
    /// either id against either stored id (malleability dedup).
    pub fn find_by_chain_ids(&self, chain_id: &str, mal_chain_id: &str) -> Option<String> {
        if !chain_id.is_empty() {
            if let Some(internal) = self.chain_index.get(chain_id) {
                return Some(internal.clone());
            }
        }
        if !mal_chain_id.is_empty() {
            if let Some(internal) = self.chain_index.get(mal_chain_id) {
                return Some(internal.clone());
            }
        }
        None
    }

    pub fn insert(&mut self, record: TxRecord) {
        if let Some(id) = &record.chain_id {
            self.chain_index.insert(id.clone(), record.internal_id.clone());
        }
        if let Some(id) = &record.mal_chain_id {
            self.chain_index.insert(id.clone(), record.internal_id.clone());
        }
        self.records.insert(record.internal_id.clone(), record);
    }

    /// Re-registers a record's chain ids after a malleable-id update.
    pub fn reindex(&mut self, internal_id: &str) {
        if let Some(record) = self.records.get(internal_id) {
            if let Some(id) = &record.chain_id {
                self.chain_index.insert(id.clone(), internal_id.to_string());
            }
            if let Some(id) = &record.mal_chain_id {
                self.chain_index.insert(id.clone(), internal_id.to_string());
            }
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &TxRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut TxRecord> {
        self.records.values_mut()
    }

    /// Records with timestamps in `[start, end]` (unix seconds), ascending.
    pub fn list(&self, start: i64, end: i64) -> Vec<&TxRecord> {
        let mut out: Vec<&TxRecord> = self
            .records
            .values()
            .filter(|r| {
                let ts = r.timestamp.timestamp();
                ts >= start && ts <= end
            })
            .collect();
        sort_deterministic(&mut out);
        out
    }

    /// Case-insensitive substring match over notes, category, counterparty
    /// name, and output addresses. Ordering is deterministic: timestamp
    /// ascending, ties broken by internal id.
    pub fn search(&self, query: &str) -> Vec<&TxRecord> {
        let needle = query.to_lowercase();
        let mut out: Vec<&TxRecord> = self
            .records
            .values()
            .filter(|r| matches_query(r, &needle))
            .collect();
        sort_deterministic(&mut out);
        out
    }

    pub fn set_details(&mut self, id: &str, details: TxDetails) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.details = details;
                true
            }
            None => false,
        }
    }
}

fn matches_query(record: &TxRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record.details.notes.to_lowercase().contains(needle)
        || record.details.category.to_lowercase().contains(needle)
        || record.details.name.to_lowercase().contains(needle)
        || record
            .outputs
            .iter()
            .any(|o| o.address.to_lowercase().contains(needle))
}

fn sort_deterministic(records: &mut [&TxRecord]) {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.internal_id.cmp(&b.internal_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::shared::records::TxOutput;
    use chrono::{TimeZone, Utc};

    fn record(internal: &str, chain: &str, ts: i64) -> TxRecord {
        TxRecord {
            internal_id: internal.to_string(),
            chain_id: Some(chain.to_string()),
            mal_chain_id: None,
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            outputs: vec![TxOutput {
                address: "tb1qexample".to_string(),
                amount_satoshi: 1000,
            }],
            amount_satoshi: 1000,
            fee_satoshi: 0,
            block_height: 0,
            confirmed: false,
            superseded: false,
            details: TxDetails {
                name: "Alice".to_string(),
                category: "Income".to_string(),
                notes: "lunch repayment".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn lookup_by_internal_and_chain_id() {
        let mut ledger = TxLedger::default();
        ledger.insert(record("int-1", "chain-1", 100));
        assert!(ledger.get("int-1").is_some());
        assert!(ledger.get("chain-1").is_some());
        assert!(ledger.get("missing").is_none());
    }

    #[test]
    fn list_is_time_ordered_and_bounded() {
        let mut ledger = TxLedger::default();
        ledger.insert(record("b", "cb", 200));
        ledger.insert(record("a", "ca", 100));
        ledger.insert(record("c", "cc", 300));

        let all = ledger.list(0, i64::MAX);
        let ids: Vec<&str> = all.iter().map(|r| r.internal_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let bounded = ledger.list(150, 250);
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].internal_id, "b");
    }

    #[test]
    fn search_matches_notes_category_name_and_address() {
        let mut ledger = TxLedger::default();
        ledger.insert(record("a", "ca", 100));

        assert_eq!(ledger.search("LUNCH").len(), 1);
        assert_eq!(ledger.search("income").len(), 1);
        assert_eq!(ledger.search("alice").len(), 1);
        assert_eq!(ledger.search("tb1q").len(), 1);
        assert_eq!(ledger.search("nothing-here").len(), 0);
    }

    #[test]
    fn index_survives_serde_round_trip() {
        let mut ledger = TxLedger::default();
        ledger.insert(record("a", "ca", 100));

        let json = serde_json::to_string(&ledger).unwrap();
        let mut restored: TxLedger = serde_json::from_str(&json).unwrap();
        assert!(restored.get("ca").is_none());
        restored.rebuild_index();
        assert!(restored.get("ca").is_some());
    }
}
