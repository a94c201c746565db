use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::model::{decode_records, NetworkMetricRecord};

/// Per-chain token metrics held in memory, keyed by chain display name.
/// Chains keep the order they appear in the source document.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    chains: Vec<String>,
    by_chain: HashMap<String, Arc<[NetworkMetricRecord]>>,
}

impl Dataset {
    /// Load a dataset file shaped `{ "<Chain>": [record, ...], ... }`.
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read dataset file '{}': {}", path, e))?;
        let dataset = Self::from_json(&content)
            .map_err(|e| eyre::eyre!("Failed to parse dataset '{}': {}", path, e))?;
        tracing::info!(
            chains = dataset.chains.len(),
            records = dataset.by_chain.values().map(|r| r.len()).sum::<usize>(),
            "Loaded token dataset"
        );
        Ok(dataset)
    }

    pub fn from_json(content: &str) -> eyre::Result<Self> {
        let root: serde_json::Map<String, JsonValue> = serde_json::from_str(content)?;
        let mut dataset = Self::default();
        for (chain, value) in root {
            let JsonValue::Array(items) = value else {
                return Err(eyre::eyre!("Chain '{}' must map to an array of records", chain));
            };
            let decoded = decode_records::<NetworkMetricRecord>(items);
            if decoded.dropped > 0 {
                tracing::warn!(
                    %chain,
                    dropped = decoded.dropped,
                    "Skipped malformed token records"
                );
            }
            dataset.insert(chain, decoded.records);
        }
        Ok(dataset)
    }

    /// Replace a chain's records wholesale.
    pub fn insert(&mut self, chain: String, records: Vec<NetworkMetricRecord>) {
        if !self.by_chain.contains_key(&chain) {
            self.chains.push(chain.clone());
        }
        self.by_chain.insert(chain, records.into());
    }

    pub fn chains(&self) -> &[String] {
        &self.chains
    }

    /// Records for `chain`; empty for an unknown chain.
    pub fn records(&self, chain: &str) -> Arc<[NetworkMetricRecord]> {
        self.by_chain
            .get(chain)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

/// The record snapshot for the active selection. Replaced, never mutated,
/// so readers holding an older `Arc` keep a consistent view.
#[derive(Debug, Clone)]
pub struct RecordStore {
    chain: String,
    snapshot: Arc<[NetworkMetricRecord]>,
}

impl RecordStore {
    pub fn new(chain: impl Into<String>, snapshot: Arc<[NetworkMetricRecord]>) -> Self {
        Self {
            chain: chain.into(),
            snapshot,
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new(), Arc::from(Vec::new()))
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn snapshot(&self) -> Arc<[NetworkMetricRecord]> {
        Arc::clone(&self.snapshot)
    }

    pub fn replace(&mut self, chain: impl Into<String>, snapshot: Arc<[NetworkMetricRecord]>) {
        self.chain = chain.into();
        self.snapshot = snapshot;
        tracing::debug!(
            chain = %self.chain,
            records = self.snapshot.len(),
            "Record snapshot replaced"
        );
    }

    pub fn find(&self, contract: &str) -> Option<&NetworkMetricRecord> {
        self.snapshot.iter().find(|r| r.contract == contract)
    }
}
