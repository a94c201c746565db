pub mod graph;
pub mod metrics;
pub mod rules;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

pub use graph::{GraphEdge, GraphModel, GraphNode};
pub use metrics::{Neighbor, NetworkMetricRecord, Reason, SortKey, TxSample};
pub use rules::{
    AddressDetailRecord, AlertRecord, Evidence, RecentTx, RuleEvaluationRecord, RuleHit,
    ScoreBreakdown, Severity,
};

/// A record type received from an external evaluation process.
/// `check` runs after deserialization for constraints serde cannot express.
pub trait Record: DeserializeOwned {
    const KIND: &'static str;

    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Records that survived shape validation, plus a count of the ones that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            dropped: 0,
        }
    }
}

/// Decode each element independently. A malformed element is dropped and
/// counted; it never aborts the batch.
pub fn decode_records<T: Record>(items: Vec<JsonValue>) -> Decoded<T> {
    let mut out = Decoded {
        records: Vec::with_capacity(items.len()),
        dropped: 0,
    };

    for (idx, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<T>(item)
            .map_err(|e| e.to_string())
            .and_then(|record| record.check().map(|_| record));
        match parsed {
            Ok(record) => out.records.push(record),
            Err(reason) => {
                tracing::debug!(kind = T::KIND, index = idx, %reason, "Dropping malformed record");
                out.dropped += 1;
            }
        }
    }

    if out.dropped > 0 {
        tracing::warn!(
            kind = T::KIND,
            kept = out.records.len(),
            dropped = out.dropped,
            "Dropped malformed records from batch"
        );
    }

    out
}
