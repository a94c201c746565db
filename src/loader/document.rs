use serde_json::Value as JsonValue;

use crate::model::{decode_records, AddressDetailRecord, Decoded, Record};

use super::error::LoadError;

/// A structured document an [`AsyncLoader`](super::AsyncLoader) can produce.
pub trait FeedDocument: Sized + Send + Sync + 'static {
    /// Convert an already-parsed JSON value. Failures here are shape errors.
    fn decode(value: JsonValue) -> Result<Self, LoadError>;
}

/// A feed of independent records; malformed entries are counted, not fatal.
pub type Batch<T> = Decoded<T>;

impl<T> FeedDocument for Decoded<T>
where
    T: Record + Send + Sync + 'static,
{
    fn decode(value: JsonValue) -> Result<Self, LoadError> {
        match value {
            JsonValue::Array(items) => Ok(decode_records(items)),
            other => Err(LoadError::Shape(format!(
                "expected an array of {} records, got {}",
                T::KIND,
                json_kind(&other)
            ))),
        }
    }
}

impl FeedDocument for AddressDetailRecord {
    fn decode(value: JsonValue) -> Result<Self, LoadError> {
        serde_json::from_value(value).map_err(|e| LoadError::Shape(e.to_string()))
    }
}

/// Parse a raw body. Syntax problems are parse errors, structural ones are
/// shape errors.
pub fn parse_body<T: FeedDocument>(body: &[u8]) -> Result<T, LoadError> {
    let value: JsonValue =
        serde_json::from_slice(body).map_err(|e| LoadError::Parse(e.to_string()))?;
    T::decode(value)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertRecord, RuleEvaluationRecord};

    #[test]
    fn test_parse_error_is_distinct_from_shape_error() {
        let err = parse_body::<Batch<AlertRecord>>(b"{not json").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));

        let err = parse_body::<Batch<AlertRecord>>(br#"{"address": "0x1"}"#).unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));

        let err = parse_body::<AddressDetailRecord>(br#"{"chain": "ethereum"}"#).unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
    }

    #[test]
    fn test_batch_keeps_good_records() {
        let body = br#"[
            {"tx_hash": "0xaa", "rules_triggered": ["C-001"], "total_risk_score": 30.0},
            {"rules_triggered": []},
            {"address": "0xbb", "compliance_score": "oops"}
        ]"#;
        let batch = parse_body::<Batch<RuleEvaluationRecord>>(body).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.dropped, 2);
    }
}
