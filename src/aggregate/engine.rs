use chrono::DateTime;

use crate::model::{NetworkMetricRecord, SortKey};

use super::tier::{classify_tier, ANOMALY_THRESHOLD, HIGH_THRESHOLD, MED_THRESHOLD};
use super::types::{BucketKind, DashboardView, DistributionBucket, FeedEntry, Summary};

/// Maximum rows in the merged transaction feed.
pub const FEED_LIMIT: usize = 6;
/// Rows in the risk leaderboard.
pub const LEADER_LIMIT: usize = 5;

/// Compute every derived view for one snapshot. The summary, leaderboard and
/// feed cover the whole snapshot; only `filtered` honors the query.
pub fn aggregate(records: &[NetworkMetricRecord], query: &str, sort_key: SortKey) -> DashboardView {
    let summary = summarize(records);
    DashboardView {
        filtered: filter_and_sort(records, query, sort_key)
            .into_iter()
            .cloned()
            .collect(),
        distribution: distribution(&summary).to_vec(),
        summary,
        leaders: top_by_risk(records, LEADER_LIMIT)
            .into_iter()
            .cloned()
            .collect(),
        feed: merge_transaction_feed(records),
    }
}

/// Keep records whose contract or name contains `query` (case-insensitive),
/// ordered descending by `sort_key`. Equal keys keep encounter order.
pub fn filter_and_sort<'a>(
    records: &'a [NetworkMetricRecord],
    query: &str,
    sort_key: SortKey,
) -> Vec<&'a NetworkMetricRecord> {
    let needle = query.to_lowercase();
    let mut rows: Vec<&NetworkMetricRecord> = records
        .iter()
        .filter(|r| matches_query(r, &needle))
        .collect();
    // slice::sort_by is stable
    rows.sort_by(|a, b| rank_value(b.metric(sort_key)).total_cmp(&rank_value(a.metric(sort_key))));
    rows
}

fn matches_query(record: &NetworkMetricRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.contract.to_lowercase().contains(needle)
        || record.name.to_lowercase().contains(needle)
}

pub fn summarize(records: &[NetworkMetricRecord]) -> Summary {
    let total = records.len();
    if total == 0 {
        return Summary::default();
    }

    let high = records
        .iter()
        .filter(|r| r.risk_score >= HIGH_THRESHOLD)
        .count();
    let warn = records
        .iter()
        .filter(|r| r.risk_score >= MED_THRESHOLD && r.risk_score < HIGH_THRESHOLD)
        .count();
    let anomaly = records
        .iter()
        .filter(|r| r.anomaly_score >= ANOMALY_THRESHOLD)
        .count();
    let density_sum: f64 = records.iter().map(|r| r.density.unwrap_or(0.0)).sum();

    Summary {
        total,
        high,
        warn,
        anomaly,
        high_share: high as f64 / total as f64 * 100.0,
        anomaly_share: anomaly as f64 / total as f64 * 100.0,
        avg_density: density_sum / total as f64,
    }
}

/// HIGH / WARN / LOW buckets. LOW is clamped so hand-built summaries with
/// overlapping counts never go negative.
pub fn distribution(summary: &Summary) -> [DistributionBucket; 3] {
    let low = summary
        .total
        .saturating_sub(summary.high)
        .saturating_sub(summary.warn);
    [
        DistributionBucket {
            kind: BucketKind::High,
            label: "고위험",
            value: summary.high,
        },
        DistributionBucket {
            kind: BucketKind::Warn,
            label: "경보",
            value: summary.warn,
        },
        DistributionBucket {
            kind: BucketKind::Low,
            label: "저위험",
            value: low,
        },
    ]
}

pub fn top_by_risk(records: &[NetworkMetricRecord], k: usize) -> Vec<&NetworkMetricRecord> {
    let mut rows: Vec<&NetworkMetricRecord> = records.iter().collect();
    rows.sort_by(|a, b| rank_value(b.risk_score).total_cmp(&rank_value(a.risk_score)));
    rows.truncate(k);
    rows
}

/// Flatten every record's samples into one feed, largest amount first,
/// capped at [`FEED_LIMIT`].
pub fn merge_transaction_feed(records: &[NetworkMetricRecord]) -> Vec<FeedEntry> {
    let mut rows: Vec<FeedEntry> = records
        .iter()
        .flat_map(|token| {
            let risk = classify_tier(token.risk_score);
            token.samples.iter().map(move |sample| FeedEntry {
                tx: sample.tx.clone(),
                ts: sample.ts,
                time: format_ts(sample.ts),
                amount: sample.amt,
                token: token.name.clone(),
                contract: token.contract.clone(),
                chain: token.chain.clone(),
                risk,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        rank_value(b.amount.unwrap_or(0.0)).total_cmp(&rank_value(a.amount.unwrap_or(0.0)))
    });
    rows.truncate(FEED_LIMIT);
    rows
}

/// RFC 3339 rendering of unix seconds; `-` when out of range.
pub fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

/// Sort key normalization: NaN ranks as 0 and -0.0 equals 0.0, so
/// `total_cmp` leaves ties in encounter order.
fn rank_value(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v + 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tier::RiskTier;
    use crate::model::TxSample;
    use proptest::prelude::*;

    fn record(
        contract: &str,
        name: &str,
        risk: f64,
        density: f64,
        anomaly: f64,
    ) -> NetworkMetricRecord {
        NetworkMetricRecord {
            chain: "ethereum".to_string(),
            contract: contract.to_string(),
            name: name.to_string(),
            nodes: 0,
            edges: 0,
            density: Some(density),
            assortativity: None,
            reciprocity: None,
            clustering: None,
            eff_diameter: None,
            risk_score: risk,
            anomaly_score: anomaly,
            reasons: vec![],
            neighbors: vec![],
            samples: vec![],
            graph: None,
        }
    }

    fn with_samples(mut r: NetworkMetricRecord, amounts: &[Option<f64>]) -> NetworkMetricRecord {
        r.samples = amounts
            .iter()
            .enumerate()
            .map(|(i, amt)| TxSample {
                tx: format!("{}-{}", r.contract, i),
                ts: 1_712_345_678 + i as i64,
                amt: *amt,
            })
            .collect();
        r
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(
            summarize(&[]),
            Summary {
                total: 0,
                high: 0,
                warn: 0,
                anomaly: 0,
                high_share: 0.0,
                anomaly_share: 0.0,
                avg_density: 0.0,
            }
        );
    }

    #[test]
    fn test_summarize_two_tokens() {
        let records = vec![
            record("0xA", "", 8.1, 0.02, 0.71),
            record("0xB", "", 5.0, 0.003, 0.44),
        ];
        let s = summarize(&records);
        assert_eq!(s.total, 2);
        assert_eq!(s.high, 1);
        assert_eq!(s.warn, 1);
        assert_eq!(s.anomaly, 1);
        assert_eq!(s.high_share, 50.0);
        assert_eq!(s.anomaly_share, 50.0);
        assert!((s.avg_density - 0.0115).abs() < 1e-12);
    }

    #[test]
    fn test_missing_density_counts_as_zero() {
        let mut r = record("0xA", "", 1.0, 0.0, 0.0);
        r.density = None;
        let records = vec![r, record("0xB", "", 1.0, 0.4, 0.0)];
        assert!((summarize(&records).avg_density - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_clamps_low_bucket() {
        let summary = Summary {
            total: 3,
            high: 2,
            warn: 2,
            ..Summary::default()
        };
        let buckets = distribution(&summary);
        assert_eq!(buckets[0].value, 2);
        assert_eq!(buckets[1].label, "경보");
        assert_eq!(buckets[2].kind, BucketKind::Low);
        assert_eq!(buckets[2].value, 0);
    }

    #[test]
    fn test_filter_matches_contract_or_name_case_insensitive() {
        let records = vec![
            record("0x1154...220f", "ETH-Rapid", 8.1, 0.0, 0.0),
            record("0x8a24...cd3", "ETH-Clustered", 5.0, 0.0, 0.0),
            record("0xABCD", "Other", 2.0, 0.0, 0.0),
        ];
        let rows = filter_and_sort(&records, "rapid", SortKey::RiskScore);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "ETH-Rapid");

        let rows = filter_and_sort(&records, "0xabcd", SortKey::RiskScore);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].contract, "0xABCD");

        assert_eq!(filter_and_sort(&records, "", SortKey::RiskScore).len(), 3);
    }

    #[test]
    fn test_sort_missing_field_as_zero_and_stable() {
        let mut a = record("0xA", "a", 1.0, 0.0, 0.0);
        a.eff_diameter = None;
        let mut b = record("0xB", "b", 1.0, 0.0, 0.0);
        b.eff_diameter = Some(9);
        let mut c = record("0xC", "c", 1.0, 0.0, 0.0);
        c.eff_diameter = None;
        let records = vec![a, b, c];

        let rows = filter_and_sort(&records, "", SortKey::EffDiameter);
        let order: Vec<&str> = rows.iter().map(|r| r.contract.as_str()).collect();
        assert_eq!(order, vec!["0xB", "0xA", "0xC"]);
    }

    #[test]
    fn test_top_by_risk_ties_keep_order() {
        let records = vec![
            record("0x1", "", 5.0, 0.0, 0.0),
            record("0x2", "", 9.0, 0.0, 0.0),
            record("0x3", "", 5.0, 0.0, 0.0),
            record("0x4", "", 1.0, 0.0, 0.0),
        ];
        let top: Vec<&str> = top_by_risk(&records, 3)
            .iter()
            .map(|r| r.contract.as_str())
            .collect();
        assert_eq!(top, vec!["0x2", "0x1", "0x3"]);
    }

    #[test]
    fn test_feed_merges_and_caps() {
        let records = vec![
            with_samples(
                record("0xA", "ETH-Rapid", 8.1, 0.0, 0.0),
                &[Some(93_210.4), Some(4_012.1)],
            ),
            with_samples(record("0xB", "ETH-Clustered", 5.0, 0.0, 0.0), &[Some(154.2), None]),
            with_samples(
                record("0xC", "ETH-StableFlow", 3.6, 0.0, 0.0),
                &[Some(4_210.22), Some(1_120.76), Some(73_210.11)],
            ),
        ];
        let feed = merge_transaction_feed(&records);
        assert_eq!(feed.len(), FEED_LIMIT);
        assert_eq!(feed[0].amount, Some(93_210.4));
        assert_eq!(feed[0].risk, RiskTier::High);
        assert_eq!(feed[0].token, "ETH-Rapid");
        assert_eq!(feed[1].contract, "0xC");
        assert_eq!(feed[1].risk, RiskTier::Low);
        // the sample without an amount ranks as 0 and falls off the end
        assert!(feed.iter().all(|e| e.amount.is_some()));
    }

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_ts(i64::MAX), "-");
    }

    #[test]
    fn test_aggregate_summary_ignores_query() {
        let records = vec![
            record("0xA", "alpha", 8.1, 0.02, 0.71),
            record("0xB", "beta", 5.0, 0.003, 0.44),
        ];
        let view = aggregate(&records, "alpha", SortKey::RiskScore);
        assert_eq!(view.filtered.len(), 1);
        assert_eq!(view.summary.total, 2);
        assert_eq!(view.leaders.len(), 2);
        assert_eq!(view.distribution.len(), 3);
    }

    fn arb_record() -> impl Strategy<Value = NetworkMetricRecord> {
        (
            "[a-c]{1,3}",
            0.0f64..10.0,
            0.0f64..1.0,
            0.0f64..1.0,
            proptest::collection::vec(proptest::option::of(0.0f64..100_000.0), 0..4),
        )
            .prop_map(|(name, risk, density, anomaly, amounts)| {
                let contract = format!("0x{}", name);
                with_samples(record(&contract, &name, risk, density, anomaly), &amounts)
            })
    }

    proptest! {
        #[test]
        fn prop_filter_and_sort_idempotent(
            records in proptest::collection::vec(arb_record(), 0..12),
            query in "[a-c]{0,2}",
        ) {
            let first: Vec<NetworkMetricRecord> =
                filter_and_sort(&records, &query, SortKey::RiskScore)
                    .into_iter()
                    .cloned()
                    .collect();
            let second: Vec<NetworkMetricRecord> =
                filter_and_sort(&records, &query, SortKey::RiskScore)
                    .into_iter()
                    .cloned()
                    .collect();
            prop_assert_eq!(&first, &second);
            for r in &first {
                prop_assert!(matches_query(r, &query.to_lowercase()));
            }
            for pair in first.windows(2) {
                prop_assert!(pair[0].risk_score >= pair[1].risk_score);
            }
        }

        #[test]
        fn prop_feed_bounded_and_non_increasing(
            records in proptest::collection::vec(arb_record(), 0..12),
        ) {
            let feed = merge_transaction_feed(&records);
            prop_assert!(feed.len() <= FEED_LIMIT);
            for pair in feed.windows(2) {
                prop_assert!(pair[0].amount.unwrap_or(0.0) >= pair[1].amount.unwrap_or(0.0));
            }
        }

        #[test]
        fn prop_summary_shares_bounded(records in proptest::collection::vec(arb_record(), 0..12)) {
            let s = summarize(&records);
            prop_assert!(s.high + s.warn <= s.total);
            prop_assert!((0.0..=100.0).contains(&s.high_share));
            prop_assert!((0.0..=100.0).contains(&s.anomaly_share));
            let buckets = distribution(&s);
            prop_assert_eq!(buckets.iter().map(|b| b.value).sum::<usize>(), s.total);
        }
    }
}
