pub mod engine;
pub mod rules;
pub mod tier;
pub mod types;

pub use engine::{
    aggregate, distribution, filter_and_sort, merge_transaction_feed, summarize, top_by_risk,
    FEED_LIMIT, LEADER_LIMIT,
};
pub use rules::{alerts_from_rules, evidence_badges, rule_totals, top_alerts, RuleTotals};
pub use tier::{classify_tier, RiskTier, HIGH_THRESHOLD, MED_THRESHOLD};
pub use types::{DashboardView, DistributionBucket, FeedEntry, Summary};
