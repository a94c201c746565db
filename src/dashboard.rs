use std::sync::Arc;

use thiserror::Error;

use crate::aggregate::{aggregate, alerts_from_rules, DashboardView};
use crate::config::FeedsConfig;
use crate::graph::{
    BuildReport, GraphAdapter, GraphError, GraphScene, MountTarget, RenderOptions, SceneRenderer,
};
use crate::loader::{AsyncLoader, Batch, JsonSource, LoadState};
use crate::model::{
    AddressDetailRecord, AlertRecord, NetworkMetricRecord, RuleEvaluationRecord, SortKey,
};
use crate::panels::Panels;
use crate::store::{Dataset, RecordStore};

/// Mount target of the selected token's graph.
pub const DETAIL_MOUNT: &str = "token-detail";

/// Presentation state over the in-memory dataset: active chain, search
/// query, sort key and the selected token with its rendered graph.
pub struct Dashboard {
    dataset: Dataset,
    store: RecordStore,
    query: String,
    sort_key: SortKey,
    selected: Option<String>,
    view: Arc<DashboardView>,
    graphs: GraphAdapter<SceneRenderer>,
    mount: MountTarget,
}

impl Dashboard {
    /// Start on `default_chain` when given, otherwise the first chain.
    pub fn new(dataset: Dataset, options: RenderOptions, default_chain: Option<&str>) -> Self {
        let mut dashboard = Self {
            dataset,
            store: RecordStore::empty(),
            query: String::new(),
            sort_key: SortKey::default(),
            selected: None,
            view: Arc::new(DashboardView::default()),
            graphs: GraphAdapter::new(SceneRenderer::new(), options),
            mount: MountTarget::new(DETAIL_MOUNT),
        };
        let initial = default_chain
            .map(str::to_string)
            .or_else(|| dashboard.dataset.chains().first().cloned());
        match initial {
            Some(chain) => dashboard.select_chain(&chain),
            None => dashboard.recompute(),
        }
        dashboard
    }

    pub fn chains(&self) -> &[String] {
        self.dataset.chains()
    }

    pub fn chain(&self) -> &str {
        self.store.chain()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Swap in the chain's snapshot. The selection and its graph do not
    /// survive a chain change. Unknown chains give an empty snapshot.
    pub fn select_chain(&mut self, chain: &str) {
        if !self.dataset.chains().iter().any(|c| c == chain) {
            tracing::warn!(%chain, "Unknown chain selected, showing empty snapshot");
        }
        self.store.replace(chain, self.dataset.records(chain));
        self.clear_selection();
        self.recompute();
    }

    pub fn set_query(&mut self, query: &str) {
        if self.query != query {
            self.query = query.to_string();
            self.recompute();
        }
    }

    pub fn set_sort(&mut self, sort_key: SortKey) {
        if self.sort_key != sort_key {
            self.sort_key = sort_key;
            self.recompute();
        }
    }

    /// The view for the current snapshot, query and sort key.
    pub fn view(&self) -> Arc<DashboardView> {
        Arc::clone(&self.view)
    }

    pub fn selected(&self) -> Option<&NetworkMetricRecord> {
        self.selected.as_deref().and_then(|c| self.store.find(c))
    }

    /// Select a token and render its graph on the detail mount. Returns
    /// `Ok(None)` when the token is unknown or carries no graph.
    pub fn select_entity(&mut self, contract: &str) -> Result<Option<GraphScene>, GraphError> {
        let Some(record) = self.store.find(contract) else {
            tracing::debug!(
                %contract,
                chain = self.store.chain(),
                "Selected token not in snapshot"
            );
            self.clear_selection();
            return Ok(None);
        };
        let graph = record.graph.clone();
        self.selected = Some(record.contract.clone());

        let handle = self.graphs.build(graph.as_ref(), &self.mount)?;
        Ok(handle.and_then(|h| h.scene()))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.graphs.release(&self.mount);
    }

    /// Scene currently on the detail mount.
    pub fn scene(&self) -> Option<GraphScene> {
        self.graphs.handle(&self.mount).and_then(|h| h.scene())
    }

    /// What the last build on the detail mount skipped or laid out.
    pub fn graph_report(&self) -> Option<BuildReport> {
        self.graphs.report(&self.mount)
    }

    pub fn zoom(&mut self, factor: f64) -> Option<f64> {
        self.graphs.handle_mut(&self.mount).map(|h| h.zoom(factor))
    }

    pub fn live_graphs(&self) -> usize {
        self.graphs.renderer().live_instances()
    }

    fn recompute(&mut self) {
        let snapshot = self.store.snapshot();
        self.view = Arc::new(aggregate(&snapshot, &self.query, self.sort_key));
        tracing::debug!(
            chain = self.store.chain(),
            query = %self.query,
            sort = %self.sort_key,
            shown = self.view.filtered.len(),
            "Dashboard view recomputed"
        );
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid address '{0}': expected 0x followed by hex digits")]
pub struct InvalidAddress(pub String);

/// Accept `0x` followed by an even number of hex digits.
pub fn validate_address(address: &str) -> Result<&str, InvalidAddress> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .filter(|d| !d.is_empty())
        .ok_or_else(|| InvalidAddress(address.to_string()))?;
    hex::decode(digits).map_err(|_| InvalidAddress(address.to_string()))?;
    Ok(address)
}

/// The three externally produced feeds, each behind its own loader.
pub struct Feeds {
    rules: AsyncLoader<Batch<RuleEvaluationRecord>>,
    alerts: AsyncLoader<Batch<AlertRecord>>,
    detail: AsyncLoader<AddressDetailRecord>,
    config: FeedsConfig,
    panels: Panels,
}

impl Feeds {
    pub fn new(source: Arc<dyn JsonSource>, config: FeedsConfig, panels: Panels) -> Self {
        Self {
            rules: AsyncLoader::new(Arc::clone(&source)),
            alerts: AsyncLoader::new(Arc::clone(&source)),
            detail: AsyncLoader::new(source),
            config,
            panels,
        }
    }

    pub fn config(&self) -> &FeedsConfig {
        &self.config
    }

    pub fn panels(&self) -> &Panels {
        &self.panels
    }

    pub fn rules(&self) -> &AsyncLoader<Batch<RuleEvaluationRecord>> {
        &self.rules
    }

    pub fn alerts(&self) -> &AsyncLoader<Batch<AlertRecord>> {
        &self.alerts
    }

    pub fn detail(&self) -> &AsyncLoader<AddressDetailRecord> {
        &self.detail
    }

    pub fn rules_locator<'a>(&'a self, path: Option<&'a str>) -> &'a str {
        path.unwrap_or(&self.config.rules_path)
    }

    pub fn alerts_locator<'a>(&'a self, path: Option<&'a str>) -> &'a str {
        path.unwrap_or(&self.config.alerts_path)
    }

    /// Per-address document locator for an already validated address.
    pub fn detail_locator(&self, address: &str) -> String {
        self.config.detail_path.replace("{address}", address)
    }

    pub async fn load_rules(&self, path: Option<&str>) -> LoadState<Batch<RuleEvaluationRecord>> {
        self.rules.load(self.rules_locator(path)).await
    }

    pub async fn load_alerts(&self, path: Option<&str>) -> LoadState<Batch<AlertRecord>> {
        self.alerts.load(self.alerts_locator(path)).await
    }

    /// Alerts derived from the rules feed: grouped per address and ranked.
    pub async fn alerts_from_rules(
        &self,
        path: Option<&str>,
        k: usize,
    ) -> LoadState<Batch<AlertRecord>> {
        match self.load_rules(path).await {
            LoadState::Ready(batch) => LoadState::Ready(Arc::new(Batch {
                records: alerts_from_rules(&batch.records, k),
                dropped: batch.dropped,
            })),
            LoadState::Failed(err) => LoadState::Failed(err),
            LoadState::Loading => LoadState::Loading,
        }
    }

    /// Detail for `address`, falling back to the demo document when the
    /// per-address one cannot be loaded.
    pub async fn load_detail(
        &self,
        address: &str,
    ) -> Result<LoadState<AddressDetailRecord>, InvalidAddress> {
        let address = validate_address(address)?;
        let locator = self.detail_locator(address);
        Ok(self
            .detail
            .load_with_fallback(&locator, &self.config.detail_fallback_path)
            .await)
    }

    /// Detail from an explicit document path, without fallback.
    pub async fn load_detail_at(&self, path: &str) -> LoadState<AddressDetailRecord> {
        self.detail.load(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadError;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const DATASET: &str = r#"{
        "Ethereum": [
            {"chain": "Ethereum", "contract": "0xaaa", "name": "Alpha", "riskScore": 8.1,
             "anomalyScore": 0.7, "density": 0.02,
             "graph": {"nodes": [{"id": "n1", "label": "N1"}, {"id": "n2", "label": "N2"}],
                       "edges": [{"source": "n1", "target": "n2"}]}},
            {"chain": "Ethereum", "contract": "0xbbb", "name": "Beta", "riskScore": 3.0,
             "anomalyScore": 0.1, "density": 0.003}
        ],
        "BSC": [
            {"chain": "BSC", "contract": "0xccc", "name": "Gamma", "riskScore": 5.0,
             "anomalyScore": 0.6}
        ]
    }"#;

    fn dashboard() -> Dashboard {
        let dataset = Dataset::from_json(DATASET).unwrap();
        Dashboard::new(dataset, RenderOptions::default(), None)
    }

    #[test]
    fn test_starts_on_first_chain() {
        let d = dashboard();
        assert_eq!(d.chain(), "Ethereum");
        assert_eq!(d.chains(), ["Ethereum".to_string(), "BSC".to_string()]);
        assert_eq!(d.view().summary.total, 2);
        assert_eq!(d.view().summary.high, 1);
    }

    #[test]
    fn test_query_and_sort_recompute_view() {
        let mut d = dashboard();
        d.set_query("BET");
        assert_eq!(d.view().filtered.len(), 1);
        assert_eq!(d.view().summary.total, 2);

        d.set_query("");
        d.set_sort(SortKey::Density);
        let view = d.view();
        assert_eq!(view.filtered[0].contract, "0xaaa");
        assert_eq!(view.filtered[1].contract, "0xbbb");
    }

    #[test]
    fn test_chain_change_tears_down_selection() {
        let mut d = dashboard();
        let scene = d.select_entity("0xaaa").unwrap().unwrap();
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(d.live_graphs(), 1);

        d.select_chain("BSC");
        assert!(d.selected().is_none());
        assert!(d.scene().is_none());
        assert_eq!(d.live_graphs(), 0);
        assert_eq!(d.view().summary.total, 1);
    }

    #[test]
    fn test_unknown_chain_is_empty_not_error() {
        let mut d = dashboard();
        d.select_chain("Solana");
        assert_eq!(d.view().summary.total, 0);
        assert!(d.view().leaders.is_empty());
    }

    #[test]
    fn test_entity_without_graph_leaves_mount_empty() {
        let mut d = dashboard();
        d.select_entity("0xaaa").unwrap();
        assert!(d.select_entity("0xbbb").unwrap().is_none());
        assert_eq!(d.selected().map(|r| r.name.as_str()), Some("Beta"));
        assert_eq!(d.live_graphs(), 0);
        assert!(d.select_entity("0xmissing").unwrap().is_none());
        assert!(d.selected().is_none());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0xAbCdEf0123456789abcdef0123456789ABCDEF01").is_ok());
        assert!(validate_address("AbCd").is_err());
        assert!(validate_address("0x").is_err());
        assert!(validate_address("0xzz").is_err());
        assert!(validate_address("0x../../etc").is_err());
    }

    /// Serves fixed bodies and records every locator asked for.
    struct MapSource {
        bodies: HashMap<String, Vec<u8>>,
        asked: Mutex<Vec<String>>,
    }

    impl JsonSource for MapSource {
        fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
            if let Ok(mut asked) = self.asked.lock() {
                asked.push(locator.to_string());
            }
            let result = self
                .bodies
                .get(locator)
                .cloned()
                .ok_or_else(|| LoadError::status(404, "Not Found"));
            async move { result }.boxed()
        }
    }

    fn feeds(bodies: &[(&str, &str)]) -> (Arc<MapSource>, Feeds) {
        let source = Arc::new(MapSource {
            bodies: bodies
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
            asked: Mutex::new(Vec::new()),
        });
        let feeds = Feeds::new(source.clone(), FeedsConfig::default(), Panels::new());
        (source, feeds)
    }

    const DEMO_DETAIL: &str = r#"{"address": "0xdemo", "chain": "ethereum",
        "analyzed_at": "2025-01-01T00:00:00Z", "scores": {"total": 50},
        "evidence": {"mixer": true}, "rules": [], "tx_recent": []}"#;

    #[tokio::test]
    async fn test_detail_falls_back_to_demo() {
        let (source, feeds) = feeds(&[("result/address_detail_demo.json", DEMO_DETAIL)]);
        let state = feeds.load_detail("0xabcd").await.unwrap();
        assert_eq!(state.data().unwrap().address, "0xdemo");
        assert_eq!(
            *source.asked.lock().unwrap(),
            vec![
                "result/address_detail_0xabcd.json".to_string(),
                "result/address_detail_demo.json".to_string()
            ]
        );
    }

    /// Holds back one locator until the test opens its gate.
    struct HeldSource {
        held: String,
        gate: tokio::sync::Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
        inner: MapSource,
    }

    impl JsonSource for HeldSource {
        fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
            async move {
                if locator == self.held {
                    let gate = self.gate.lock().await.take();
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                }
                self.inner.fetch(locator).await
            }
            .boxed()
        }
    }

    fn detail_for(address: &str) -> String {
        format!(
            r#"{{"address": "{}", "chain": "ethereum", "analyzed_at": "2025-01-01T00:00:00Z",
                "scores": {{"total": 10}}, "evidence": {{}}, "rules": [], "tx_recent": []}}"#,
            address
        )
    }

    #[tokio::test]
    async fn test_overlapping_detail_requests_keep_their_own_address() {
        let (release, gate) = tokio::sync::oneshot::channel();
        let source = HeldSource {
            held: "result/address_detail_0xaa.json".to_string(),
            gate: tokio::sync::Mutex::new(Some(gate)),
            inner: MapSource {
                bodies: [("0xaa", detail_for("0xaa")), ("0xbb", detail_for("0xbb"))]
                    .into_iter()
                    .map(|(address, body)| {
                        let locator = format!("result/address_detail_{}.json", address);
                        (locator, body.into_bytes())
                    })
                    .collect(),
                asked: Mutex::new(Vec::new()),
            },
        };
        let feeds = Feeds::new(Arc::new(source), FeedsConfig::default(), Panels::new());

        let first = feeds.load_detail("0xaa");
        let second = async {
            let state = feeds.load_detail("0xbb").await;
            let _ = release.send(());
            state
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().data().unwrap().address, "0xaa");
        assert_eq!(second.unwrap().data().unwrap().address, "0xbb");
        assert_eq!(feeds.detail().state().data().unwrap().address, "0xbb");
    }

    #[tokio::test]
    async fn test_invalid_address_never_fetches() {
        let (source, feeds) = feeds(&[]);
        assert!(feeds.load_detail("../secret").await.is_err());
        assert!(source.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alerts_derived_from_rules() {
        let rules = r#"[
            {"address": "0xAA", "total_risk_score": 2.0, "compliance_score": 1.0},
            {"address": "0xaa", "total_risk_score": 3.0, "exposure_score": 1.0},
            {"address": "0xbb", "total_risk_score": 9.0}
        ]"#;
        let (_, feeds) = feeds(&[("result/tracex_rules_output.json", rules)]);
        let state = feeds.alerts_from_rules(None, 5).await;
        let alerts = &state.data().unwrap().records;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].address, "0xbb");
        assert_eq!(alerts[1].address, "0xaa");
        assert_eq!(alerts[1].score, 5.0);
    }
}
