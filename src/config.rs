use serde::Deserialize;

use crate::graph::{CameraBounds, RenderOptions};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ============================================================
// Dataset Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: String,
    pub default_chain: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            default_chain: None,
        }
    }
}

fn default_dataset_path() -> String {
    "data/networks.json".to_string()
}

// ============================================================
// Feeds Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct FeedsConfig {
    /// Directory relative locators are read from.
    #[serde(default = "default_feeds_root")]
    pub root: String,
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
    #[serde(default = "default_alerts_path")]
    pub alerts_path: String,
    /// `{address}` is replaced with the requested address.
    #[serde(default = "default_detail_path")]
    pub detail_path: String,
    #[serde(default = "default_detail_fallback_path")]
    pub detail_fallback_path: String,
    #[serde(default = "default_alerts_limit")]
    pub alerts_limit: usize,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            root: default_feeds_root(),
            rules_path: default_rules_path(),
            alerts_path: default_alerts_path(),
            detail_path: default_detail_path(),
            detail_fallback_path: default_detail_fallback_path(),
            alerts_limit: default_alerts_limit(),
        }
    }
}

fn default_feeds_root() -> String {
    ".".to_string()
}

fn default_rules_path() -> String {
    "result/tracex_rules_output.json".to_string()
}

fn default_alerts_path() -> String {
    "result/alerts_today.json".to_string()
}

fn default_detail_path() -> String {
    "result/address_detail_{address}.json".to_string()
}

fn default_detail_fallback_path() -> String {
    "result/address_detail_demo.json".to_string()
}

fn default_alerts_limit() -> usize {
    5
}

// ============================================================
// Graph Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    #[serde(default = "default_min_camera_ratio")]
    pub min_camera_ratio: f64,
    #[serde(default = "default_max_camera_ratio")]
    pub max_camera_ratio: f64,
    #[serde(default = "default_layout_radius")]
    pub layout_radius: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_camera_ratio: default_min_camera_ratio(),
            max_camera_ratio: default_max_camera_ratio(),
            layout_radius: default_layout_radius(),
        }
    }
}

impl GraphConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            camera: CameraBounds {
                min_ratio: self.min_camera_ratio,
                max_ratio: self.max_camera_ratio,
            },
            layout_radius: self.layout_radius,
        }
    }
}

fn default_min_camera_ratio() -> f64 {
    0.5
}

fn default_max_camera_ratio() -> f64 {
    1.5
}

fn default_layout_radius() -> f64 {
    1.0
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
    /// Served under `/result` when set.
    pub static_dir: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            host: "0.0.0.0".to_string(),
            static_dir: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.dataset.path.trim().is_empty() {
            return Err(eyre::eyre!("dataset.path must not be empty"));
        }
        if self.feeds.alerts_limit == 0 {
            return Err(eyre::eyre!("feeds.alerts_limit must be at least 1"));
        }
        let graph = &self.graph;
        for (name, value) in [
            ("min_camera_ratio", graph.min_camera_ratio),
            ("max_camera_ratio", graph.max_camera_ratio),
            ("layout_radius", graph.layout_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(eyre::eyre!("graph.{} must be a positive number, got {}", name, value));
            }
        }
        if graph.min_camera_ratio > graph.max_camera_ratio {
            return Err(eyre::eyre!(
                "graph.min_camera_ratio ({}) exceeds graph.max_camera_ratio ({})",
                graph.min_camera_ratio,
                graph.max_camera_ratio
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[dataset]
path = "data/networks.json"
default_chain = "Ethereum"

[feeds]
root = "/srv/tracex"
alerts_limit = 10

[graph]
max_camera_ratio = 2.0

[api]
port = 8080
static_dir = "result"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dataset.default_chain.as_deref(), Some("Ethereum"));
        assert_eq!(config.feeds.root, "/srv/tracex");
        assert_eq!(config.feeds.alerts_limit, 10);
        assert_eq!(config.feeds.alerts_path, "result/alerts_today.json"); // default
        assert_eq!(config.graph.min_camera_ratio, 0.5); // default
        assert_eq!(config.graph.max_camera_ratio, 2.0);
        assert_eq!(config.api.port, 8080);
        assert!(config.api.enabled); // default
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.dataset.path, "data/networks.json");
        assert_eq!(config.feeds.alerts_limit, 5);
        assert_eq!(config.graph.render_options().camera.max_ratio, 1.5);
        assert!(config.api.static_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_inverted_camera_ratios() {
        let config = Config {
            graph: GraphConfig {
                min_camera_ratio: 2.0,
                max_camera_ratio: 1.0,
                layout_radius: 1.0,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_non_positive_ratio() {
        let config = Config {
            graph: GraphConfig {
                min_camera_ratio: 0.0,
                ..GraphConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_alerts_limit() {
        let config = Config {
            feeds: FeedsConfig {
                alerts_limit: 0,
                ..FeedsConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_dataset_path() {
        let config = Config {
            dataset: DatasetConfig {
                path: " ".to_string(),
                default_chain: None,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
