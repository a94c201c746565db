use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;

use super::error::{LoadError, TransportCode};

/// Fetches the raw body of a JSON document by locator.
pub trait JsonSource: Send + Sync {
    fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

/// Resolves `http://` / `https://` locators over the network and anything
/// else as a path under `root`.
pub struct FeedSource {
    client: Client,
    root: PathBuf,
}

impl FeedSource {
    pub fn new(root: impl Into<PathBuf>) -> eyre::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| eyre::eyre!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            root: root.into(),
        })
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| LoadError::unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LoadError::unreachable(e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn fetch_file(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(locator)?;
        tokio::fs::read(&path).await.map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                TransportCode::NotFound
            } else {
                TransportCode::Unreachable
            };
            LoadError::Transport {
                status: None,
                code,
                message: format!("{}: {}", path.display(), e),
            }
        })
    }

    /// Join a relative locator onto `root`, refusing anything that climbs out.
    fn resolve(&self, locator: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(locator.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(LoadError::Transport {
                status: None,
                code: TransportCode::ClientError,
                message: format!("locator '{}' escapes the feed root", locator),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl JsonSource for FeedSource {
    fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            self.fetch_http(locator).boxed()
        } else {
            self.fetch_file(locator).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_parent_components() {
        let source = FeedSource::new("/srv/feeds").unwrap();
        assert_eq!(
            source.resolve("result/alerts_today.json").unwrap(),
            PathBuf::from("/srv/feeds/result/alerts_today.json")
        );
        assert_eq!(
            source.resolve("/result/x.json").unwrap(),
            PathBuf::from("/srv/feeds/result/x.json")
        );
        assert!(source.resolve("../etc/passwd").is_err());
        assert!(source.resolve("result/../../x").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = std::env::temp_dir().join("tracex-source-missing");
        let source = FeedSource::new(&dir).unwrap();
        let err = source.fetch("nope.json").await.unwrap_err();
        match err {
            LoadError::Transport { code, status, .. } => {
                assert_eq!(code, TransportCode::NotFound);
                assert_eq!(status, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reads_file_under_root() {
        let dir = std::env::temp_dir().join("tracex-source-read");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("alerts.json"), b"[]").unwrap();
        let source = FeedSource::new(&dir).unwrap();
        assert_eq!(source.fetch("alerts.json").await.unwrap(), b"[]".to_vec());
    }
}
