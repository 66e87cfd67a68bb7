//! Spot repository port and adapters
//!
//! The engine only needs "spots inside these bounds matching these filters",
//! cancellable. Cancellation must come back as [`SpotMapError::Cancelled`] so
//! it can be told apart from a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::models::{Bounds, FilterSnapshot, Spot};
use crate::{Result, SpotMapError};

/// One page of spots plus the total number of matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpotPage {
    pub spots: Vec<Spot>,
    pub total: usize,
}

#[async_trait]
pub trait SpotRepository: Send + Sync {
    async fn fetch_spots(
        &self,
        bounds: &Bounds,
        filters: &FilterSnapshot,
        token: &CancellationToken,
    ) -> Result<SpotPage>;
}

/// Spot list held in memory, with optional simulated latency and page size
#[derive(Debug, Clone, Default)]
pub struct InMemorySpotRepository {
    spots: Vec<Spot>,
    latency: Option<Duration>,
    page_size: Option<usize>,
}

impl InMemorySpotRepository {
    #[must_use]
    pub fn new(spots: Vec<Spot>) -> Self {
        Self {
            spots,
            latency: None,
            page_size: None,
        }
    }

    /// Load a JSON array of spots
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let spots: Vec<Spot> = serde_json::from_str(&raw).map_err(|e| {
            SpotMapError::validation(format!("Invalid spot file {}: {e}", path.display()))
        })?;
        Ok(Self::new(spots))
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}

/// Name substring (case-insensitive), exact prefecture and exact type
#[must_use]
pub fn matches_filters(spot: &Spot, filters: &FilterSnapshot) -> bool {
    if let Some(term) = filters.search_term() {
        if !spot.name.to_lowercase().contains(&term.to_lowercase()) {
            return false;
        }
    }
    if let Some(prefecture) = filters.prefecture() {
        if spot.prefecture != prefecture {
            return false;
        }
    }
    if let Some(spot_type) = filters.spot_type() {
        if spot.spot_type != spot_type {
            return false;
        }
    }
    true
}

#[async_trait]
impl SpotRepository for InMemorySpotRepository {
    #[tracing::instrument(name = "fetch_spots_memory", level = "debug", skip(self, token))]
    async fn fetch_spots(
        &self,
        bounds: &Bounds,
        filters: &FilterSnapshot,
        token: &CancellationToken,
    ) -> Result<SpotPage> {
        if let Some(latency) = self.latency {
            tokio::select! {
                () = token.cancelled() => return Err(SpotMapError::Cancelled),
                () = tokio::time::sleep(latency) => {}
            }
        }
        if token.is_cancelled() {
            return Err(SpotMapError::Cancelled);
        }

        let matching: Vec<&Spot> = self
            .spots
            .iter()
            .filter(|spot| bounds.contains_coordinate(&spot.coordinates))
            .filter(|spot| matches_filters(spot, filters))
            .collect();
        let total = matching.len();
        let limit = self.page_size.unwrap_or(total);
        let spots: Vec<Spot> = matching.into_iter().take(limit).cloned().collect();

        debug!(returned = spots.len(), total, "In-memory fetch complete");
        Ok(SpotPage { spots, total })
    }
}

#[cfg(feature = "http")]
pub use http::HttpSpotRepository;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::RepositoryConfig;
    use reqwest::Client;

    /// Fetches spots from `GET {base_url}/spots`
    pub struct HttpSpotRepository {
        client: Client,
        base_url: String,
    }

    impl HttpSpotRepository {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(concat!("spotmap/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| SpotMapError::transport(format!("Failed to create HTTP client: {e}")))?;
            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            })
        }

        pub fn from_config(config: &RepositoryConfig) -> Result<Self> {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| SpotMapError::config("Repository base URL is not configured"))?;
            Self::new(
                base_url,
                Duration::from_secs(u64::from(config.timeout_seconds)),
            )
        }

        /// Request URL with bounds first and filters in key order
        #[must_use]
        pub fn spots_url(&self, bounds: &Bounds, filters: &FilterSnapshot) -> String {
            let mut url = format!(
                "{}/spots?north={}&south={}&east={}&west={}",
                self.base_url, bounds.north, bounds.south, bounds.east, bounds.west
            );
            for (key, value) in filters.iter() {
                url.push('&');
                url.push_str(&urlencoding::encode(key));
                url.push('=');
                url.push_str(&urlencoding::encode(value));
            }
            url
        }

        async fn request(&self, url: String) -> Result<SpotPage> {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| SpotMapError::transport(format!("Spot request failed: {e}")))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(SpotMapError::transport(format!(
                    "Spot API error {status}: {body}"
                )));
            }

            response
                .json::<SpotPage>()
                .await
                .map_err(|e| SpotMapError::transport(format!("Failed to parse spot response: {e}")))
        }
    }

    #[async_trait]
    impl SpotRepository for HttpSpotRepository {
        #[tracing::instrument(name = "fetch_spots_http", level = "debug", skip(self, token))]
        async fn fetch_spots(
            &self,
            bounds: &Bounds,
            filters: &FilterSnapshot,
            token: &CancellationToken,
        ) -> Result<SpotPage> {
            let url = self.spots_url(bounds, filters);
            debug!(%url, "Requesting spots");
            // Dropping the request future aborts the connection.
            tokio::select! {
                () = token.cancelled() => Err(SpotMapError::Cancelled),
                page = self.request(url) => page,
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use crate::models::filters::{PREFECTURE_KEY, SEARCH_KEY, SPOT_TYPE_KEY};

    fn spot(id: &str, name: &str, prefecture: &str, kind: &str, lng: f64, lat: f64) -> Spot {
        Spot::new(
            id,
            name,
            prefecture,
            kind,
            Coordinate {
                longitude: lng,
                latitude: lat,
            },
        )
    }

    fn repo() -> InMemorySpotRepository {
        InMemorySpotRepository::new(vec![
            spot("1", "Lake Suwa Camp", "長野県", "campground", 138.1, 36.0),
            spot("2", "道の駅 信州", "長野県", "roadside_station", 138.2, 36.1),
            spot("3", "Kawabe RV Park", "岐阜県", "rv_park", 137.0, 35.5),
            spot("4", "Far North", "北海道", "campground", 141.3, 43.0),
        ])
    }

    fn central_japan() -> Bounds {
        Bounds::new(37.0, 35.0, 139.0, 136.5).unwrap()
    }

    #[tokio::test]
    async fn test_filters_by_bounds() {
        let page = repo()
            .fetch_spots(&central_japan(), &FilterSnapshot::new(), &CancellationToken::new(1))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.spots.iter().all(|s| s.id != "4"));
    }

    #[tokio::test]
    async fn test_filters_by_snapshot() {
        let token = CancellationToken::new(1);
        let by_pref = FilterSnapshot::new().with(PREFECTURE_KEY, "長野県");
        let page = repo().fetch_spots(&central_japan(), &by_pref, &token).await.unwrap();
        assert_eq!(page.total, 2);

        let by_search = FilterSnapshot::new().with(SEARCH_KEY, "lake");
        let page = repo().fetch_spots(&central_japan(), &by_search, &token).await.unwrap();
        assert_eq!(page.spots.len(), 1);
        assert_eq!(page.spots[0].id, "1");

        let by_type = FilterSnapshot::new().with(SPOT_TYPE_KEY, "rv_park");
        let page = repo().fetch_spots(&central_japan(), &by_type, &token).await.unwrap();
        assert_eq!(page.spots[0].id, "3");
    }

    #[tokio::test]
    async fn test_page_size_keeps_total() {
        let page = repo()
            .with_page_size(1)
            .fetch_spots(&central_japan(), &FilterSnapshot::new(), &CancellationToken::new(1))
            .await
            .unwrap();
        assert_eq!(page.spots.len(), 1);
        assert_eq!(page.total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_latency() {
        let repo = repo().with_latency(Duration::from_secs(10));
        let token = CancellationToken::new(1);
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
            })
        };
        let result = repo
            .fetch_spots(&central_japan(), &FilterSnapshot::new(), &token)
            .await;
        canceller.await.unwrap();
        assert!(matches!(result, Err(SpotMapError::Cancelled)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spots.json");
        std::fs::write(
            &path,
            r#"[{"id":"9","name":"Test","coordinates":{"longitude":138.0,"latitude":36.0}}]"#,
        )
        .unwrap();
        let repo = InMemorySpotRepository::from_json_file(&path).unwrap();
        assert_eq!(repo.len(), 1);

        std::fs::write(&path, "not json").unwrap();
        assert!(InMemorySpotRepository::from_json_file(&path).is_err());
    }
}
