//! Binds fetches to the spot repository and the UI sink

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::models::{Bounds, FilterSnapshot};
use crate::repository::{SpotPage, SpotRepository};
use crate::sink::ViewportSink;
use crate::{Result, SpotMapError};

pub struct DataFetchOrchestrator {
    repository: Arc<dyn SpotRepository>,
    sink: Arc<dyn ViewportSink>,
    in_flight: Mutex<usize>,
}

/// Holds the loading flag up until dropped, whichever way the fetch ended.
/// Guards nest: the flag clears when the last one goes.
pub struct LoadingGuard<'a> {
    orchestrator: &'a DataFetchOrchestrator,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.finish_loading();
    }
}

impl DataFetchOrchestrator {
    pub fn new(repository: Arc<dyn SpotRepository>, sink: Arc<dyn ViewportSink>) -> Self {
        Self {
            repository,
            sink,
            in_flight: Mutex::new(0),
        }
    }

    /// Fetch spots for `bounds`.
    ///
    /// A cancelled token turns any outcome into [`SpotMapError::Cancelled`]. Other
    /// failures are logged and returned without touching the sink: the caller
    /// decides under its own lock whether the fetch is still current and then
    /// calls [`Self::report_error`] or [`Self::deliver`].
    pub async fn load(
        &self,
        bounds: Bounds,
        filters: FilterSnapshot,
        token: CancellationToken,
    ) -> Result<SpotPage> {
        let _loading = self.begin_loading();

        let result = self.repository.fetch_spots(&bounds, &filters, &token).await;

        match result {
            Ok(_) if token.is_cancelled() => {
                debug!(generation = token.generation(), "Fetch finished after supersession");
                Err(SpotMapError::Cancelled)
            }
            Ok(page) => Ok(page),
            Err(err) if err.is_cancelled() || token.is_cancelled() => {
                debug!(generation = token.generation(), "Fetch cancelled");
                Err(SpotMapError::Cancelled)
            }
            Err(err) => {
                warn!(generation = token.generation(), error = %err, ?bounds, "Fetch failed");
                Err(err)
            }
        }
    }

    /// Hand an accepted page to the sink
    pub fn deliver(&self, page: SpotPage) {
        self.sink.on_spots_loaded(page.spots, page.total);
    }

    /// Single user-facing notification for a failed fetch or geolocation lookup.
    /// Cancellation is not a failure and is dropped.
    pub fn report_error(&self, err: &SpotMapError) {
        if err.is_cancelled() {
            return;
        }
        self.sink.on_error(err.user_message());
    }

    #[must_use]
    pub fn begin_loading(&self) -> LoadingGuard<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight += 1;
        if *in_flight == 1 {
            self.sink.on_loading_changed(true);
        }
        LoadingGuard { orchestrator: self }
    }

    fn finish_loading(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.sink.on_loading_changed(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, Spot};
    use crate::repository::InMemorySpotRepository;
    use crate::sink::{ChannelSink, SinkEvent};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingRepository;

    #[async_trait]
    impl SpotRepository for FailingRepository {
        async fn fetch_spots(
            &self,
            _bounds: &Bounds,
            _filters: &FilterSnapshot,
            _token: &CancellationToken,
        ) -> Result<SpotPage> {
            Err(SpotMapError::transport("connection refused"))
        }
    }

    fn bounds() -> Bounds {
        Bounds::new(36.0, 35.0, 140.0, 139.0).unwrap()
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SinkEvent>) -> Vec<SinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_successful_load_toggles_loading() {
        let repo = InMemorySpotRepository::new(vec![Spot::new(
            "1",
            "Camp",
            "千葉県",
            "campground",
            Coordinate {
                longitude: 139.5,
                latitude: 35.5,
            },
        )]);
        let (sink, mut rx) = ChannelSink::new();
        let orchestrator = DataFetchOrchestrator::new(Arc::new(repo), Arc::new(sink));

        let page = orchestrator
            .load(bounds(), FilterSnapshot::new(), CancellationToken::new(1))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        orchestrator.deliver(page);

        let events = drain(&mut rx);
        assert_eq!(events[0], SinkEvent::LoadingChanged { loading: true });
        assert_eq!(events[1], SinkEvent::LoadingChanged { loading: false });
        assert!(matches!(events[2], SinkEvent::SpotsLoaded { total: 1, .. }));
    }

    #[tokio::test]
    async fn test_failure_is_returned_not_reported() {
        let (sink, mut rx) = ChannelSink::new();
        let orchestrator =
            DataFetchOrchestrator::new(Arc::new(FailingRepository), Arc::new(sink));

        let result = orchestrator
            .load(bounds(), FilterSnapshot::new(), CancellationToken::new(1))
            .await;
        let Err(err) = result else {
            panic!("expected a transport error");
        };
        assert!(matches!(err, SpotMapError::Transport { .. }));
        assert_eq!(
            drain(&mut rx),
            vec![
                SinkEvent::LoadingChanged { loading: true },
                SinkEvent::LoadingChanged { loading: false },
            ]
        );

        orchestrator.report_error(&err);
        assert_eq!(
            drain(&mut rx),
            vec![SinkEvent::Error {
                message: err.user_message()
            }]
        );
    }

    #[test]
    fn test_report_error_ignores_cancellation() {
        let (sink, mut rx) = ChannelSink::new();
        let orchestrator =
            DataFetchOrchestrator::new(Arc::new(FailingRepository), Arc::new(sink));
        orchestrator.report_error(&SpotMapError::Cancelled);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_outer_guard_keeps_loading_until_delivered() {
        let (sink, mut rx) = ChannelSink::new();
        let orchestrator =
            DataFetchOrchestrator::new(Arc::new(InMemorySpotRepository::default()), Arc::new(sink));

        {
            let _loading = orchestrator.begin_loading();
            let page = orchestrator
                .load(bounds(), FilterSnapshot::new(), CancellationToken::new(1))
                .await
                .unwrap();
            orchestrator.deliver(page);
        }

        assert_eq!(
            drain(&mut rx),
            vec![
                SinkEvent::LoadingChanged { loading: true },
                SinkEvent::SpotsLoaded {
                    spots: Vec::new(),
                    total: 0
                },
                SinkEvent::LoadingChanged { loading: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_after_cancellation_is_silent() {
        let (sink, mut rx) = ChannelSink::new();
        let orchestrator =
            DataFetchOrchestrator::new(Arc::new(FailingRepository), Arc::new(sink));
        let token = CancellationToken::new(1);
        token.cancel();

        let result = orchestrator.load(bounds(), FilterSnapshot::new(), token).await;
        assert!(matches!(result, Err(SpotMapError::Cancelled)));
        assert!(
            drain(&mut rx)
                .iter()
                .all(|e| !matches!(e, SinkEvent::Error { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_stays_on_while_any_fetch_is_in_flight() {
        let repo = InMemorySpotRepository::default().with_latency(Duration::from_millis(100));
        let (sink, mut rx) = ChannelSink::new();
        let orchestrator = Arc::new(DataFetchOrchestrator::new(Arc::new(repo), Arc::new(sink)));

        let first = CancellationToken::new(1);
        let slow = {
            let orchestrator = orchestrator.clone();
            let first = first.clone();
            tokio::spawn(async move {
                orchestrator.load(bounds(), FilterSnapshot::new(), first).await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.cancel();
        let second = orchestrator
            .load(bounds(), FilterSnapshot::new(), CancellationToken::new(2))
            .await;
        assert!(second.is_ok());
        assert!(matches!(slow.await.unwrap(), Err(SpotMapError::Cancelled)));

        let loading: Vec<bool> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::LoadingChanged { loading } => Some(loading),
                _ => None,
            })
            .collect();
        assert_eq!(loading.first(), Some(&true));
        assert_eq!(loading.last(), Some(&false));
        assert_eq!(loading.iter().filter(|l| !**l).count(), 1);
    }
}
