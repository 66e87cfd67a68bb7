//! Initial viewport from the user's position

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::{Bounds, Coordinate};
use crate::orchestrator::DataFetchOrchestrator;
use crate::{Result, SpotMapError};

#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate>;
}

/// Always answers with the same position
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocation(pub Coordinate);

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self) -> Result<Coordinate> {
        Ok(self.0)
    }
}

/// Stands in for a platform without location access
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGeolocation;

#[async_trait]
impl GeolocationProvider for UnavailableGeolocation {
    async fn current_position(&self) -> Result<Coordinate> {
        Err(SpotMapError::geolocation("Location services are unavailable"))
    }
}

/// Bounds of `span_deg` degrees around the user's position.
///
/// Any failure, including an out-of-range position, is reported through the
/// orchestrator's error channel and yields `None`; the caller keeps whatever
/// viewport it already has.
pub async fn seed_viewport(
    provider: &dyn GeolocationProvider,
    orchestrator: &DataFetchOrchestrator,
    span_deg: f64,
) -> Option<Bounds> {
    let seeded = match provider.current_position().await {
        Ok(position) => position
            .validate()
            .and_then(|()| Bounds::around(position, span_deg)),
        Err(err) => Err(err),
    };

    match seeded {
        Ok(bounds) => {
            debug!(?bounds, "Seeded viewport from current position");
            Some(bounds)
        }
        Err(err) => {
            warn!(error = %err, "Could not seed viewport from current position");
            orchestrator.report_error(&err);
            None
        }
    }
}
