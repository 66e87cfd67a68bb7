//! `SpotMap` - viewport-synchronised spot loading for camping-spot maps
//!
//! This library decides when a panning/zooming map needs fresh spot data,
//! debounces and cancels fetches so only the latest one is ever applied, and
//! computes the distance-based relationships (nearby facilities, duplicate
//! submissions) used around it.

pub mod cancellation;
pub mod config;
pub mod coordinator;
pub mod duplicates;
pub mod error;
pub mod geo;
pub mod geolocation;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod proximity;
pub mod repository;
pub mod sink;

// Re-export core types for public API
pub use cancellation::CancellationToken;
pub use crate::config::SpotMapConfig;
pub use coordinator::{
    InputProfile, LoadDecision, SkipReason, ViewportChangeCoordinator, ViewportSettings,
};
pub use duplicates::{Decision, DuplicateSubmissionGuard, NameMatchReason};
pub use error::SpotMapError;
pub use geolocation::{GeolocationProvider, seed_viewport};
pub use models::{
    Bounds, Coordinate, ExistingSubmission, FacilityKind, FilterSnapshot, Spot,
    SubmissionCandidate, SubmissionStatus,
};
pub use orchestrator::DataFetchOrchestrator;
pub use proximity::{FacilityCandidate, FacilityRadii, NearbyFacility, ProximityResolver};
#[cfg(feature = "http")]
pub use repository::HttpSpotRepository;
pub use repository::{InMemorySpotRepository, SpotPage, SpotRepository};
pub use sink::{ChannelSink, SinkEvent, TracingSink, ViewportSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SpotMapError>;
