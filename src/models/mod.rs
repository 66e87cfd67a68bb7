//! Data models for the SpotMap engine
//!
//! This module contains the value types the engine passes around:
//! - Coordinate and Bounds: positions and map viewports
//! - FilterSnapshot: the filter state accompanying a viewport change
//! - Spot: camping spots returned by the repository
//! - Submission: entries checked by the duplicate guard

pub mod bounds;
pub mod coordinate;
pub mod filters;
pub mod spot;
pub mod submission;

pub use bounds::Bounds;
pub use coordinate::Coordinate;
pub use filters::FilterSnapshot;
pub use spot::{FacilityKind, Spot};
pub use submission::{ExistingSubmission, SubmissionCandidate, SubmissionStatus};
