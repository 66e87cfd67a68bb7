//! Duplicate submission detection
//!
//! Two tiers: an exact name + prefecture match is rejected when the entries
//! are within `same_name_radius_m` (or when either side has no coordinates);
//! otherwise any active entry within `too_close_radius_m` rejects the candidate.

use serde::Serialize;
use tracing::debug;

use crate::config::DuplicateConfig;
use crate::geo;
use crate::models::{ExistingSubmission, SubmissionCandidate};

/// Why a same-name entry blocked the candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NameMatchReason {
    /// Both entries have coordinates and lie within the same-name radius
    WithinRadius { distance_m: f64 },
    /// At least one side lacks coordinates, so the entries cannot be told apart
    MissingCoordinates,
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Accept,
    RejectExactNameSameArea {
        existing: ExistingSubmission,
        reason: NameMatchReason,
    },
    RejectTooClose {
        existing: ExistingSubmission,
        distance_m: f64,
    },
}

impl Decision {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accept)
    }

    /// Message suitable for the submission form
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Decision::Accept => None,
            Decision::RejectExactNameSameArea { existing, reason } => Some(match reason {
                NameMatchReason::WithinRadius { distance_m } => format!(
                    "\"{}\" in {} is already registered {:.0}m away",
                    existing.entry.name, existing.entry.prefecture, distance_m
                ),
                NameMatchReason::MissingCoordinates => format!(
                    "\"{}\" in {} is already registered",
                    existing.entry.name, existing.entry.prefecture
                ),
            }),
            Decision::RejectTooClose {
                existing,
                distance_m,
            } => Some(format!(
                "Another spot (\"{}\") is already registered {:.1}m from this location",
                existing.entry.name, distance_m
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateSubmissionGuard {
    config: DuplicateConfig,
}

impl DuplicateSubmissionGuard {
    #[must_use]
    pub fn new(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Decide whether `candidate` duplicates one of the active `existing` entries
    #[must_use]
    pub fn check(
        &self,
        candidate: &SubmissionCandidate,
        existing: &[ExistingSubmission],
    ) -> Decision {
        let active = existing.iter().filter(|e| e.status.is_active());

        let (name_matches, others): (Vec<&ExistingSubmission>, Vec<&ExistingSubmission>) =
            active.partition(|e| {
                e.entry.name == candidate.name && e.entry.prefecture == candidate.prefecture
            });

        for matched in &name_matches {
            match (candidate.coordinates, matched.entry.coordinates) {
                (Some(a), Some(b)) => {
                    let distance_m = geo::distance(&a, &b);
                    if distance_m <= self.config.same_name_radius_m {
                        debug!(
                            name = %candidate.name,
                            existing_id = %matched.id,
                            distance_m,
                            "Same-name submission within radius"
                        );
                        return Decision::RejectExactNameSameArea {
                            existing: (*matched).clone(),
                            reason: NameMatchReason::WithinRadius { distance_m },
                        };
                    }
                }
                _ => {
                    debug!(
                        name = %candidate.name,
                        existing_id = %matched.id,
                        "Same-name submission without coordinates to compare"
                    );
                    return Decision::RejectExactNameSameArea {
                        existing: (*matched).clone(),
                        reason: NameMatchReason::MissingCoordinates,
                    };
                }
            }
        }

        let Some(origin) = candidate.coordinates else {
            return Decision::Accept;
        };

        let nearest = others
            .into_iter()
            .filter_map(|e| {
                e.entry
                    .coordinates
                    .map(|c| (e, geo::distance(&origin, &c)))
            })
            .filter(|(_, d)| *d <= self.config.too_close_radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((existing, distance_m)) => {
                debug!(
                    name = %candidate.name,
                    existing_id = %existing.id,
                    distance_m,
                    "Submission too close to an existing entry"
                );
                Decision::RejectTooClose {
                    existing: existing.clone(),
                    distance_m,
                }
            }
            None => Decision::Accept,
        }
    }
}
