//! Error types for the outcome engine.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for scenario loading and mission bookkeeping.
///
/// Unknown side ids are not errors: outcome calculators ignore events they
/// cannot attribute.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Scenario or snapshot JSON could not be parsed.
    #[error("Failed to parse scenario: {0}")]
    ScenarioParse(#[from] serde_json::Error),

    /// Two sides share the same identifier.
    #[error("Duplicate side id: {0}")]
    DuplicateSide(String),

    /// Two missions share the same identifier.
    #[error("Duplicate mission id: {0}")]
    DuplicateMission(String),

    /// Mission lookup failed.
    #[error("Mission not found: {0}")]
    MissionNotFound(String),

    /// A patrol area needs at least three reference points.
    #[error("Patrol area for mission '{mission}' has {count} points, need at least 3")]
    InvalidPatrolArea {
        /// Mission the area belongs to.
        mission: String,
        /// Number of points supplied.
        count: usize,
    },

    /// Mission cannot finish before the scenario ends.
    #[error(
        "Mission '{mission}' cannot complete: current time {current_time} + limit {time_limit} > end {end_time}"
    )]
    InfeasibleTimeLimit {
        /// Mission identifier.
        mission: String,
        /// Scenario time at assignment.
        current_time: i64,
        /// Mission time limit in seconds.
        time_limit: i64,
        /// Scenario end time.
        end_time: i64,
    },

    /// Mission is already in a terminal state.
    #[error("Mission '{0}' has already been resolved")]
    MissionAlreadyResolved(String),

    /// Writing a recording artifact failed.
    #[error("Failed to export recording '{file_name}': {source}")]
    Export {
        /// Artifact file name.
        file_name: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
