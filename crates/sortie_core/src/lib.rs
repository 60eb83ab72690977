//! # Sortie Core
//!
//! Scenario outcome engine for opposing sides flying patrol, strike and
//! rescue missions.
//!
//! This crate contains **only** the bookkeeping side of a simulation:
//! - No movement, detection or combat resolution
//! - No network IO
//! - No global state
//!
//! External collaborators move units around and report kills, fuel
//! exhaustion and mission results through the outcome calculators; the engine
//! keeps the side ledger consistent, steps the clock and records snapshots.
//!
//! ## Crate Structure
//!
//! - [`side`] - Side ledger and counters
//! - [`units`] - Unit variants and the [`units::Combatant`] capability
//! - [`mission`] - Patrol/strike/rescue state machines
//! - [`scoring`], [`casualties`], [`completion`] - Outcome calculators
//! - [`scenario`] - Scenario aggregate and snapshot format
//! - [`game`] - Simulation stepper
//! - [`driver`] - Default clock-only world driver
//! - [`playback`] - Append-and-rotate snapshot recorder

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod casualties;
pub mod completion;
pub mod driver;
pub mod error;
pub mod game;
pub mod mission;
pub mod outcome;
pub mod playback;
pub mod scenario;
pub mod scoring;
pub mod side;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::completion::{
        are_all_missions_complete, are_all_missions_complete_in_scenario,
        calculate_side_mission_success_rate,
    };
    pub use crate::driver::ClockDriver;
    pub use crate::error::{EngineError, Result};
    pub use crate::game::{Game, GameState, RunSummary, StepResult, WorldDriver};
    pub use crate::mission::{
        Mission, MissionKind, MissionOutcome, MissionStatus, PatrolMission, ReferencePoint,
        RescueMission, StrikeMission,
    };
    pub use crate::playback::{
        DirectorySink, DiscardSink, MemorySink, PlaybackRecorder, RecordingArtifact,
        RecordingSink, RecourseLines,
    };
    pub use crate::scenario::Scenario;
    pub use crate::side::{Side, SideColor, SideLedger};
    pub use crate::units::{
        Aircraft, Airbase, Combatant, Facility, Ship, UnitKind, UnitTag, Weapon,
    };
}
