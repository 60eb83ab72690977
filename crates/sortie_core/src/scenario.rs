//! Scenario aggregate and snapshot format.
//!
//! A [`Scenario`] owns the side ledger, every unit collection and the mission
//! list for one run. Snapshot lines wrap it in an envelope:
//!
//! ```json
//! {"currentScenario": { "sides": [...], "aircraft": [...], ... }, "scenarioPaused": false}
//! ```
//!
//! [`Scenario::from_json`] accepts either the envelope or a bare scenario
//! object, so seed files and recorded snapshots share one loader.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::completion;
use crate::error::{EngineError, Result};
use crate::mission::{Mission, MissionOutcome, ReferencePoint};
use crate::side::{Side, SideLedger};
use crate::units::{Aircraft, Airbase, Combatant, Facility, Ship, UnitKind, UnitTag, Weapon};

/// Envelope key wrapping the scenario in a snapshot line.
pub const SNAPSHOT_SCENARIO_KEY: &str = "currentScenario";
/// Envelope key carrying the pause flag.
pub const SNAPSHOT_PAUSED_KEY: &str = "scenarioPaused";

/// Wire form with optional time fields; defaults depend on other fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    start_time: i64,
    #[serde(default = "default_duration")]
    duration: i64,
    #[serde(default)]
    current_time: Option<i64>,
    #[serde(default)]
    end_time: Option<i64>,
    #[serde(default = "default_time_compression")]
    time_compression: i64,
    #[serde(default)]
    sides: SideLedger,
    #[serde(default)]
    aircraft: Vec<Aircraft>,
    #[serde(default)]
    ships: Vec<Ship>,
    #[serde(default)]
    facilities: Vec<Facility>,
    #[serde(default)]
    airbases: Vec<Airbase>,
    #[serde(default)]
    weapons: Vec<Weapon>,
    #[serde(default)]
    reference_points: Vec<ReferencePoint>,
    #[serde(default)]
    missions: Vec<Mission>,
}

fn default_duration() -> i64 {
    1
}

fn default_time_compression() -> i64 {
    1
}

/// Everything one simulation run operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ScenarioData")]
pub struct Scenario {
    /// Identifier.
    pub id: String,
    /// Display name; also names exported recordings.
    pub name: String,
    /// Scenario start, unix seconds.
    pub start_time: i64,
    /// Nominal duration in seconds.
    pub duration: i64,
    /// Current simulation time, unix seconds.
    pub current_time: i64,
    /// Simulation end, unix seconds.
    pub end_time: i64,
    /// Simulated seconds per tick.
    pub time_compression: i64,
    /// Side ledger.
    pub sides: SideLedger,
    /// Aircraft in flight.
    pub aircraft: Vec<Aircraft>,
    /// Ships.
    pub ships: Vec<Ship>,
    /// Fixed installations.
    pub facilities: Vec<Facility>,
    /// Airbases.
    pub airbases: Vec<Airbase>,
    /// Weapons in flight.
    pub weapons: Vec<Weapon>,
    /// Named map points.
    pub reference_points: Vec<ReferencePoint>,
    /// Assigned missions.
    pub missions: Vec<Mission>,
    /// Set when a termination condition suspends the run.
    #[serde(skip)]
    pub paused: bool,
    /// Whether a recorder is attached.
    #[serde(skip)]
    pub recording: bool,
}

impl TryFrom<ScenarioData> for Scenario {
    type Error = EngineError;

    fn try_from(data: ScenarioData) -> Result<Self> {
        let mut seen = HashSet::new();
        for mission in &data.missions {
            if !seen.insert(mission.id().to_string()) {
                return Err(EngineError::DuplicateMission(mission.id().to_string()));
            }
        }
        Ok(Self {
            id: data.id,
            name: data.name,
            start_time: data.start_time,
            duration: data.duration,
            current_time: data.current_time.unwrap_or(data.start_time),
            end_time: data
                .end_time
                .unwrap_or(data.start_time + data.duration),
            time_compression: data.time_compression,
            sides: data.sides,
            aircraft: data.aircraft,
            ships: data.ships,
            facilities: data.facilities,
            airbases: data.airbases,
            weapons: data.weapons,
            reference_points: data.reference_points,
            missions: data.missions,
            paused: false,
            recording: false,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    current_scenario: &'a Scenario,
    scenario_paused: bool,
}

impl Scenario {
    /// Create an empty scenario running from `start_time` for `duration` seconds.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, start_time: i64, duration: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_time,
            duration,
            current_time: start_time,
            end_time: start_time + duration,
            time_compression: 1,
            sides: SideLedger::new(),
            aircraft: Vec::new(),
            ships: Vec::new(),
            facilities: Vec::new(),
            airbases: Vec::new(),
            weapons: Vec::new(),
            reference_points: Vec::new(),
            missions: Vec::new(),
            paused: false,
            recording: false,
        }
    }

    /// Parse a scenario from a seed file or a snapshot line.
    ///
    /// # Errors
    /// Returns [`EngineError::ScenarioParse`] on malformed JSON or schema
    /// mismatch, and the ledger/mission uniqueness errors.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        let paused = value
            .get(SNAPSHOT_PAUSED_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let inner = value
            .as_object_mut()
            .and_then(|object| object.remove(SNAPSHOT_SCENARIO_KEY));
        let mut scenario: Self = serde_json::from_value(inner.unwrap_or(value))?;
        scenario.paused = paused;
        Ok(scenario)
    }

    /// Serialize as one snapshot line (no trailing newline).
    ///
    /// # Errors
    /// Returns [`EngineError::ScenarioParse`] if serialization fails.
    pub fn to_snapshot_line(&self) -> Result<String> {
        Ok(serde_json::to_string(&SnapshotRef {
            current_scenario: self,
            scenario_paused: self.paused,
        })?)
    }

    /// Look up a side.
    #[must_use]
    pub fn get_side(&self, side_id: &str) -> Option<&Side> {
        self.sides.get(side_id)
    }

    /// Look up a side for mutation.
    pub fn get_side_mut(&mut self, side_id: &str) -> Option<&mut Side> {
        self.sides.get_mut(side_id)
    }

    /// Look up a mission.
    #[must_use]
    pub fn get_mission(&self, mission_id: &str) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id() == mission_id)
    }

    /// Look up a mission for mutation.
    pub fn get_mission_mut(&mut self, mission_id: &str) -> Option<&mut Mission> {
        self.missions.iter_mut().find(|m| m.id() == mission_id)
    }

    /// Hand a mission to its side.
    ///
    /// Stamps the patrol creation time and bumps the side's
    /// `missions_assigned`.
    ///
    /// # Errors
    /// Rejects duplicate ids and missions that cannot finish before
    /// `end_time`.
    pub fn assign_mission(&mut self, mut mission: Mission) -> Result<()> {
        if self.get_mission(mission.id()).is_some() {
            return Err(EngineError::DuplicateMission(mission.id().to_string()));
        }
        if mission.check_time_limit(self.current_time, self.end_time) {
            return Err(EngineError::InfeasibleTimeLimit {
                mission: mission.id().to_string(),
                current_time: self.current_time,
                time_limit: mission.time_limit(),
                end_time: self.end_time,
            });
        }
        if let Some(patrol) = mission.as_patrol_mut() {
            patrol.creation_time.get_or_insert(self.current_time);
        }
        match self.sides.get_mut(mission.side_id()) {
            Some(side) => side.missions_assigned += 1,
            None => debug!(mission = %mission.id(), "Mission assigned to unknown side"),
        }
        self.missions.push(mission);
        Ok(())
    }

    /// Start a mission.
    ///
    /// Returns false if the mission was not waiting in the assigned state.
    ///
    /// # Errors
    /// Returns [`EngineError::MissionNotFound`] for unknown ids.
    pub fn activate_mission(&mut self, mission_id: &str) -> Result<bool> {
        let mission = self
            .get_mission_mut(mission_id)
            .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;
        Ok(mission.activate())
    }

    /// Move a mission to its terminal state and record the result once.
    ///
    /// Returns false, without touching the ledger, if the mission had already
    /// been resolved.
    ///
    /// # Errors
    /// Returns [`EngineError::MissionNotFound`] for unknown ids.
    pub fn resolve_mission(&mut self, mission_id: &str, outcome: MissionOutcome) -> Result<bool> {
        let mission = self
            .missions
            .iter_mut()
            .find(|m| m.id() == mission_id)
            .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;
        if let Err(err) = mission.finish(outcome) {
            warn!(%err, "Ignoring repeated mission resolution");
            return Ok(false);
        }
        completion::record_mission_outcome(&mut self.sides, mission, outcome);
        Ok(true)
    }

    /// Owned identity of any unit by id.
    #[must_use]
    pub fn find_unit(&self, unit_id: &str) -> Option<UnitTag> {
        fn tag_of<T: Combatant>(units: &[T], id: &str) -> Option<UnitTag> {
            units.iter().find(|u| u.id() == id).map(Combatant::tag)
        }
        tag_of(&self.aircraft, unit_id)
            .or_else(|| tag_of(&self.ships, unit_id))
            .or_else(|| tag_of(&self.facilities, unit_id))
            .or_else(|| tag_of(&self.airbases, unit_id))
            .or_else(|| tag_of(&self.weapons, unit_id))
    }

    /// Whether a unit with this id is still in play.
    #[must_use]
    pub fn unit_exists(&self, unit_id: &str) -> bool {
        self.find_unit(unit_id).is_some()
    }

    /// `(latitude, longitude)` of a unit.
    #[must_use]
    pub fn unit_position(&self, unit_id: &str) -> Option<(f64, f64)> {
        self.aircraft
            .iter()
            .find(|u| u.id == unit_id)
            .map(|u| (u.latitude, u.longitude))
            .or_else(|| {
                self.ships
                    .iter()
                    .find(|u| u.id == unit_id)
                    .map(|u| (u.latitude, u.longitude))
            })
            .or_else(|| {
                self.facilities
                    .iter()
                    .find(|u| u.id == unit_id)
                    .map(|u| (u.latitude, u.longitude))
            })
            .or_else(|| {
                self.airbases
                    .iter()
                    .find(|u| u.id == unit_id)
                    .map(|u| (u.latitude, u.longitude))
            })
            .or_else(|| {
                self.weapons
                    .iter()
                    .find(|u| u.id == unit_id)
                    .map(|u| (u.latitude, u.longitude))
            })
    }

    /// Take a unit out of play. Returns its identity if it existed.
    pub fn remove_unit(&mut self, unit_id: &str) -> Option<UnitTag> {
        fn take<T: Combatant>(units: &mut Vec<T>, id: &str) -> Option<UnitTag> {
            let index = units.iter().position(|u| u.id() == id)?;
            Some(units.remove(index).tag())
        }
        let tag = take(&mut self.aircraft, unit_id)
            .or_else(|| take(&mut self.ships, unit_id))
            .or_else(|| take(&mut self.facilities, unit_id))
            .or_else(|| take(&mut self.airbases, unit_id))
            .or_else(|| take(&mut self.weapons, unit_id));
        if let Some(tag) = &tag {
            debug!(unit = %tag.id, kind = ?tag.kind, "Unit removed");
        }
        tag
    }

    /// Units of a side that count towards casualties.
    #[must_use]
    pub fn combat_unit_count(&self, side_id: &str) -> usize {
        self.aircraft.iter().filter(|u| u.side_id == side_id).count()
            + self.ships.iter().filter(|u| u.side_id == side_id).count()
            + self.facilities.iter().filter(|u| u.side_id == side_id).count()
            + self.airbases.iter().filter(|u| u.side_id == side_id).count()
    }

    /// Kind of a unit by id.
    #[must_use]
    pub fn unit_kind(&self, unit_id: &str) -> Option<UnitKind> {
        self.find_unit(unit_id).map(|t| t.kind)
    }
}
