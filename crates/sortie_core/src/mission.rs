//! Mission state machines.
//!
//! Every mission moves through `Assigned -> Active -> {Succeeded | Failed}`.
//! The terminal transition happens exactly once and is the only point where
//! side completion counters change (see [`crate::scenario::Scenario::resolve_mission`]).
//!
//! Patrol missions additionally own a geographic area. The closed polygon used
//! for containment tests is derived from `assigned_area` and rebuilt every time
//! the area changes; there is no way to mutate the area without rebuilding it.

use std::collections::BTreeSet;

use geo::{Contains, LineString, Point, Polygon};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default mission time limit in seconds.
pub const DEFAULT_TIME_LIMIT: i64 = 1;

/// Minimum seconds between two scored patrol periods.
pub const PATROL_SCORING_INTERVAL_SECONDS: i64 = 60;

/// Minimum number of points that make up a patrol area.
pub const MIN_PATROL_AREA_POINTS: usize = 3;

fn default_time_limit() -> i64 {
    DEFAULT_TIME_LIMIT
}

/// Lifecycle state of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    /// Created and handed to a side, not yet running.
    #[default]
    Assigned,
    /// Units are executing the mission.
    Active,
    /// Terminal: objective achieved.
    Succeeded,
    /// Terminal: objective lost.
    Failed,
}

impl MissionStatus {
    /// Succeeded and Failed are terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// How a mission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionOutcome {
    /// Objective achieved.
    Succeeded,
    /// Objective lost.
    Failed,
}

impl From<MissionOutcome> for MissionStatus {
    fn from(outcome: MissionOutcome) -> Self {
        match outcome {
            MissionOutcome::Succeeded => Self::Succeeded,
            MissionOutcome::Failed => Self::Failed,
        }
    }
}

/// Mission variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionKind {
    /// Hold units inside an area.
    Patrol,
    /// Destroy assigned targets.
    Strike,
    /// Recover assigned targets.
    Rescue,
}

/// A named geographic point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePoint {
    /// Identifier.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning side.
    #[serde(default)]
    pub side_id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl ReferencePoint {
    /// Create an anonymous point.
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            side_id: String::new(),
            latitude,
            longitude,
        }
    }
}

fn build_patrol_polygon(area: &[ReferencePoint]) -> Polygon<f64> {
    let ring: Vec<(f64, f64)> = area.iter().map(|p| (p.longitude, p.latitude)).collect();
    Polygon::new(LineString::from(ring), Vec::new())
}

/// Wire form of a patrol mission, without the derived polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatrolMissionData {
    id: String,
    name: String,
    side_id: String,
    #[serde(default)]
    assigned_unit_ids: BTreeSet<String>,
    assigned_area: Vec<ReferencePoint>,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    status: MissionStatus,
    #[serde(default)]
    creation_time: Option<i64>,
    #[serde(default = "default_time_limit")]
    time_limit: i64,
    #[serde(default)]
    last_scoring_time: Option<i64>,
}

/// Keep a set of units inside an area for as long as possible.
///
/// Scores `+10` per qualifying period and records a period success each time;
/// the mission terminates once, either when its end time passes or when all
/// assigned units are lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatrolMissionData", into = "PatrolMissionData")]
pub struct PatrolMission {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Units flying or sailing the patrol (non-owning ids).
    pub assigned_unit_ids: BTreeSet<String>,
    /// Whether the mission is currently running.
    pub active: bool,
    /// Lifecycle state.
    pub status: MissionStatus,
    /// Scenario time the mission was created at.
    pub creation_time: Option<i64>,
    /// Mission duration in seconds.
    pub time_limit: i64,
    /// Scenario time of the last scored period.
    pub last_scoring_time: Option<i64>,
    assigned_area: Vec<ReferencePoint>,
    geometry: Polygon<f64>,
}

impl PatrolMission {
    /// Create a patrol mission over `area`.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidPatrolArea`] for areas with fewer than
    /// three points.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        side_id: impl Into<String>,
        assigned_unit_ids: impl IntoIterator<Item = String>,
        area: Vec<ReferencePoint>,
        time_limit: i64,
    ) -> Result<Self> {
        let id = id.into();
        if area.len() < MIN_PATROL_AREA_POINTS {
            return Err(EngineError::InvalidPatrolArea {
                mission: id,
                count: area.len(),
            });
        }
        let geometry = build_patrol_polygon(&area);
        Ok(Self {
            id,
            name: name.into(),
            side_id: side_id.into(),
            assigned_unit_ids: assigned_unit_ids.into_iter().collect(),
            active: false,
            status: MissionStatus::Assigned,
            creation_time: None,
            time_limit,
            last_scoring_time: None,
            assigned_area: area,
            geometry,
        })
    }

    /// Points defining the patrol area.
    #[must_use]
    pub fn assigned_area(&self) -> &[ReferencePoint] {
        &self.assigned_area
    }

    /// Replace the patrol area and rebuild the polygon.
    pub fn set_assigned_area(&mut self, area: Vec<ReferencePoint>) -> Result<()> {
        if area.len() < MIN_PATROL_AREA_POINTS {
            return Err(EngineError::InvalidPatrolArea {
                mission: self.id.clone(),
                count: area.len(),
            });
        }
        self.assigned_area = area;
        self.update_patrol_area_geometry();
        Ok(())
    }

    /// Rebuild the containment polygon from `assigned_area`.
    pub fn update_patrol_area_geometry(&mut self) {
        self.geometry = build_patrol_polygon(&self.assigned_area);
    }

    /// Point-in-polygon test. Points on the boundary are outside.
    #[must_use]
    pub fn contains_coordinates(&self, latitude: f64, longitude: f64) -> bool {
        self.geometry.contains(&Point::new(longitude, latitude))
    }

    /// Sample a `(latitude, longitude)` inside the area's bounding box.
    ///
    /// The box is spanned by the first point and its neighbours: longitude
    /// from points 0..1, latitude from points 0..2. This is bounding-box
    /// sampling, not uniform over the polygon.
    pub fn generate_random_coordinates<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let origin = &self.assigned_area[0];
        let lon_corner = &self.assigned_area[1];
        let lat_corner = &self.assigned_area[2];
        let latitude =
            rng.gen::<f64>() * (lat_corner.latitude - origin.latitude) + origin.latitude;
        let longitude =
            rng.gen::<f64>() * (lon_corner.longitude - origin.longitude) + origin.longitude;
        (latitude, longitude)
    }

    /// True if the mission cannot finish before `simulation_limit`.
    #[must_use]
    pub fn check_time_limit(&self, current_time: i64, simulation_limit: i64) -> bool {
        current_time + self.time_limit > simulation_limit
    }

    /// Absolute end time, if the creation time is known.
    #[must_use]
    pub fn mission_end_time(&self) -> Option<i64> {
        self.creation_time.map(|t| t + self.time_limit)
    }

    /// Claim a scoring period at `current_time`.
    ///
    /// Returns true and advances `last_scoring_time` when at least `interval`
    /// seconds have passed since the last scored period (or since creation).
    /// Never grants two periods for the same timestamp.
    pub fn try_claim_period(&mut self, current_time: i64, interval: i64) -> bool {
        if self.last_scoring_time == Some(current_time) {
            return false;
        }
        let due = match self.last_scoring_time.or(self.creation_time) {
            Some(reference) => current_time - reference >= interval,
            None => true,
        };
        if due {
            self.last_scoring_time = Some(current_time);
        }
        due
    }
}

impl TryFrom<PatrolMissionData> for PatrolMission {
    type Error = EngineError;

    fn try_from(data: PatrolMissionData) -> Result<Self> {
        let mut mission = Self::new(
            data.id,
            data.name,
            data.side_id,
            data.assigned_unit_ids,
            data.assigned_area,
            data.time_limit,
        )?;
        mission.active = data.active;
        mission.status = data.status;
        mission.creation_time = data.creation_time;
        mission.last_scoring_time = data.last_scoring_time;
        Ok(mission)
    }
}

impl From<PatrolMission> for PatrolMissionData {
    fn from(mission: PatrolMission) -> Self {
        Self {
            id: mission.id,
            name: mission.name,
            side_id: mission.side_id,
            assigned_unit_ids: mission.assigned_unit_ids,
            assigned_area: mission.assigned_area,
            active: mission.active,
            status: mission.status,
            creation_time: mission.creation_time,
            time_limit: mission.time_limit,
            last_scoring_time: mission.last_scoring_time,
        }
    }
}

/// Destroy a set of targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeMission {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Attacking units.
    #[serde(default)]
    pub assigned_unit_ids: BTreeSet<String>,
    /// Units to destroy.
    #[serde(default)]
    pub assigned_target_ids: BTreeSet<String>,
    /// Whether the mission is currently running.
    #[serde(default)]
    pub active: bool,
    /// Lifecycle state.
    #[serde(default)]
    pub status: MissionStatus,
    /// Mission duration in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: i64,
}

/// Recover a set of targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueMission {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Rescuing units.
    #[serde(default)]
    pub assigned_unit_ids: BTreeSet<String>,
    /// Units to recover.
    #[serde(default)]
    pub assigned_target_ids: BTreeSet<String>,
    /// Whether the mission is currently running.
    #[serde(default)]
    pub active: bool,
    /// Lifecycle state.
    #[serde(default)]
    pub status: MissionStatus,
    /// Mission duration in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: i64,
}

/// Any mission a side can be assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mission {
    /// Patrol an area.
    Patrol(PatrolMission),
    /// Strike targets.
    Strike(StrikeMission),
    /// Rescue targets.
    Rescue(RescueMission),
}

macro_rules! each_mission {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Mission::Patrol($m) => $body,
            Mission::Strike($m) => $body,
            Mission::Rescue($m) => $body,
        }
    };
}

impl Mission {
    /// Variant tag.
    #[must_use]
    pub const fn kind(&self) -> MissionKind {
        match self {
            Self::Patrol(_) => MissionKind::Patrol,
            Self::Strike(_) => MissionKind::Strike,
            Self::Rescue(_) => MissionKind::Rescue,
        }
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        each_mission!(self, m => &m.id)
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        each_mission!(self, m => &m.name)
    }

    /// Owning side.
    #[must_use]
    pub fn side_id(&self) -> &str {
        each_mission!(self, m => &m.side_id)
    }

    /// Assigned unit ids.
    #[must_use]
    pub fn assigned_unit_ids(&self) -> &BTreeSet<String> {
        each_mission!(self, m => &m.assigned_unit_ids)
    }

    /// Lifecycle state.
    #[must_use]
    pub fn status(&self) -> MissionStatus {
        each_mission!(self, m => m.status)
    }

    /// Whether the mission is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        each_mission!(self, m => m.active)
    }

    /// Time limit in seconds.
    #[must_use]
    pub fn time_limit(&self) -> i64 {
        each_mission!(self, m => m.time_limit)
    }

    /// True if the mission cannot finish before `simulation_limit`.
    #[must_use]
    pub fn check_time_limit(&self, current_time: i64, simulation_limit: i64) -> bool {
        current_time + self.time_limit() > simulation_limit
    }

    /// Move `Assigned -> Active`. Returns false if the mission was not in
    /// the assigned state.
    pub fn activate(&mut self) -> bool {
        each_mission!(self, m => {
            if m.status != MissionStatus::Assigned {
                return false;
            }
            m.status = MissionStatus::Active;
            m.active = true;
            true
        })
    }

    /// Move to a terminal state.
    ///
    /// # Errors
    /// Returns [`EngineError::MissionAlreadyResolved`] if the mission is
    /// already terminal.
    pub fn finish(&mut self, outcome: MissionOutcome) -> Result<()> {
        each_mission!(self, m => {
            if m.status.is_terminal() {
                return Err(EngineError::MissionAlreadyResolved(m.id.clone()));
            }
            m.status = outcome.into();
            m.active = false;
            Ok(())
        })
    }

    /// Withdraw without resolving: the mission stops running but keeps its
    /// state.
    pub fn deactivate(&mut self) {
        each_mission!(self, m => m.active = false);
    }

    /// Patrol data, if this is a patrol.
    #[must_use]
    pub fn as_patrol(&self) -> Option<&PatrolMission> {
        match self {
            Self::Patrol(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable patrol data, if this is a patrol.
    pub fn as_patrol_mut(&mut self) -> Option<&mut PatrolMission> {
        match self {
            Self::Patrol(m) => Some(m),
            _ => None,
        }
    }
}
